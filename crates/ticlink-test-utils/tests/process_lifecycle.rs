//! Integration test: sessions driving the stub engine as a real child
//! process, and through an attached Unix socket.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use ticlink_engine::{EngineConfig, LifecycleState, ProcessLauncher, Session, SessionError};
use ticlink_test_utils::{basic_config, scratch_dir, ScratchDir, ENGINE_VERSION};

fn stub_engine() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ticlink-stub-engine"))
}

fn process_session(dir: &ScratchDir) -> Session {
    let engine = EngineConfig {
        region_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let mut session = Session::with_engine_config(ProcessLauncher::new(stub_engine()), engine);
    session.set_config(basic_config()).unwrap();
    session
}

#[test]
fn child_process_session_steps_and_closes() {
    let dir = scratch_dir("child");
    let mut session = process_session(&dir);
    session.set_living_reward(1.0).unwrap();
    session.init().unwrap();
    assert_eq!(session.engine_version(), Some(ENGINE_VERSION));
    assert!(session.engine_pid().is_some());

    assert_eq!(session.make_action(&[1.0, 0.0], 3).unwrap(), 3.0);
    assert_eq!(session.episode_time(), 3);

    session.close();
    assert_eq!(session.state_kind(), LifecycleState::Closed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn killed_child_process_terminates_session() {
    let dir = scratch_dir("sigkill");
    let mut session = process_session(&dir);
    session.init().unwrap();
    session.make_action(&[1.0, 0.0], 1).unwrap();

    let pid = session.engine_pid().unwrap();
    let status = std::process::Command::new("kill")
        .args(["-9", &pid.to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    // The loss surfaces on the next operation that touches the engine,
    // never as a hang.
    let started = Instant::now();
    let err = loop {
        match session.make_action(&[0.0, 1.0], 1) {
            Err(e) => break e,
            Ok(_) => thread::sleep(Duration::from_millis(10)),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    };
    assert!(matches!(err, SessionError::EngineTerminated { .. }));
    assert!(matches!(
        session.make_action(&[0.0, 1.0], 1).unwrap_err(),
        SessionError::EngineTerminated { .. }
    ));
    session.close();
    assert!(matches!(
        session.make_action(&[0.0, 1.0], 1).unwrap_err(),
        SessionError::InvalidState { .. }
    ));
}

#[cfg(unix)]
#[test]
fn attach_to_listening_engine() {
    use std::os::unix::net::UnixListener;

    use ticlink_engine::AttachLauncher;
    use ticlink_ipc::StreamEndpoint;
    use ticlink_test_utils::server::EXIT_OK;
    use ticlink_test_utils::{serve, ServeOptions};

    let dir = scratch_dir("attach");
    let socket = dir.join("engine.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let engine = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let reader = stream.try_clone().unwrap();
        let mut endpoint = StreamEndpoint::new(reader, stream);
        serve(&mut endpoint, &ServeOptions::default())
    });

    let config = EngineConfig {
        region_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let mut session = Session::with_engine_config(AttachLauncher::new(&socket), config);
    session.set_config(basic_config()).unwrap();
    session.init().unwrap();
    assert_eq!(session.engine_pid(), None);
    session.make_action(&[1.0, 1.0], 2).unwrap();
    assert_eq!(session.episode_time(), 2);
    session.close();

    assert_eq!(engine.join().unwrap(), EXIT_OK);
}
