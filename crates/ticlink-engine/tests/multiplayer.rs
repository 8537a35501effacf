//! Integration test: a host and a client session sharing one match.

use std::thread;

use ticlink_core::{GameConfig, MultiplayerRole, PlayerIndex};
use ticlink_engine::Session;
use ticlink_test_utils::{basic_config, scratch_dir, thread_session, Lobby, ThreadLauncher};

const PORT: u16 = 5029;

fn role_config(role: MultiplayerRole) -> GameConfig {
    let mut config = basic_config();
    config.multiplayer = role;
    config
}

#[test]
fn host_and_client_share_server_state() {
    let dir = scratch_dir("match");
    let lobby = Lobby::new();

    let mut host = thread_session(
        ThreadLauncher::with_lobby(lobby.clone()),
        &dir,
        role_config(MultiplayerRole::Host {
            players: 2,
            port: PORT,
        }),
    );
    let mut client = thread_session(
        ThreadLauncher::with_lobby(lobby),
        &dir,
        role_config(MultiplayerRole::Client {
            address: "127.0.0.1".into(),
            port: PORT,
        }),
    );
    assert!(host.is_multiplayer());
    assert_eq!(host.server_state().unwrap(), None);

    // The host's init blocks until the client has joined.
    let client_init = thread::spawn(move || {
        client.init().unwrap();
        client
    });
    host.init().unwrap();
    let mut client = client_init.join().unwrap();

    assert_eq!(host.player_index(), Some(PlayerIndex(0)));
    assert_eq!(client.player_index(), Some(PlayerIndex(1)));
    assert_eq!(host.player_count(), Some(2));

    // The host keeps attacking until it fragged the client.
    let mut frags = 0;
    for _ in 0..500 {
        host.make_action(&[0.0, 1.0], 1).unwrap();
        let state = host.server_state().unwrap().unwrap();
        frags = state.players[0].frag_count;
        if frags > 0 {
            break;
        }
    }
    assert!(frags > 0);
    assert!(!host.is_episode_finished());

    // The client dies on its next tic and waits for a respawn; deaths do
    // not end multiplayer episodes.
    client.make_action(&[0.0, 0.0], 1).unwrap();
    assert!(client.is_player_dead());
    assert!(!client.is_episode_finished());
    let seen = client.server_state().unwrap().unwrap();
    assert_eq!(seen.player_count, 2);
    assert_eq!(seen.players[0].frag_count, frags);
    assert_eq!(seen.players[1].name, "Player2");

    client.respawn_player().unwrap();
    assert!(!client.is_player_dead());

    client.close();
    host.make_action(&[0.0, 0.0], 1).unwrap();
    assert_eq!(host.player_count(), Some(1));
}

#[test]
fn solo_session_has_no_server_state() {
    let dir = scratch_dir("solo");
    let mut session: Session = thread_session(ThreadLauncher::new(), &dir, basic_config());
    session.init().unwrap();
    assert!(!session.is_multiplayer());
    assert_eq!(session.server_state().unwrap(), None);
    assert_eq!(session.player_count(), Some(1));
    // Respawning the living is harmless.
    session.respawn_player().unwrap();
    assert!(!session.is_player_dead());
}
