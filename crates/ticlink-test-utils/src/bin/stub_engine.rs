//! Stub engine speaking the ticlink protocol over stdin/stdout.
//!
//! Arguments (including the shared buffer path) are ignored: the
//! controller's hello carries everything the stub needs. Logs go to
//! stderr, filtered by `RUST_LOG`.

use std::io;

use ticlink_ipc::StreamEndpoint;
use ticlink_test_utils::{serve, ServeOptions};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut endpoint = StreamEndpoint::new(stdin.lock(), stdout.lock());
    let code = serve(&mut endpoint, &ServeOptions::default());
    tracing::debug!(code, "stub engine exiting");
    std::process::exit(code);
}
