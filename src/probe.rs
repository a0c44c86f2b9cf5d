//! TCP liveness probes for declared ports.
//!
//! A probe only answers "is something accepting connections right now"; it
//! never identifies the listener. Pair it with `procs::ProcessControl` when
//! the owner matters.

use crate::env;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

/// Attempt a single connection. True on connect, false on refusal or
/// timeout; the socket is dropped (closed) on every outcome.
pub async fn is_open(host: &str, port: u16, timeout: Duration) -> bool {
    match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            trace!("probe {host}:{port} closed: {e}");
            false
        }
        Err(_) => {
            trace!("probe {host}:{port} timed out");
            false
        }
    }
}

/// Poll [`is_open`] at `interval` cadence until `timeout` elapses. Returns
/// false on overall timeout. Used to confirm a service has actually come
/// up, not merely that its start command returned.
pub async fn wait_for_open(host: &str, port: u16, timeout: Duration, interval: Duration) -> bool {
    let deadline = time::Instant::now() + timeout;
    loop {
        if is_open(host, port, *env::PORTSIDE_PROBE_TIMEOUT).await {
            return true;
        }
        if time::Instant::now() >= deadline {
            return false;
        }
        time::sleep(interval).await;
    }
}
