//! Port probing.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Whether something already accepts connections on `(host, port)`.
///
/// A refused connection, an unresolvable host or a probe that does not
/// complete within `probe_timeout` all count as "not occupied".
pub async fn is_port_occupied(host: &str, port: u16, probe_timeout: Duration) -> bool {
    if port == 0 {
        return false;
    }
    match timeout(probe_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => {
            debug!(host, port, "Port probe connected, port is occupied");
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Port probe refused");
            false
        }
        Err(_) => {
            debug!(host, port, "Port probe timed out");
            false
        }
    }
}
