// SPDX-License-Identifier: Apache-2.0

use std::net::{SocketAddr, TcpListener as StdTcpListener};

use tokio::net::TcpListener;
use tower::BoxError;

/// A TCP socket that is bound and listening, ready to `accept()`.
///
/// Binding happens synchronously so the process can fail on an unavailable scrape
/// endpoint before any pipeline stage has started, and outside of a tokio runtime.
/// The socket is handed to tokio only when the server starts.
#[derive(Debug)]
pub struct Listener {
    inner: StdTcpListener,
}

impl Listener {
    pub fn bind(endpoint: SocketAddr) -> Result<Self, BoxError> {
        let inner = StdTcpListener::bind(endpoint)
            .map_err(|e| format!("unable to bind to {endpoint}: {e}"))?;
        Ok(Self { inner })
    }

    pub fn bound_address(&self) -> Result<SocketAddr, BoxError> {
        Ok(self.inner.local_addr()?)
    }

    /// Must be called from within a tokio runtime.
    pub fn into_async(self) -> Result<TcpListener, BoxError> {
        self.inner.set_nonblocking(true)?;
        Ok(TcpListener::from_std(self.inner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.bound_address().unwrap();
        assert_ne!(0, addr.port());
    }

    #[test]
    fn test_bind_taken_port_fails() {
        let first = Listener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = first.bound_address().unwrap();

        let err = Listener::bind(addr).unwrap_err();
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_into_async_accepts() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.bound_address().unwrap();
        let listener = listener.into_async().unwrap();

        let (accepted, connected) =
            tokio::join!(listener.accept(), tokio::net::TcpStream::connect(addr));
        assert!(accepted.is_ok());
        assert!(connected.is_ok());
    }
}
