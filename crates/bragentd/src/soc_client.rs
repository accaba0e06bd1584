//! Outbound client for the SoC control link
//!
//! Each request opens a fresh connection to the session endpoint, writes one
//! frame, reads at most one reply frame and closes. The session lock is held
//! from before the connect until the reply is handled, so at most one
//! exchange is in flight and the endpoint cannot change mid-exchange.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::msg::{Msg, MAX_FRAME_SIZE, MSG_HEADER_SIZE};
use crate::session::Session;

/// Client side of the SoC control link
#[derive(Debug, Clone)]
pub struct SocClient {
    session: Session,
}

impl SocClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Send a request and return the reply frame, if the SoC sent one
    ///
    /// A clean close with no reply bytes is a valid outcome for commands
    /// that have no response. A reply shorter than a frame header is a
    /// protocol violation reported as an I/O error.
    pub async fn send_request(&self, request: &Msg) -> Result<Option<Msg>> {
        let frame = request.encode()?;

        let guard = self.session.exclusive().await;
        let endpoint = guard.endpoint;
        debug!("sending {} to {}", request.code, endpoint);

        let mut stream = TcpStream::connect(endpoint).await?;
        stream.write_all(&frame).await?;

        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        let n = stream.read(&mut buf).await?;

        if n == 0 {
            debug!("{}: no reply", request.code);
            return Ok(None);
        }
        if n < MSG_HEADER_SIZE {
            return Err(AgentError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("reply of {n} bytes is shorter than a frame header"),
            )));
        }

        // the exchange owns the lock until the reply is decoded
        let reply = Msg::decode(&buf[..n])?;
        drop(guard);
        debug!(
            "{}: reply {} with {} payload bytes",
            request.code,
            reply.code,
            reply.payload.len()
        );
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::MsgCode;
    use crate::settings::Settings;
    use std::net::Ipv6Addr;
    use tokio::net::TcpListener;

    async fn bind_loopback() -> (TcpListener, u16) {
        let listener = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_request_with_reply() {
        let (listener, port) = bind_loopback().await;
        let session = Session::new(port);
        let client = SocClient::new(session);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; MAX_FRAME_SIZE];
            let n = stream.read(&mut buf).await.unwrap();
            let request = Msg::decode(&buf[..n]).unwrap();
            assert_eq!(request.code, MsgCode::GetConfigParams);
            let reply = Msg::set_config(&Settings::default()).encode().unwrap();
            stream.write_all(&reply).await.unwrap();
        });

        let reply = client
            .send_request(&Msg::request(MsgCode::GetConfigParams))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.code, MsgCode::SetConfigParams);
        assert_eq!(
            Settings::from_wire(&reply.payload).unwrap(),
            Settings::default()
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_without_reply() {
        let (listener, port) = bind_loopback().await;
        let session = Session::new(port);
        let client = SocClient::new(session);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; MAX_FRAME_SIZE];
            stream.read(&mut buf).await.unwrap();
            // close without replying
        });

        let reply = client
            .send_request(&Msg::request(MsgCode::StartBr))
            .await
            .unwrap();
        assert!(reply.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_short_reply_is_io_error() {
        let (listener, port) = bind_loopback().await;
        let session = Session::new(port);
        let client = SocClient::new(session);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; MAX_FRAME_SIZE];
            stream.read(&mut buf).await.unwrap();
            stream.write_all(&[0x00, 0x01, 0x02]).await.unwrap();
        });

        let err = client
            .send_request(&Msg::request(MsgCode::StopBr))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Io(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let (listener, port) = bind_loopback().await;
        drop(listener);
        let session = Session::new(port);
        let client = SocClient::new(session);
        let err = client
            .send_request(&Msg::request(MsgCode::StartBr))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Io(_)));
    }
}
