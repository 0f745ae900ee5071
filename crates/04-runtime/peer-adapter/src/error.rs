//! Errors surfaced while establishing or using a peer connection.

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("peer endpoint disconnected before the handshake completed")]
    Disconnected,
    #[error("timed out waiting for {0}")]
    TimedOut(&'static str),
    #[error("received an unexpected message during the handshake")]
    UnexpectedMessage,
}
