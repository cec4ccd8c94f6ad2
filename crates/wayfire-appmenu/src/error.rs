use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bridge::protocol::METHOD_NOT_FOUND;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("cannot connect to compositor socket {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compositor socket I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("compositor IPC unavailable: connection closed")]
    ConnectionClosed,

    #[error("protocol error: {0}")]
    Protocol(String),

    /// The compositor answered a specific request with an error. The
    /// connection stays usable.
    #[error("compositor rejected {method}: {message}")]
    Remote { method: String, message: String },
}

impl IpcError {
    /// Map an error surfaced by the framed reader or writer.
    pub fn from_frame_error(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData => Self::Protocol(err.to_string()),
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }

    /// Everything except a remote error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Remote { .. })
    }

    /// The request named a method no loaded compositor plugin provides.
    pub fn is_method_missing(&self) -> bool {
        matches!(self, Self::Remote { message, .. } if message == METHOD_NOT_FOUND)
    }

    /// Compositor plugin owning the rejected method (`window-rules` for
    /// `window-rules/get-view-property`).
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Remote { method, .. } => method.split_once('/').map(|(plugin, _)| plugin),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
