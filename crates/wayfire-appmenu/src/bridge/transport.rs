//! Locating and connecting to the compositor's IPC socket.
//!
//! Resolution order:
//! - explicit path (from `WAYFIRE_SOCKET` or configuration)
//! - `wayfire-wayland*` sockets in the temp directory, newest name first
//! - [`DEFAULT_SOCKET`]

use std::io;
use std::path::{Path, PathBuf};

use tokio::net::UnixStream;

use crate::error::{IpcError, Result};

pub const SOCKET_ENV: &str = "WAYFIRE_SOCKET";
pub const DEFAULT_SOCKET: &str = "/tmp/wayfire-wayland-1.socket";
const SOCKET_DIR: &str = "/tmp";
const SOCKET_NAME_PREFIX: &str = "wayfire-wayland";

/// Sockets in `dir` that look like Wayfire's, most recent name first.
pub fn candidate_sockets(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .contains(SOCKET_NAME_PREFIX)
        {
            found.push(entry.path());
        }
    }
    found.sort();
    found.reverse();
    Ok(found)
}

async fn connect_path(path: &Path) -> Result<UnixStream> {
    tracing::trace!(path = %path.display(), "Connecting to compositor socket");
    UnixStream::connect(path)
        .await
        .map_err(|source| IpcError::Connect {
            path: path.to_path_buf(),
            source,
        })
}

/// Try every candidate in `dir`, then the default path.
pub async fn discover_in(dir: &Path) -> Result<(UnixStream, PathBuf)> {
    let candidates = candidate_sockets(dir).unwrap_or_else(|e| {
        tracing::debug!(dir = %dir.display(), error = %e, "Cannot scan for sockets");
        Vec::new()
    });

    for path in candidates {
        match connect_path(&path).await {
            Ok(stream) => return Ok((stream, path)),
            Err(e) => tracing::debug!(error = %e, "Skipping socket candidate"),
        }
    }

    let fallback = PathBuf::from(DEFAULT_SOCKET);
    let stream = connect_path(&fallback).await?;
    Ok((stream, fallback))
}

/// Connect to `explicit` if given, otherwise discover a socket.
pub async fn connect(explicit: Option<&Path>) -> Result<(UnixStream, PathBuf)> {
    let (stream, path) = match explicit {
        Some(path) => (connect_path(path).await?, path.to_path_buf()),
        None => discover_in(Path::new(SOCKET_DIR)).await?,
    };
    tracing::info!(path = %path.display(), "Connected to compositor");
    Ok((stream, path))
}
