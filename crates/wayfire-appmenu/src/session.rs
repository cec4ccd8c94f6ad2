//! Session lifecycle - connection, subscription and the event loop.
//!
//! Flow:
//! 1. Connect to the compositor socket
//! 2. Spawn the writer task and send the event watch request
//! 3. Poll one frame at a time, dispatching into the resolver
//! 4. On a fatal error or peer close: drop all state and return

use std::io;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;

use crate::bridge::codec::JsonCodec;
use crate::bridge::protocol::Request;
use crate::bridge::transport;
use crate::client::{ProtocolClient, QuerySink, run_writer};
use crate::config::SessionConfig;
use crate::error::{IpcError, Result};
use crate::resolver::MenuResolver;
use crate::surface::MenuSurface;

/// Run one compositor session until it fails, the peer goes away, or the
/// process is interrupted.
///
/// Nothing is retried: a caller wanting to reconnect builds a new session.
pub async fn run_session<S>(config: &SessionConfig, surface: &mut S) -> Result<()>
where
    S: MenuSurface + ?Sized,
{
    let (stream, _path) = transport::connect(config.socket.as_deref()).await?;
    let (read_half, write_half) = stream.into_split();

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(run_writer(
        FramedWrite::new(write_half, JsonCodec::new()),
        outbox_rx,
    ));

    let mut client = ProtocolClient::new(read_half, outbox_tx);
    let mut resolver = MenuResolver::new(config.identity());

    tracing::debug!(events = ?config.events, "Subscribing to view events");
    client.send(Request::watch(config.events.iter().cloned()))?;

    let result = tokio::select! {
        result = drive(&mut client, &mut resolver, surface) => result,
        joined = &mut writer => match joined {
            Ok(Ok(())) => Err(IpcError::ConnectionClosed),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(IpcError::Io(io::Error::other(e))),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, closing compositor session");
            Ok(())
        }
    };

    writer.abort();
    tracing::info!(pending = client.pending(), "Compositor session ended");
    result
}

/// Poll and dispatch until a fatal error.
///
/// Remote errors are reported and skipped; every other error stops
/// processing immediately, so no further frame is read.
pub async fn drive<R, S>(
    client: &mut ProtocolClient<R>,
    resolver: &mut MenuResolver,
    surface: &mut S,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    S: MenuSurface + ?Sized,
{
    loop {
        let inbound = match client.poll().await {
            Ok(inbound) => inbound,
            Err(e) if !e.is_fatal() => {
                report_remote(&e);
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, pending = client.pending(), "Compositor session failed");
                return Err(e);
            }
        };
        resolver.dispatch(inbound, client, surface)?;
    }
}

fn report_remote(err: &IpcError) {
    if err.is_method_missing() {
        tracing::error!(
            error = %err,
            plugin = err.plugin().unwrap_or("unknown"),
            "Required compositor feature is not enabled; enable the plugin and restart Wayfire"
        );
    } else {
        tracing::warn!(error = %err, "Compositor request failed");
    }
}
