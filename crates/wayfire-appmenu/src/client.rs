//! Protocol client: fire-and-forget requests, one decoded frame per poll.
//!
//! Writes go through an unbounded channel to a single writer task
//! ([`run_writer`]) so `send` never waits on the socket and frames from
//! different handlers cannot interleave. Reads happen on the caller's task:
//! `poll` decodes exactly one frame and either hands back an event or pairs
//! the reply with the oldest entry of the [`RequestQueue`].

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::JsonCodec;
use crate::bridge::protocol::{Event, Message, Reply, Request, WireMessage};
use crate::error::{IpcError, Result};
use crate::queue::{PendingQuery, PendingRequest, RequestQueue};

/// Destination for outgoing requests.
///
/// The resolver only needs to issue queries; keeping that behind a trait lets
/// it run against a recording sink in tests and keeps the correlation
/// strategy private to the client.
pub trait QuerySink {
    fn send(&mut self, request: Request) -> Result<()>;
}

/// A classified incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(Event),
    /// Reply to a property query. `value` is `None` when the view does not
    /// export the property.
    Property {
        query: PendingQuery,
        value: Option<String>,
    },
    /// Successful reply to a request that carries no data (event watch).
    Ack { method: &'static str },
}

pub struct ProtocolClient<R> {
    reader: FramedRead<R, JsonCodec<WireMessage>>,
    outbox: mpsc::UnboundedSender<Request>,
    queue: RequestQueue,
}

impl<R> ProtocolClient<R> {
    pub fn new(reader: R, outbox: mpsc::UnboundedSender<Request>) -> Self {
        Self {
            reader: FramedRead::new(reader, JsonCodec::new()),
            outbox,
            queue: RequestQueue::new(),
        }
    }

    /// Number of requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Route a decoded message. Events bypass the queue; anything else
    /// consumes exactly one queue entry.
    pub fn route(&mut self, message: Message) -> Result<Inbound> {
        let reply = match message {
            Message::Event(event) => return Ok(Inbound::Event(event)),
            Message::Reply(reply) => reply,
        };

        let pending = self.queue.pop()?;
        match reply {
            Reply::Error { message, method } => Err(IpcError::Remote {
                method: method.unwrap_or_else(|| pending.method().to_string()),
                message,
            }),
            Reply::Ok { value } => Ok(match pending {
                PendingRequest::Watch => Inbound::Ack {
                    method: pending.method(),
                },
                PendingRequest::Property(query) => Inbound::Property {
                    query,
                    value: property_text(value),
                },
            }),
        }
    }
}

impl<R: AsyncRead + Unpin> ProtocolClient<R> {
    /// Wait for and classify the next frame.
    pub async fn poll(&mut self) -> Result<Inbound> {
        let wire = match self.reader.next().await {
            Some(Ok(wire)) => wire,
            Some(Err(e)) => return Err(IpcError::from_frame_error(e)),
            None => return Err(IpcError::ConnectionClosed),
        };
        self.route(Message::from(wire))
    }
}

impl<R> QuerySink for ProtocolClient<R> {
    fn send(&mut self, request: Request) -> Result<()> {
        let pending = PendingRequest::from(&request);
        self.outbox
            .send(request)
            .map_err(|_| IpcError::ConnectionClosed)?;
        self.queue.push(pending);
        Ok(())
    }
}

/// Property values are strings; anything else is kept as its JSON text.
fn property_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Drain the outbox onto the socket, one whole frame at a time.
///
/// Returns `Ok(())` once every sender is gone.
pub async fn run_writer<W: AsyncWrite + Unpin>(
    mut writer: FramedWrite<W, JsonCodec<Request>>,
    mut outbox: mpsc::UnboundedReceiver<Request>,
) -> Result<()> {
    while let Some(request) = outbox.recv().await {
        tracing::debug!(method = request.method(), "Sending request");
        writer
            .send(request)
            .await
            .map_err(IpcError::from_frame_error)?;
    }
    tracing::debug!("Request channel closed, writer exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{EventKind, ViewId, ViewProperty};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn frame(value: serde_json::Value) -> Vec<u8> {
        let payload = serde_json::to_vec(&value).unwrap();
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&payload);
        out
    }

    fn client() -> (
        ProtocolClient<DuplexStream>,
        DuplexStream,
        mpsc::UnboundedReceiver<Request>,
    ) {
        let (ours, compositor) = tokio::io::duplex(64 * 1024);
        let (tx, rx) = mpsc::unbounded_channel();
        (ProtocolClient::new(ours, tx), compositor, rx)
    }

    fn query(view: u32, property: ViewProperty) -> PendingQuery {
        PendingQuery {
            view: ViewId::new(view),
            property,
        }
    }

    #[tokio::test]
    async fn replies_match_requests_in_send_order() {
        let (mut client, mut compositor, mut rx) = client();
        let view = ViewId::new(4);

        client.send(Request::watch(["view-focused"])).unwrap();
        for prop in ViewProperty::QUERY_ORDER {
            client.send(Request::get_view_property(view, prop)).unwrap();
        }
        assert_eq!(client.pending(), 8);

        // Requests reach the writer untouched and in order.
        assert_eq!(rx.recv().await.unwrap(), Request::watch(["view-focused"]));
        for prop in ViewProperty::QUERY_ORDER {
            assert_eq!(rx.recv().await.unwrap(), Request::get_view_property(view, prop));
        }

        compositor.write_all(&frame(json!({"result": "ok"}))).await.unwrap();
        for (i, _) in ViewProperty::QUERY_ORDER.iter().enumerate() {
            // Events interleaved with replies must not consume queue entries.
            compositor
                .write_all(&frame(json!({"event": "view-title-changed", "view": null})))
                .await
                .unwrap();
            compositor
                .write_all(&frame(json!({"result": "ok", "value": format!("v{i}")})))
                .await
                .unwrap();
        }

        assert_eq!(
            client.poll().await.unwrap(),
            Inbound::Ack {
                method: "window-rules/events/watch"
            }
        );
        for (i, prop) in ViewProperty::QUERY_ORDER.into_iter().enumerate() {
            let Inbound::Event(event) = client.poll().await.unwrap() else {
                panic!("expected event");
            };
            assert_eq!(event.kind, EventKind::ViewTitleChanged);

            assert_eq!(
                client.poll().await.unwrap(),
                Inbound::Property {
                    query: query(4, prop),
                    value: Some(format!("v{i}")),
                }
            );
        }
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test]
    async fn reply_without_request_is_protocol_error() {
        let (mut client, mut compositor, _rx) = client();

        compositor
            .write_all(&frame(json!({"result": "ok", "value": "stray"})))
            .await
            .unwrap();

        assert!(matches!(client.poll().await, Err(IpcError::Protocol(_))));
    }

    #[tokio::test]
    async fn remote_error_consumes_entry_and_keeps_client_usable() {
        let (mut client, mut compositor, _rx) = client();
        client
            .send(Request::get_view_property(
                ViewId::new(2),
                ViewProperty::KdeAppmenuServiceName,
            ))
            .unwrap();
        client
            .send(Request::get_view_property(
                ViewId::new(2),
                ViewProperty::KdeAppmenuObjectPath,
            ))
            .unwrap();

        compositor
            .write_all(&frame(json!({"error": "No such method found!"})))
            .await
            .unwrap();
        compositor
            .write_all(&frame(json!({"result": "ok", "value": "/MenuBar/2"})))
            .await
            .unwrap();

        let err = client.poll().await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.is_method_missing());
        assert_eq!(err.plugin(), Some("window-rules"));

        assert_eq!(
            client.poll().await.unwrap(),
            Inbound::Property {
                query: query(2, ViewProperty::KdeAppmenuObjectPath),
                value: Some("/MenuBar/2".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn missing_or_empty_value_reads_as_absent() {
        let (mut client, mut compositor, _rx) = client();
        for prop in [
            ViewProperty::GtkShellMenubarPath,
            ViewProperty::GtkShellUniqueBusName,
            ViewProperty::GtkShellWindowObjectPath,
        ] {
            client
                .send(Request::get_view_property(ViewId::new(1), prop))
                .unwrap();
        }

        compositor.write_all(&frame(json!({"result": "ok"}))).await.unwrap();
        compositor
            .write_all(&frame(json!({"result": "ok", "value": ""})))
            .await
            .unwrap();
        compositor
            .write_all(&frame(json!({"result": "ok", "value": null})))
            .await
            .unwrap();

        for _ in 0..3 {
            let Inbound::Property { value, .. } = client.poll().await.unwrap() else {
                panic!("expected property reply");
            };
            assert_eq!(value, None);
        }
    }

    #[tokio::test]
    async fn peer_close_is_connection_closed() {
        let (mut client, compositor, _rx) = client();
        drop(compositor);
        assert!(matches!(client.poll().await, Err(IpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn truncated_frame_is_connection_closed() {
        let (mut client, mut compositor, _rx) = client();
        let bytes = frame(json!({"event": "view-mapped", "view": null}));
        compositor.write_all(&bytes[..bytes.len() - 2]).await.unwrap();
        drop(compositor);

        assert!(matches!(client.poll().await, Err(IpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn send_after_writer_gone_is_connection_closed() {
        let (mut client, _compositor, rx) = client();
        drop(rx);

        let err = client.send(Request::watch(["view-focused"])).unwrap_err();
        assert!(matches!(err, IpcError::ConnectionClosed));
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test]
    async fn writer_emits_length_prefixed_frames() {
        let (ours, mut compositor) = tokio::io::duplex(64 * 1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(FramedWrite::new(ours, JsonCodec::new()), rx));

        let req = Request::get_view_property(ViewId::new(5), ViewProperty::GtkShellMenubarPath);
        tx.send(req.clone()).unwrap();
        drop(tx);
        writer.await.unwrap().unwrap();

        let mut len = [0u8; 4];
        compositor.read_exact(&mut len).await.unwrap();
        let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
        compositor.read_exact(&mut payload).await.unwrap();

        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&payload).unwrap(),
            serde_json::to_value(&req).unwrap()
        );
    }
}
