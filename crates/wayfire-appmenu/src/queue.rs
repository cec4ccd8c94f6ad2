//! FIFO correlation of replies with the requests that caused them.
//!
//! The compositor answers requests strictly in send order, interleaving only
//! events. Each non-event reply therefore belongs to the oldest entry here.

use std::collections::VecDeque;

use crate::bridge::protocol::{Request, ViewId, ViewProperty};
use crate::error::{IpcError, Result};

/// An in-flight property query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub view: ViewId,
    pub property: ViewProperty,
}

/// What an outstanding request was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    /// Event subscription; its reply carries nothing we keep.
    Watch,
    Property(PendingQuery),
}

impl PendingRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Watch => "window-rules/events/watch",
            Self::Property(_) => "window-rules/get-view-property",
        }
    }
}

impl From<&Request> for PendingRequest {
    fn from(request: &Request) -> Self {
        match *request {
            Request::Watch { .. } => Self::Watch,
            Request::GetViewProperty { id, property } => Self::Property(PendingQuery {
                view: id,
                property,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<PendingRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: PendingRequest) {
        tracing::trace!(?request, depth = self.pending.len() + 1, "Request queued");
        self.pending.push_back(request);
    }

    /// Take the request the next reply answers.
    ///
    /// An empty queue means the peer replied to something never sent.
    pub fn pop(&mut self) -> Result<PendingRequest> {
        self.pending.pop_front().ok_or_else(|| {
            IpcError::Protocol("received a reply with no outstanding request".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
