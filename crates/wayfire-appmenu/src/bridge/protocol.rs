//! Wire protocol types for the Wayfire IPC socket.
//!
//! Outgoing frames are [`Request`]s (`{"method": ..., "data": {...}}`).
//! Incoming frames decode as [`WireMessage`] and are classified into a
//! [`Message`]: anything carrying an `event` field is an [`Event`], every
//! other frame is a [`Reply`] to the oldest outstanding request.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text the compositor returns for a method whose plugin is not loaded.
pub const METHOD_NOT_FOUND: &str = "No such method found!";

/// Compositor-assigned view identifier.
///
/// Unique among mapped views; the compositor may hand it out again after the
/// view is unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u32);

impl ViewId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Menu-exporting view properties the compositor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewProperty {
    KdeAppmenuServiceName,
    KdeAppmenuObjectPath,
    GtkShellAppMenuPath,
    GtkShellApplicationObjectPath,
    GtkShellMenubarPath,
    GtkShellUniqueBusName,
    GtkShellWindowObjectPath,
}

impl ViewProperty {
    /// Order in which a view's properties are always queried. The reply to
    /// the last entry completes the batch.
    pub const QUERY_ORDER: [ViewProperty; 7] = [
        ViewProperty::KdeAppmenuServiceName,
        ViewProperty::KdeAppmenuObjectPath,
        ViewProperty::GtkShellAppMenuPath,
        ViewProperty::GtkShellApplicationObjectPath,
        ViewProperty::GtkShellMenubarPath,
        ViewProperty::GtkShellUniqueBusName,
        ViewProperty::GtkShellWindowObjectPath,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KdeAppmenuServiceName => "kde-appmenu-service-name",
            Self::KdeAppmenuObjectPath => "kde-appmenu-object-path",
            Self::GtkShellAppMenuPath => "gtk-shell-app-menu-path",
            Self::GtkShellApplicationObjectPath => "gtk-shell-application-object-path",
            Self::GtkShellMenubarPath => "gtk-shell-menubar-path",
            Self::GtkShellUniqueBusName => "gtk-shell-unique-bus-name",
            Self::GtkShellWindowObjectPath => "gtk-shell-window-object-path",
        }
    }

    /// True for the property whose reply completes a view's batch.
    pub fn completes_batch(self) -> bool {
        self == Self::QUERY_ORDER[Self::QUERY_ORDER.len() - 1]
    }
}

impl fmt::Display for ViewProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests from us to the compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "data")]
pub enum Request {
    /// Subscribe to view events. Must be the first request of a session.
    #[serde(rename = "window-rules/events/watch")]
    Watch { events: Vec<String> },

    #[serde(rename = "window-rules/get-view-property")]
    GetViewProperty { id: ViewId, property: ViewProperty },
}

impl Request {
    pub fn watch<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Watch {
            events: events.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get_view_property(id: ViewId, property: ViewProperty) -> Self {
        Self::GetViewProperty { id, property }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Watch { .. } => "window-rules/events/watch",
            Self::GetViewProperty { .. } => "window-rules/get-view-property",
        }
    }
}

/// Raw shape of every frame the compositor sends.
///
/// Events and replies share one JSON object namespace, so all fields are
/// optional and classification happens in [`Message::from`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub view: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

/// View payload attached to view events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub id: ViewId,
    #[serde(rename = "app-id", default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ViewInfo {
    pub fn is_toplevel(&self) -> bool {
        self.kind.as_deref() == Some("toplevel")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ViewFocused,
    ViewMapped,
    ViewUnmapped,
    ViewTitleChanged,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ViewFocused => "view-focused",
            Self::ViewMapped => "view-mapped",
            Self::ViewUnmapped => "view-unmapped",
            Self::ViewTitleChanged => "view-title-changed",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "view-focused" => Self::ViewFocused,
            "view-mapped" => Self::ViewMapped,
            "view-unmapped" => Self::ViewUnmapped,
            "view-title-changed" => Self::ViewTitleChanged,
            _ => Self::Other(name),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsolicited notification from the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// `None` both when the compositor sends `"view": null` (e.g. focus moved
    /// to no view) and when the payload could not be parsed.
    pub view: Option<ViewInfo>,
}

/// Answer to a request, correlated by send order.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok { value: Option<Value> },
    Error {
        message: String,
        method: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Event(Event),
    Reply(Reply),
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        if let Some(name) = wire.event {
            let kind = EventKind::from(name);
            let view = match wire.view {
                None | Some(Value::Null) => None,
                Some(raw) => match serde_json::from_value::<ViewInfo>(raw) {
                    Ok(view) => Some(view),
                    Err(e) => {
                        tracing::warn!(event = %kind, error = %e, "Ignoring malformed view payload");
                        None
                    }
                },
            };
            return Message::Event(Event { kind, view });
        }

        if let Some(message) = wire.error {
            return Message::Reply(Reply::Error {
                message,
                method: wire.method,
            });
        }

        match wire.result {
            None => Message::Reply(Reply::Ok { value: wire.value }),
            Some(Value::String(ref result)) if result == "ok" => {
                Message::Reply(Reply::Ok { value: wire.value })
            }
            Some(other) => Message::Reply(Reply::Error {
                message: format!("unexpected result {}", other),
                method: wire.method,
            }),
        }
    }
}
