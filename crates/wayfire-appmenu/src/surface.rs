//! Notifications for whatever renders the menu.

use std::io::Write;

use serde::Serialize;

use crate::binding::MenuBinding;

/// Receiver of the resolver's output.
pub trait MenuSurface {
    fn on_active_title_changed(&mut self, title: &str);
    fn on_binding_changed(&mut self, binding: &MenuBinding);
}

/// One surface notification, as written by [`JsonLinesSurface`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceUpdate {
    Title { title: String },
    Binding { binding: MenuBinding },
}

/// Writes every notification as one JSON object per line, for a panel
/// process to consume.
#[derive(Debug)]
pub struct JsonLinesSurface<W> {
    out: W,
}

impl<W: Write> JsonLinesSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, update: &SurfaceUpdate) {
        let result = serde_json::to_writer(&mut self.out, update)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write surface update");
        }
    }
}

impl<W: Write> MenuSurface for JsonLinesSurface<W> {
    fn on_active_title_changed(&mut self, title: &str) {
        self.emit(&SurfaceUpdate::Title {
            title: title.to_string(),
        });
    }

    fn on_binding_changed(&mut self, binding: &MenuBinding) {
        self.emit(&SurfaceUpdate::Binding {
            binding: binding.clone(),
        });
    }
}

/// Keeps every notification in order.
impl MenuSurface for Vec<SurfaceUpdate> {
    fn on_active_title_changed(&mut self, title: &str) {
        self.push(SurfaceUpdate::Title {
            title: title.to_string(),
        });
    }

    fn on_binding_changed(&mut self, binding: &MenuBinding) {
        self.push(SurfaceUpdate::Binding {
            binding: binding.clone(),
        });
    }
}
