//! Focus tracking and menu resolution.
//!
//! [`MenuResolver`] owns all mutable session state: the view registry, the
//! focused view and our own view id. Every classified frame goes through
//! [`MenuResolver::dispatch`].
//!
//! Per view:
//!
//! ```text
//! Unmapped -> Mapped -> PendingQuery -> Resolved(binding) | Unresolved
//!                            ^                |
//!                            +-- refocus, incomplete bag
//! ```
//!
//! An unmapped event returns a view to `Unmapped` from any state.

use crate::binding::MenuBinding;
use crate::bridge::protocol::{Event, EventKind, Request, ViewId, ViewInfo, ViewProperty};
use crate::client::{Inbound, QuerySink};
use crate::error::Result;
use crate::queue::PendingQuery;
use crate::registry::{PropertyUpdate, SelfIdentity, ViewRegistry};
use crate::surface::MenuSurface;

/// Title shown when the focused view has none.
pub const UNKNOWN_TITLE: &str = "(unknown)";

pub struct MenuResolver {
    registry: ViewRegistry,
    active: Option<ViewId>,
}

impl MenuResolver {
    pub fn new(identity: SelfIdentity) -> Self {
        Self {
            registry: ViewRegistry::new(identity),
            active: None,
        }
    }

    /// Currently focused view, if any.
    pub fn active(&self) -> Option<ViewId> {
        self.active
    }

    pub fn own_id(&self) -> Option<ViewId> {
        self.registry.own_id()
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn dispatch<Q, S>(&mut self, inbound: Inbound, sink: &mut Q, surface: &mut S) -> Result<()>
    where
        Q: QuerySink + ?Sized,
        S: MenuSurface + ?Sized,
    {
        match inbound {
            Inbound::Event(event) => self.on_event(event, sink, surface),
            Inbound::Property { query, value } => {
                self.on_property(query, value, surface);
                Ok(())
            }
            Inbound::Ack { method } => {
                tracing::debug!(method, "Request acknowledged");
                Ok(())
            }
        }
    }

    fn on_event<Q, S>(&mut self, event: Event, sink: &mut Q, surface: &mut S) -> Result<()>
    where
        Q: QuerySink + ?Sized,
        S: MenuSurface + ?Sized,
    {
        let Some(view) = event.view else {
            // Focus moving to nothing keeps the last menu on screen.
            tracing::debug!(event = %event.kind, "Event without view");
            return Ok(());
        };

        match event.kind {
            EventKind::ViewFocused => self.on_focus(&view, sink, surface)?,
            EventKind::ViewMapped => self.registry.on_mapped(&view),
            EventKind::ViewUnmapped => self.on_unmapped(view.id, surface),
            EventKind::ViewTitleChanged => self.on_title_changed(&view, surface),
            EventKind::Other(name) => {
                tracing::debug!(event = %name, view_id = %view.id, "Ignoring event");
            }
        }
        Ok(())
    }

    pub fn on_focus<Q, S>(&mut self, view: &ViewInfo, sink: &mut Q, surface: &mut S) -> Result<()>
    where
        Q: QuerySink + ?Sized,
        S: MenuSurface + ?Sized,
    {
        if self.registry.identify(view) {
            tracing::trace!(view_id = %view.id, "Ignoring focus on own window");
            return Ok(());
        }
        if !view.is_toplevel() {
            tracing::trace!(view_id = %view.id, kind = ?view.kind, "Ignoring focus on non-toplevel");
            return Ok(());
        }
        if self.active == Some(view.id) {
            return Ok(());
        }

        tracing::debug!(view_id = %view.id, title = ?view.title, "Focus changed");
        self.active = Some(view.id);
        surface.on_active_title_changed(view.title.as_deref().unwrap_or(UNKNOWN_TITLE));

        let bag = self.registry.on_focused(view);
        if bag.is_complete() {
            surface.on_binding_changed(&MenuBinding::resolve(bag));
            return Ok(());
        }

        surface.on_binding_changed(&MenuBinding::None);
        for property in ViewProperty::QUERY_ORDER {
            sink.send(Request::get_view_property(view.id, property))?;
        }
        Ok(())
    }

    fn on_unmapped<S>(&mut self, id: ViewId, surface: &mut S)
    where
        S: MenuSurface + ?Sized,
    {
        self.registry.on_unmapped(id);
        if self.active == Some(id) {
            tracing::debug!(view_id = %id, "Focused view unmapped");
            self.active = None;
            surface.on_binding_changed(&MenuBinding::None);
        }
    }

    fn on_title_changed<S>(&mut self, view: &ViewInfo, surface: &mut S)
    where
        S: MenuSurface + ?Sized,
    {
        self.registry.identify(view);
        self.registry.set_title(view.id, view.title.clone());
        if self.active == Some(view.id)
            && let Some(title) = view.title.as_deref()
        {
            surface.on_active_title_changed(title);
        }
    }

    fn on_property<S>(&mut self, query: PendingQuery, value: Option<String>, surface: &mut S)
    where
        S: MenuSurface + ?Sized,
    {
        let update = self
            .registry
            .on_property_reply(query.view, query.property, value);
        if update != PropertyUpdate::Complete || self.active != Some(query.view) {
            return;
        }
        if let Some(bag) = self.registry.get(query.view) {
            let binding = MenuBinding::resolve(bag);
            tracing::info!(view_id = %query.view, ?binding, "Menu resolved");
            surface.on_binding_changed(&binding);
        }
    }
}
