//! Per-view property cache.

use std::collections::HashMap;

use crate::bridge::protocol::{ViewId, ViewInfo, ViewProperty};

/// Everything known about one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    title: Option<String>,
    values: HashMap<ViewProperty, String>,
    complete: bool,
}

impl PropertyBag {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn get(&self, property: ViewProperty) -> Option<&str> {
        self.values.get(&property).map(String::as_str)
    }

    /// True once the reply for the last property of a batch has arrived.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_title(&mut self, title: Option<String>) {
        if title.is_some() {
            self.title = title;
        }
    }

    /// Merge one reply. Returns whether it completed the batch.
    pub fn merge(&mut self, property: ViewProperty, value: Option<String>) -> PropertyUpdate {
        match value {
            Some(value) => {
                self.values.insert(property, value);
            }
            None => {
                self.values.remove(&property);
            }
        }

        if property.completes_batch() {
            self.complete = true;
            PropertyUpdate::Complete
        } else {
            PropertyUpdate::Partial
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyUpdate {
    Partial,
    Complete,
}

/// How this process recognises its own window among the compositor's views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfIdentity {
    pub title: String,
    pub app_id: Option<String>,
}

impl SelfIdentity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            app_id: None,
        }
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn matches(&self, view: &ViewInfo) -> bool {
        if view.title.as_deref() == Some(self.title.as_str()) {
            return true;
        }
        matches!((&self.app_id, &view.app_id), (Some(ours), Some(theirs)) if ours == theirs)
    }
}

#[derive(Debug)]
pub struct ViewRegistry {
    views: HashMap<ViewId, PropertyBag>,
    identity: SelfIdentity,
    own: Option<ViewId>,
}

impl ViewRegistry {
    pub fn new(identity: SelfIdentity) -> Self {
        Self {
            views: HashMap::new(),
            identity,
            own: None,
        }
    }

    /// Id of our own window, once seen.
    pub fn own_id(&self) -> Option<ViewId> {
        self.own
    }

    /// Check a view payload against our identity, remembering the id on a
    /// match. Returns true if `view` is our own window.
    pub fn identify(&mut self, view: &ViewInfo) -> bool {
        if self.own == Some(view.id) {
            return true;
        }
        if self.identity.matches(view) {
            tracing::debug!(view_id = %view.id, "Identified own window");
            self.own = Some(view.id);
            return true;
        }
        false
    }

    /// A mapped view starts with no properties. Anything left under a
    /// reused id belonged to the previous view and is dropped.
    pub fn on_mapped(&mut self, view: &ViewInfo) {
        self.identify(view);
        let mut bag = PropertyBag::default();
        bag.set_title(view.title.clone());
        if self.views.insert(view.id, bag).is_some() {
            tracing::debug!(view_id = %view.id, "Discarded stale properties on map");
        }
        tracing::trace!(view_id = %view.id, toplevel = view.is_toplevel(), "View mapped");
    }

    /// Ensure a bag exists for a view that just gained focus, even if its
    /// mapped event was never seen.
    pub fn on_focused(&mut self, view: &ViewInfo) -> &PropertyBag {
        let bag = self.views.entry(view.id).or_default();
        bag.set_title(view.title.clone());
        bag
    }

    /// Forget a view. Returns its bag if one existed.
    pub fn on_unmapped(&mut self, id: ViewId) -> Option<PropertyBag> {
        if self.own == Some(id) {
            self.own = None;
        }
        tracing::trace!(view_id = %id, "View unmapped");
        self.views.remove(&id)
    }

    pub fn on_property_reply(
        &mut self,
        id: ViewId,
        property: ViewProperty,
        value: Option<String>,
    ) -> PropertyUpdate {
        tracing::trace!(view_id = %id, %property, ?value, "Property reply");
        self.views.entry(id).or_default().merge(property, value)
    }

    pub fn set_title(&mut self, id: ViewId, title: Option<String>) {
        if let Some(bag) = self.views.get_mut(&id) {
            bag.set_title(title);
        }
    }

    pub fn get(&self, id: ViewId) -> Option<&PropertyBag> {
        self.views.get(&id)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u32, title: &str) -> ViewInfo {
        ViewInfo {
            id: ViewId::new(id),
            app_id: None,
            title: Some(title.to_string()),
            kind: Some("toplevel".to_string()),
        }
    }

    fn registry() -> ViewRegistry {
        ViewRegistry::new(SelfIdentity::new("Global menu"))
    }

    #[test]
    fn mapped_creates_empty_bag() {
        let mut reg = registry();
        reg.on_mapped(&view(3, "Editor"));

        let bag = reg.get(ViewId::new(3)).unwrap();
        assert_eq!(bag.title(), Some("Editor"));
        assert!(!bag.is_complete());
        assert_eq!(bag.get(ViewProperty::GtkShellMenubarPath), None);
        assert_eq!(reg.own_id(), None);
    }

    #[test]
    fn mapped_with_own_title_records_self() {
        let mut reg = registry();
        reg.on_mapped(&view(1, "Global menu"));
        assert_eq!(reg.own_id(), Some(ViewId::new(1)));

        reg.on_unmapped(ViewId::new(1));
        assert_eq!(reg.own_id(), None);
    }

    #[test]
    fn self_identified_by_app_id() {
        let mut reg = ViewRegistry::new(SelfIdentity::new("Global menu").with_app_id("wayfire-appmenu"));
        let mut ours = view(8, "something else");
        ours.app_id = Some("wayfire-appmenu".to_string());

        assert!(!reg.identify(&view(2, "Editor")));
        assert!(reg.identify(&ours));
        assert_eq!(reg.own_id(), Some(ViewId::new(8)));
    }

    #[test]
    fn only_last_property_completes() {
        let mut reg = registry();
        let id = ViewId::new(3);

        for prop in &ViewProperty::QUERY_ORDER[..ViewProperty::QUERY_ORDER.len() - 1] {
            assert_eq!(
                reg.on_property_reply(id, *prop, Some(format!("{prop}-value"))),
                PropertyUpdate::Partial
            );
            assert!(!reg.get(id).unwrap().is_complete());
        }
        assert_eq!(
            reg.on_property_reply(id, ViewProperty::GtkShellWindowObjectPath, None),
            PropertyUpdate::Complete
        );

        let bag = reg.get(id).unwrap();
        assert!(bag.is_complete());
        assert_eq!(
            bag.get(ViewProperty::GtkShellMenubarPath),
            Some("gtk-shell-menubar-path-value")
        );
        assert_eq!(bag.get(ViewProperty::GtkShellWindowObjectPath), None);
    }

    #[test]
    fn property_reply_creates_bag_for_unknown_view() {
        let mut reg = registry();
        reg.on_property_reply(ViewId::new(12), ViewProperty::KdeAppmenuServiceName, Some(":1.7".into()));
        assert_eq!(
            reg.get(ViewId::new(12)).unwrap().get(ViewProperty::KdeAppmenuServiceName),
            Some(":1.7")
        );
    }

    #[test]
    fn unmapped_drops_bag() {
        let mut reg = registry();
        reg.on_mapped(&view(3, "Editor"));
        reg.on_property_reply(ViewId::new(3), ViewProperty::GtkShellMenubarPath, Some("/m".into()));

        let removed = reg.on_unmapped(ViewId::new(3)).unwrap();
        assert_eq!(removed.get(ViewProperty::GtkShellMenubarPath), Some("/m"));
        assert!(reg.get(ViewId::new(3)).is_none());
    }

    #[test]
    fn remap_discards_replies_that_outlived_the_view() {
        let mut reg = registry();
        let id = ViewId::new(3);
        reg.on_mapped(&view(3, "Old app"));
        reg.on_unmapped(id);
        reg.on_property_reply(id, ViewProperty::GtkShellMenubarPath, Some("/old".into()));
        reg.on_property_reply(id, ViewProperty::GtkShellWindowObjectPath, None);
        assert!(reg.get(id).unwrap().is_complete());

        reg.on_mapped(&view(3, "New app"));

        let bag = reg.get(id).unwrap();
        assert!(!bag.is_complete());
        assert_eq!(bag.title(), Some("New app"));
        assert_eq!(bag.get(ViewProperty::GtkShellMenubarPath), None);
    }

    #[test]
    fn focus_creates_bag_for_unseen_view() {
        let mut reg = registry();
        let bag = reg.on_focused(&view(6, "Browser"));
        assert_eq!(bag.title(), Some("Browser"));
        assert!(!bag.is_complete());

        reg.on_property_reply(ViewId::new(6), ViewProperty::GtkShellMenubarPath, Some("/m".into()));
        let bag = reg.on_focused(&view(6, "Browser"));
        assert_eq!(bag.get(ViewProperty::GtkShellMenubarPath), Some("/m"));
    }

    #[test]
    fn missing_title_keeps_previous() {
        let mut reg = registry();
        reg.on_mapped(&view(3, "Editor"));
        reg.set_title(ViewId::new(3), None);
        assert_eq!(reg.get(ViewId::new(3)).unwrap().title(), Some("Editor"));

        reg.set_title(ViewId::new(3), Some("Editor - notes.txt".into()));
        assert_eq!(reg.get(ViewId::new(3)).unwrap().title(), Some("Editor - notes.txt"));
    }
}
