//! Which menu provider a view exposes.

use serde::Serialize;

use crate::bridge::protocol::ViewProperty;
use crate::registry::PropertyBag;

/// Menu source the surface should display.
///
/// A view exposes at most one provider; when both sets of properties are
/// present the model provider wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuBinding {
    #[default]
    None,

    /// Menu model plus optional action groups, all on `bus_name`.
    Model {
        bus_name: String,
        menu_path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_action_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        win_action_path: Option<String>,
    },

    /// Legacy menu service exported at `object_path`.
    Legacy {
        service_name: String,
        object_path: String,
    },
}

impl MenuBinding {
    pub fn resolve(bag: &PropertyBag) -> Self {
        let owned = |property| bag.get(property).map(str::to_string);

        if let (Some(bus_name), Some(menu_path)) = (
            owned(ViewProperty::GtkShellUniqueBusName),
            owned(ViewProperty::GtkShellMenubarPath),
        ) {
            return Self::Model {
                bus_name,
                menu_path,
                app_action_path: owned(ViewProperty::GtkShellApplicationObjectPath),
                win_action_path: owned(ViewProperty::GtkShellWindowObjectPath),
            };
        }

        if let (Some(service_name), Some(object_path)) = (
            owned(ViewProperty::KdeAppmenuServiceName),
            owned(ViewProperty::KdeAppmenuObjectPath),
        ) {
            return Self::Legacy {
                service_name,
                object_path,
            };
        }

        Self::None
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
