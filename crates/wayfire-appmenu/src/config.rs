//! Session configuration.

use std::path::PathBuf;

use crate::bridge::transport::SOCKET_ENV;
use crate::registry::SelfIdentity;

pub const SELF_TITLE_ENV: &str = "APPMENU_SELF_TITLE";
pub const SELF_APP_ID_ENV: &str = "APPMENU_SELF_APP_ID";

/// Title of the menu window when none is configured.
pub const DEFAULT_SELF_TITLE: &str = "Gtk global menu";

/// Events every session subscribes to unless configured otherwise.
pub const DEFAULT_EVENTS: [&str; 4] = [
    "view-focused",
    "view-mapped",
    "view-unmapped",
    "view-title-changed",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Explicit socket path; discovered when `None`.
    pub socket: Option<PathBuf>,
    pub self_title: String,
    pub self_app_id: Option<String>,
    pub events: Vec<String>,
}

impl SessionConfig {
    pub fn new(self_title: impl Into<String>) -> Self {
        Self {
            socket: None,
            self_title: self_title.into(),
            self_app_id: None,
            events: DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Read `WAYFIRE_SOCKET`, `APPMENU_SELF_TITLE` and `APPMENU_SELF_APP_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.is_empty());

        let mut config =
            Self::new(non_empty(SELF_TITLE_ENV).unwrap_or_else(|| DEFAULT_SELF_TITLE.to_string()));
        if let Some(socket) = non_empty(SOCKET_ENV) {
            config = config.with_socket(socket);
        }
        if let Some(app_id) = non_empty(SELF_APP_ID_ENV) {
            config = config.with_self_app_id(app_id);
        }
        config
    }

    pub fn with_socket(mut self, socket: impl Into<PathBuf>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    pub fn with_self_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.self_app_id = Some(app_id.into());
        self
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn identity(&self) -> SelfIdentity {
        let identity = SelfIdentity::new(self.self_title.clone());
        match &self.self_app_id {
            Some(app_id) => identity.with_app_id(app_id.clone()),
            None => identity,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SELF_TITLE)
    }
}
