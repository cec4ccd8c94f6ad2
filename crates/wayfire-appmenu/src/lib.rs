//! wayfire-appmenu: follows the focused Wayfire view and resolves the
//! application menu it exports.

pub mod binding;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod surface;

pub use binding::MenuBinding;
pub use bridge::protocol::{ViewId, ViewInfo, ViewProperty};
pub use client::{Inbound, ProtocolClient, QuerySink};
pub use config::SessionConfig;
pub use error::IpcError;
pub use resolver::MenuResolver;
pub use session::{drive, run_session};
pub use surface::{JsonLinesSurface, MenuSurface, SurfaceUpdate};
