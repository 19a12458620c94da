//! Archgraph Engine: configuration, build pipeline and notifications

pub mod config;
pub mod notify;
pub mod report;
pub mod context;
pub mod pipeline;


pub use config::{ConfigError, EngineConfig};
pub use notify::{BuildEvent, EventKind, HttpNotifier, NoopNotifier, NotificationSink, NotifyError};
pub use report::{BuildReport, BuildStatus, Destination, Phase};
pub use context::{EngineContext, SetupError};
pub use pipeline::{BuildError, BuildMode, BuildRequest, TriggerAck};
