pub mod dom;
pub mod error;
pub mod events;
pub mod fallback;
pub mod loader;
pub mod runtime;

pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use events::ReadyState;
pub use fallback::{FallbackController, FallbackStep, Transition, PLACEHOLDER_SRC};
pub use loader::{settle_document, DiskOracle, LoadOracle, SettleLimits, SettleReport, UrlSetOracle};
