//! The built-in effect registry: per-channel state, lenient parameter
//! parsing, the handler functions themselves, and the name-to-handler
//! dispatch table the playback orchestrator consults per sounding event.

#![warn(missing_docs)]

pub mod context;
pub mod handlers;
pub mod params;
pub mod registry;

pub use context::{ChannelEffectState, EffectContext};
pub use registry::{default_registry, EffectHandler, EffectRegistry};
