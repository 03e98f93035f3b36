//! The Song Resolver: AST (`beatbax-parser`) to Intermediate Song Model.
//!
//! - [`ism`] — the ISM types (`ResolvedSong`, `ResolvedChannel`, `ChannelEvent`).
//! - [`expand`] — pattern/sequence reference materialization and transform application.
//! - [`walk`] — the per-channel token-list walk producing final events.
//! - [`resolve`] — the top-level entry point.
//! - [`warn`] — deduplicated warning emission shared across the above.

#![warn(missing_docs)]

pub mod expand;
pub mod ism;
pub mod resolve;
pub mod walk;
pub mod warn;

pub use ism::{ChannelEvent, ChannelEventKind, PlaybackMode, ResolvedChannel, ResolvedSong};
pub use resolve::{resolve, total_events, total_sounding_events};
