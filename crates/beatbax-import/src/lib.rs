//! BeatBax import resolution: `local:`/`github:`/`http(s)://` `.ins` files,
//! merged into a song's instrument table before `beatbax-resolver` ever
//! sees it (`spec.md` §4.H).
//!
//! - [`config`] — [`ImportConfig`], the knobs governing which sources are
//!   reachable and how strictly conflicts are treated.
//! - [`fetch`] — [`fetch::ImportFetcher`], the trait remote fetches go
//!   through (so tests never touch the network).
//! - [`resolve`] — [`resolve_imports`], the recursive load/merge/cycle-check
//!   entry point.
//! - [`error`] — [`ImportError`], the fatal-failure type.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod resolve;

pub use config::ImportConfig;
pub use error::ImportError;
pub use fetch::{ImportFetcher, ReqwestFetcher};
pub use resolve::resolve_imports;
