//! Concord client core: channel permission resolution, paginated message
//! history, and bounded caches for Discord-compatible chat APIs.
//!
//! The crate installs no `tracing` subscriber; applications pick their own.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod rest;


pub use cache::{MessageCache, RingBuffer};
pub use config::{ClientConfig, UserAgent};
pub use engine::history::{HistoryAnchor, walk};
pub use engine::permissions::{Overwrite, OverwriteTarget, PermissionResolver, Permissions, Principal};
pub use engine::registry::{EntityCache, EntityLookup};
pub use error::{Error, RestError, Result};
pub use rest::http::HttpRestClient;
pub use rest::{MessagePageSource, PageRequest};
