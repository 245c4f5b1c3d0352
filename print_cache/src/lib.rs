//! Print Cache - Scryfall print resolution and bulk-data caching
//!
//! Loads the Scryfall `default_cards` bulk file into memory, indexes it, and
//! answers tolerant print lookups (set + collector number, loose numbers,
//! multi-faced names, oracle identity). Keeps a rulings index alongside and
//! refreshes both bulk files from Scryfall with conditional downloads.

pub mod bulk;
pub mod config;
pub mod error;
pub mod index;
pub mod memo;
pub mod resolve;
pub mod rulings;
pub mod service;
pub mod set_meta;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use bulk::{BulkClient, DownloadOutcome, DownloadStatus};
pub use config::{CacheConfig, HttpConfig};
pub use error::{CacheError, Result};
pub use index::{IndexSizes, PrintIndex};
pub use rulings::RulingsIndex;
pub use service::{CacheStats, PrintBundle, PrintCache, RefreshReport};
pub use set_meta::{ColorMode, CurveBucket, ImageSample, SetProfile};
