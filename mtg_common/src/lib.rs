//! Shared MTG types
//!
//! Scryfall print records, rulings and bulk-data descriptors, plus the small
//! pure helpers every consumer of those records needs (name keys, collector
//! number parsing, colour identity).

pub mod bulk;
pub mod color;
pub mod names;
pub mod print;
pub mod rulings;

pub use bulk::{BulkDataset, BulkIndex};
pub use color::{metadata_from_print, normalize_color_identity, CardMetadata, WUBRG};
pub use names::{collector_number_variants, leading_number, name_key, set_number_key};
pub use print::{CardFace, ImageSet, ImageUris, PrintRecord};
pub use rulings::{RawRuling, RulingEntry};
