//! One-shot bootstrap import of catalog data from an external feed.
//!
//! The importer only acts on an empty store. It fetches the feed once, takes
//! at most `limit` products and saves each through the catalog assembler,
//! keeping the feed's ids. Failures end the run and are reported through
//! [`SeedOutcome`]; they never propagate to the caller.

mod feed;
mod importer;

pub use feed::{
    FeedDocument, FeedProduct, FeedVariant, HttpProductFeed, ProductFeed, StaticProductFeed,
    parse_document,
};
pub use importer::{DEFAULT_SEED_LIMIT, SeedImporter, SeedOutcome};

use thiserror::Error;

use crate::catalog::CatalogError;

/// Seed import error. Always caught inside the importer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error(transparent)]
    Storage(#[from] CatalogError),

    #[error("feed request failed: {0}")]
    Network(String),

    #[error("feed responded with status {0}")]
    Status(u16),

    #[error("feed body could not be parsed: {0}")]
    Parse(String),
}
