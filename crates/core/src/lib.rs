//! `catalog-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the identifier generation capability, the clock seam and
//! the domain error model.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{ClockIdGenerator, IdGenerator, ProductId, SequenceIdGenerator, VariantId};
