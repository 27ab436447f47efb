//! Strongly-typed identifiers and the identifier generation capability.
//!
//! Catalog identifiers are 64-bit surrogate keys. `0` is reserved as the
//! "not yet assigned" sentinel: payloads arrive with `0` and the engine swaps
//! it for a generated value before anything is persisted.

use core::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;

/// Identifier of a product.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of a product variant.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// The "not yet assigned" sentinel.
            pub const UNASSIGNED: Self = Self(0);

            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            pub const fn is_unassigned(self) -> bool {
                self.0 == 0
            }

            /// Keep an assigned id, or draw a fresh one from `ids`.
            pub fn resolve<G: IdGenerator + ?Sized>(self, ids: &G) -> Self {
                if self.is_unassigned() {
                    Self(ids.next_id())
                } else {
                    self
                }
            }

            /// Reject negative values (the sentinel `0` is allowed).
            pub fn validate(self) -> Result<Self, DomainError> {
                if self.0 < 0 {
                    return Err(DomainError::invalid_id(format!("{}: {}", $name, self.0)));
                }
                Ok(self)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = i64::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self(value).validate()
            }
        }
    };
}

impl_i64_newtype!(ProductId, "ProductId");
impl_i64_newtype!(VariantId, "VariantId");

/// Produces probably-unique, never-zero surrogate keys.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> i64;
}

impl<G> IdGenerator for std::sync::Arc<G>
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self) -> i64 {
        (**self).next_id()
    }
}

/// Wall-clock milliseconds plus a random offset in `0..1000`.
///
/// Biased toward monotonic but not strictly so; two calls in the same
/// millisecond may collide. No counter is persisted.
#[derive(Debug, Default, Clone)]
pub struct ClockIdGenerator<C = SystemClock> {
    clock: C,
}

impl ClockIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> ClockIdGenerator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for ClockIdGenerator<C> {
    fn next_id(&self) -> i64 {
        let millis = self.clock.now().timestamp_millis();
        let offset = i64::from(OsRng.next_u32() % 1000);
        // A pre-epoch clock must still never yield the sentinel.
        millis.saturating_add(offset).max(1)
    }
}

/// Deterministic counter-based generator (tests, local tooling).
#[derive(Debug)]
pub struct SequenceIdGenerator {
    next: AtomicI64,
}

impl SequenceIdGenerator {
    /// Start handing out ids at `start` (values `<= 0` start at 1).
    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start.max(1)),
        }
    }
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
