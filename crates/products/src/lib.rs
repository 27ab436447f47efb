//! Products domain module.
//!
//! Products and their owned variants, the payloads callers submit to create
//! them, and the pure rules that turn a payload into persistable entities
//! (validation, id assignment, timestamp stamping). No IO, no HTTP, no storage.

pub mod product;

pub use product::{NewProduct, NewVariant, Product, Variant};
