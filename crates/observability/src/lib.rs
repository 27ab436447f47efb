//! Process-wide tracing/logging setup shared by the catalog binaries.

/// Tracing subscriber installation (filters, formatting).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};

/// Initialize process-wide logging (JSON, `RUST_LOG` filter, default `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
