//! Process-wide observability setup shared by the binaries.

/// Structured log output (JSON lines, `RUST_LOG` filtering).
pub mod tracing;

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init();
}
