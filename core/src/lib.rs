//! # Lilium Core
//!
//! Basic utilities shared by the Lilium frame graph crates:
//!
//! - [`pool`] - slot allocator with stable integer ids and LIFO slot reuse
//! - [`profiling`] - optional Tracy instrumentation macros

pub mod pool;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Lilium Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
