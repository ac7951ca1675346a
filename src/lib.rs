// Layer modules
pub mod data_link; // Native frame codec
pub mod driver; // Vendor driver binding
pub mod physical; // Bus lifecycle, receive engine, enumeration

// Re-exports for convenience
pub use physical::pcan::PcanBus;
pub use physical::{Bus, BusConfig};

// Common types and traits
pub mod error;
pub mod types;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_valid() {
        assert!(!VERSION.is_empty());
    }
}
