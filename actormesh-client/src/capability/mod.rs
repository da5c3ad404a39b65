//! Capability discovery and the definition directory.

pub mod directory;
pub mod error;
pub mod scanner;

pub use directory::DefinitionDirectory;
pub use error::CapabilityError;
pub use scanner::{CapabilityScanner, ScanResult};
