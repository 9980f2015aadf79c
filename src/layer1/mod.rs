// Layer 1 - Reading Sources
// Produces one reading per monitored entity per tick

pub mod source;

// Re-export commonly used items for convenience
pub use source::{ReadingSource, ReplaySource, SourceError, SyntheticSource};
