// Metadata module
// Stream property probing used by the catalog

pub mod probe;

pub use probe::{probe, AudioProperties};
