//! Byte sources and player configuration.

pub(crate) mod opts;
pub(crate) mod source;

pub use opts::PlayerOpts;
pub use source::{ByteSource, FileSource, MemorySource, normalize_locator};
