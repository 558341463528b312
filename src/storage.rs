//! Persistence: binary codec and index file I/O.

pub mod codec;
pub mod file;
pub mod structured;
