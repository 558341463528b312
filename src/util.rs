//! Shared utility modules used across Quire components.

pub mod varint;
