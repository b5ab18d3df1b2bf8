//! File System Access API adapters.

pub mod directory_handle;
