// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod id;

pub use id::{InodeId, Version};

/// Attributes carried by an inode update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct InodeAttrs {
    pub size: u64,
    pub mode: u32,
    pub mtime: u64,
}
