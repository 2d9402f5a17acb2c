//! The `.vshlib` shader library container.
//!
//! A deterministic file that packages many precompiled shader blobs
//! (typically `.vshbin` images) keyed by a 64-bit variant hash for runtime
//! lookup.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! header          magic "VSHLIB\0\0", u32 version (2), u32 flags (0),
//!                 u32 entryCount, u32 reserved0,
//!                 u64 tocOffset, u64 tocSize,
//!                 u64 keywordsOffset (0 if absent), u64 keywordsSize
//! blob region     entry payloads, contiguous, in TOC order
//! TOC             entryCount records of 32 bytes:
//!                 u64 keyHash, u8 stage, u8[7] reserved, u64 offset, u64 size
//! keywords        optional raw engine-keywords (.vkw) bytes
//! ```
//!
//! Entries are sorted by `(keyHash, stage)` so the on-disk image is a pure
//! function of its contents. TOC offsets are absolute file offsets into the
//! blob region and are validated on read; the file is written atomically.

#![forbid(unsafe_code)]

mod codec;

pub use crate::codec::{
    decode_vshlib, encode_vshlib, read_vshlib_file, write_vshlib_file, ShaderLibrary,
    ShaderLibraryEntry, TocEntry, VSHLIB_HEADER_LEN, VSHLIB_MAGIC, VSHLIB_VERSION,
};
