//! The chunked `.vshbin` shader artifact format.
//!
//! Fixed 32-byte header, little-endian throughout:
//!
//! ```text
//! magic[8]        "VSHBIN\0\0"
//! version  u32    current: 2
//! flags    u32    low 8 bits: shader stage; other bits reserved
//! contentHash u64 hash of the source text
//! spirvHash   u64 hash of the SPIR-V words, or 0 ("unverified")
//! ```
//!
//! Chunks follow, each `{tag u32, size u32, payload}`:
//!
//! - `SIDH` (optional): u64 shader-id hash, omitted when 0
//! - `VKEY` (optional): u64 variant hash, omitted when 0
//! - `SPRV` (required): raw SPIR-V bytes, size a multiple of 4
//! - `REFL` (required): serialised reflection
//! - `MDES` (required): serialised material description
//!
//! Unknown tags are skipped on read so future writers can add chunks
//! (dependency lists, other backends) without breaking old readers. Input is
//! treated as untrusted: every offset and size is validated, and a non-zero
//! `spirvHash` must verify against the decoded SPIR-V.

#![forbid(unsafe_code)]

mod codec;
mod rw;
mod tag;

pub use crate::codec::{
    decode_vshbin, encode_vshbin, read_vshbin_file, write_vshbin_file, VSHBIN_MAGIC,
    VSHBIN_VERSION,
};
pub use crate::tag::ChunkTag;
