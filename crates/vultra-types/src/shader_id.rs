//! Stable logical shader identifiers.
//!
//! The runtime addresses shaders by a short id derived from the virtual
//! path rather than by an internal source hash:
//! `shaders/pbr.frag.vshader` -> `pbr.frag`.

use std::path::Path;

use crate::hash::hash64_str;

/// Derive the logical shader id: the file name without its final extension.
pub fn shader_id_from_virtual_path(virtual_path: &str) -> String {
    Path::new(virtual_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hash a logical shader id.
pub fn shader_id_hash(shader_id: &str) -> u64 {
    hash64_str(shader_id)
}

/// Derive and hash in one step.
pub fn shader_id_hash_from_virtual_path(virtual_path: &str) -> u64 {
    shader_id_hash(&shader_id_from_virtual_path(virtual_path))
}
