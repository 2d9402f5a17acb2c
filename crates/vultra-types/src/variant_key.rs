//! Runtime variant-key builder.
//!
//! Rebuilds, bit for bit, the variant hash the build pipeline stamped into a
//! `.vshbin` (`VKEY` chunk), so a runtime can look a variant up in a
//! `.vshlib` from `(shader id, stage, keyword values)` alone.
//!
//! Canonical serialisation, little-endian throughout:
//!
//! ```text
//! u64 shaderIdHash
//! u32 stage index
//! u32 entry count
//! per entry, sorted by (nameHash, value): u64 nameHash, u32 value, u32 0
//! ```

use crate::hash::{hash64, hash64_str};
use crate::shader_id::shader_id_hash;
use crate::stage::ShaderStage;

/// One keyword assignment inside a variant key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantKeyEntry {
    pub name_hash: u64,
    pub value: u32,
}

/// Accumulates keyword assignments and produces the 64-bit variant hash.
#[derive(Debug, Clone, Default)]
pub struct VariantKey {
    shader_id_hash: u64,
    stage: Option<ShaderStage>,
    entries: Vec<VariantKeyEntry>,
}

impl VariantKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the logical shader id (hashed with the toolchain hash).
    pub fn set_shader_id(&mut self, shader_id: &str) -> &mut Self {
        self.shader_id_hash = shader_id_hash(shader_id);
        self
    }

    /// Record a pre-hashed shader id.
    pub fn set_shader_id_hash(&mut self, shader_id_hash: u64) -> &mut Self {
        self.shader_id_hash = shader_id_hash;
        self
    }

    pub fn set_stage(&mut self, stage: ShaderStage) -> &mut Self {
        self.stage = Some(stage);
        self
    }

    /// Add a keyword assignment by name.
    pub fn set(&mut self, keyword_name: &str, value: u32) -> &mut Self {
        self.entries.push(VariantKeyEntry {
            name_hash: hash64_str(keyword_name),
            value,
        });
        self
    }

    /// Add a keyword assignment by pre-hashed name.
    pub fn set_hashed(&mut self, name_hash: u64, value: u32) -> &mut Self {
        self.entries.push(VariantKeyEntry { name_hash, value });
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Compute the 64-bit variant hash over the canonical serialisation.
    pub fn build(&self) -> u64 {
        let mut entries = self.entries.clone();
        entries.sort_unstable_by_key(|e| (e.name_hash, e.value));

        let stage_index = self
            .stage
            .and_then(ShaderStage::wire_index)
            .map(u32::from)
            .unwrap_or(u32::from(ShaderStage::Unknown as u8));

        let mut buf = Vec::with_capacity(16 + entries.len() * 16);
        buf.extend_from_slice(&self.shader_id_hash.to_le_bytes());
        buf.extend_from_slice(&stage_index.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for entry in &entries {
            buf.extend_from_slice(&entry.name_hash.to_le_bytes());
            buf.extend_from_slice(&entry.value.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
        }

        hash64(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with(entries: &[(&str, u32)]) -> u64 {
        let mut key = VariantKey::new();
        key.set_shader_id("pbr.frag").set_stage(ShaderStage::Fragment);
        for &(name, value) in entries {
            key.set(name, value);
        }
        key.build()
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = key_with(&[("USE_SHADOW", 1), ("PASS", 0)]);
        let b = key_with(&[("PASS", 0), ("USE_SHADOW", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn values_matter() {
        assert_ne!(
            key_with(&[("USE_SHADOW", 0)]),
            key_with(&[("USE_SHADOW", 1)])
        );
    }

    #[test]
    fn stage_and_shader_id_matter() {
        let mut a = VariantKey::new();
        a.set_shader_id("pbr.frag").set_stage(ShaderStage::Fragment);
        let mut b = VariantKey::new();
        b.set_shader_id("pbr.frag").set_stage(ShaderStage::Vertex);
        assert_ne!(a.build(), b.build());

        let mut c = VariantKey::new();
        c.set_shader_id("pbr.vert").set_stage(ShaderStage::Fragment);
        assert_ne!(a.build(), c.build());
    }

    #[test]
    fn hashed_and_named_entries_agree() {
        let mut a = VariantKey::new();
        a.set_shader_id("x").set_stage(ShaderStage::Compute);
        a.set("FOO", 2);

        let mut b = VariantKey::new();
        b.set_shader_id("x").set_stage(ShaderStage::Compute);
        b.set_hashed(crate::hash::hash64_str("FOO"), 2);

        assert_eq!(a.build(), b.build());
    }
}
