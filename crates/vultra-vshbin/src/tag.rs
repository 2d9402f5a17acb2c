use core::fmt;

/// A 4-byte ASCII chunk identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const SIDH: ChunkTag = ChunkTag(*b"SIDH");
    pub const VKEY: ChunkTag = ChunkTag(*b"VKEY");
    pub const SPRV: ChunkTag = ChunkTag(*b"SPRV");
    pub const REFL: ChunkTag = ChunkTag(*b"REFL");
    pub const MDES: ChunkTag = ChunkTag(*b"MDES");

    /// The little-endian u32 wire value of this tag.
    pub fn to_wire(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn from_wire(value: u32) -> ChunkTag {
        ChunkTag(value.to_le_bytes())
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for tag in [
            ChunkTag::SIDH,
            ChunkTag::VKEY,
            ChunkTag::SPRV,
            ChunkTag::REFL,
            ChunkTag::MDES,
        ] {
            assert_eq!(ChunkTag::from_wire(tag.to_wire()), tag);
        }
        assert_eq!(ChunkTag::SPRV.to_string(), "SPRV");
    }
}
