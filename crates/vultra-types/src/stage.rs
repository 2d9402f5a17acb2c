use bitflags::bitflags;
use core::fmt;

/// A single shader stage.
///
/// The wire encoding is the index 0..=9 in declaration order; `Unknown` has
/// no wire encoding and is rejected by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ShaderStage {
    Vertex = 0,
    Fragment = 1,
    Compute = 2,
    Task = 3,
    Mesh = 4,
    RayGen = 5,
    RayMiss = 6,
    RayClosestHit = 7,
    RayAnyHit = 8,
    RayIntersection = 9,
    Unknown = 255,
}

impl ShaderStage {
    /// All encodable stages, in wire-index order.
    pub const ALL: [ShaderStage; 10] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Compute,
        ShaderStage::Task,
        ShaderStage::Mesh,
        ShaderStage::RayGen,
        ShaderStage::RayMiss,
        ShaderStage::RayClosestHit,
        ShaderStage::RayAnyHit,
        ShaderStage::RayIntersection,
    ];

    /// The single-byte wire index, or `None` for [`ShaderStage::Unknown`].
    pub fn wire_index(self) -> Option<u8> {
        match self {
            ShaderStage::Unknown => None,
            other => Some(other as u8),
        }
    }

    /// Decode a wire index. Out-of-range bytes are invalid, not `Unknown`.
    pub fn from_wire_index(index: u8) -> Option<ShaderStage> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The short stage name used by `-S` and by `*.{name}.vshader` suffixes.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
            ShaderStage::Task => "task",
            ShaderStage::Mesh => "mesh",
            ShaderStage::RayGen => "rgen",
            ShaderStage::RayMiss => "rmiss",
            ShaderStage::RayClosestHit => "rchit",
            ShaderStage::RayAnyHit => "rahit",
            ShaderStage::RayIntersection => "rint",
            ShaderStage::Unknown => "unknown",
        }
    }

    /// Parse a short stage name (`"frag"`, `"rgen"`, ...).
    pub fn from_name(name: &str) -> Option<ShaderStage> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// The stage-flags bit for this stage (empty for `Unknown`).
    pub fn flag(self) -> ShaderStageFlags {
        match self.wire_index() {
            Some(index) => ShaderStageFlags::from_bits_truncate(1 << index),
            None => ShaderStageFlags::empty(),
        }
    }

    /// True for the stages that carry a compute-style local size.
    pub fn has_local_size(self) -> bool {
        matches!(
            self,
            ShaderStage::Compute | ShaderStage::Task | ShaderStage::Mesh
        )
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Bit set of shader stages, one bit per wire index.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const TASK = 1 << 3;
        const MESH = 1 << 4;
        const RAY_GEN = 1 << 5;
        const RAY_MISS = 1 << 6;
        const RAY_CLOSEST_HIT = 1 << 7;
        const RAY_ANY_HIT = 1 << 8;
        const RAY_INTERSECTION = 1 << 9;
    }
}
