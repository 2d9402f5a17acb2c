use crate::stage::ShaderStageFlags;

/// What a descriptor binding binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DescriptorKind {
    UniformBuffer = 0,
    StorageBuffer = 1,
    SampledImage = 2,
    StorageImage = 3,
    Sampler = 4,
    CombinedImageSampler = 5,
    AccelerationStructure = 6,
    #[default]
    Unknown = 7,
}

impl DescriptorKind {
    pub fn from_wire(byte: u8) -> Option<DescriptorKind> {
        use DescriptorKind::*;
        [
            UniformBuffer,
            StorageBuffer,
            SampledImage,
            StorageImage,
            Sampler,
            CombinedImageSampler,
            AccelerationStructure,
            Unknown,
        ]
        .get(usize::from(byte))
        .copied()
    }
}

/// Scalar/vector/matrix type of a block member or material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ParamType {
    #[default]
    F32 = 0,
    Vec2 = 1,
    Vec3 = 2,
    Vec4 = 3,
    I32 = 4,
    U32 = 5,
    Bool = 6,
    Mat3 = 7,
    Mat4 = 8,
}

impl ParamType {
    pub fn from_wire(byte: u8) -> Option<ParamType> {
        use ParamType::*;
        [F32, Vec2, Vec3, Vec4, I32, U32, Bool, Mat3, Mat4]
            .get(usize::from(byte))
            .copied()
    }
}

/// One reflected descriptor binding.
///
/// `count == 0` together with `runtime_sized` marks a runtime-sized array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub count: u32,
    pub kind: DescriptorKind,
    pub stage_flags: ShaderStageFlags,
    pub runtime_sized: bool,
}

/// One member of a uniform/storage/push-constant block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub ty: ParamType,
}

/// A reflected uniform/storage block; push-constant blocks carry no
/// `(set, binding)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockLayout {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub size: u32,
    pub is_push_constant: bool,
    pub stage_flags: ShaderStageFlags,
    pub members: Vec<BlockMember>,
}

/// Normalised reflection for one shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub descriptors: Vec<DescriptorBinding>,
    pub blocks: Vec<BlockLayout>,

    /// Set for compute/task/mesh execution models.
    pub has_local_size: bool,
    pub local_size: [u32; 3],
}

impl Default for ShaderReflection {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            blocks: Vec::new(),
            has_local_size: false,
            local_size: [1, 1, 1],
        }
    }
}

impl ShaderReflection {
    /// First non-push-constant block with the given name, if any.
    pub fn find_block(&self, name: &str) -> Option<&BlockLayout> {
        self.blocks
            .iter()
            .find(|b| !b.is_push_constant && b.name == name)
    }
}
