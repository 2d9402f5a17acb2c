use crate::material::MaterialDescription;
use crate::reflection::ShaderReflection;
use crate::stage::ShaderStage;

/// One compiled shader variant: SPIR-V plus everything the runtime needs to
/// bind it.
///
/// Invariants: `spirv` is non-empty; `spirv_hash` is either 0 ("unverified")
/// or `hash64_words(&spirv)`, and a non-zero value must verify on decode.
/// `content_hash` is a deterministic function of the build inputs. The record
/// is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderBinary {
    pub content_hash: u64,
    pub spirv_hash: u64,

    /// Hash of the logical shader id (file stem of the virtual path); 0 when
    /// unset.
    pub shader_id_hash: u64,
    /// Variant-key hash over permutation keyword state; 0 when the shader
    /// declares no permutation keywords.
    pub variant_hash: u64,

    pub stage: ShaderStage,
    pub reflection: ShaderReflection,
    pub material_desc: MaterialDescription,
    pub spirv: Vec<u32>,
}

impl Default for ShaderBinary {
    fn default() -> Self {
        Self {
            content_hash: 0,
            spirv_hash: 0,
            shader_id_hash: 0,
            variant_hash: 0,
            stage: ShaderStage::Fragment,
            reflection: ShaderReflection::default(),
            material_desc: MaterialDescription::default(),
            spirv: Vec::new(),
        }
    }
}
