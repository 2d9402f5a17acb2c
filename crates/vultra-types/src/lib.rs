//! Core data model for the vultra shader toolchain.
//!
//! This crate holds the value types shared by every stage of the pipeline:
//! shader stages, render state, reflection records, material descriptions,
//! keyword declarations, the 64-bit hashing primitive, and the runtime
//! variant-key builder. Everything here is self-contained by value; the only
//! cross-references in the whole system are byte offsets inside the `.vshlib`
//! blob region.

#![forbid(unsafe_code)]

mod error;
mod hash;
mod io;
mod keywords;
mod material;
mod reflection;
mod shader;
mod shader_id;
mod stage;
mod state;
mod variant_key;

pub use crate::error::{Error, Result};
pub use crate::hash::{hash64, hash64_str, hash64_with_seed, hash64_words};
pub use crate::io::write_file_atomic;
pub use crate::keywords::{KeywordDecl, KeywordDispatch, KeywordScope, KeywordValueKind};
pub use crate::material::{
    MaterialDescription, MaterialParamDesc, MaterialTextureDesc, ParamDefault, ParamRange,
    Semantic, TextureType, PARAM_DEFAULT_BYTES,
};
pub use crate::reflection::{
    BlockLayout, BlockMember, DescriptorBinding, DescriptorKind, ParamType, ShaderReflection,
};
pub use crate::shader::ShaderBinary;
pub use crate::shader_id::{shader_id_from_virtual_path, shader_id_hash, shader_id_hash_from_virtual_path};
pub use crate::stage::{ShaderStage, ShaderStageFlags};
pub use crate::state::{BlendFactor, BlendOp, ColorMask, CompareOp, CullMode, RenderState};
pub use crate::variant_key::{VariantKey, VariantKeyEntry};
