//! The deterministic shader build pipeline.
//!
//! Data flow for one variant:
//!
//! ```text
//! source text -> metadata parse -> external compiler -> SPIR-V
//!             -> external reflector -> reflection normalise
//!             -> material synthesis -> variant hash -> .vshbin
//! ```
//!
//! The pipeline is single-threaded and non-suspending by design: the library
//! orchestrator's deduplication and ordering guarantees hold because builds
//! run strictly in (shader-enumeration x variant-enumeration) order.
//!
//! The GLSL front-end and the SPIR-V reflector are external collaborators
//! behind the [`ShaderCompiler`] and [`SpirvReflector`] traits; the default
//! backends (`shaderc`, `spirv-reflect`) are feature-gated so the driver and
//! its tests run without the native toolchain installed.

#![forbid(unsafe_code)]

mod cache;
mod compiler;
mod driver;
mod library;
mod material;
mod reflect;
mod variant;

pub use crate::cache::{build_input_hash, cache_path, CacheConfig};
pub use crate::compiler::{CompileOptions, CompileOutput, Define, ShaderCompiler, SourceInput};
pub use crate::driver::{build_from_spirv, build_shader, BuildOutcome, BuildRequest, Toolchain};
pub use crate::library::{
    build_library, enumerate_variant_defines, LibraryBuildOptions, LibraryBuildOutput,
    LibraryBuildStats, LibraryShaderInput,
};
pub use crate::material::synthesize_material_description;
pub use crate::reflect::{
    normalize_reflection, RawBlock, RawBlockMember, RawDescriptor, RawMemberType, RawReflection,
    RawScalarKind, ReflectionOptions, SpirvReflector,
};
pub use crate::variant::{compute_variant_hash, resolve_keyword_context, resolve_keyword_value};

#[cfg(feature = "shaderc-backend")]
pub use crate::compiler::shaderc_backend::ShadercCompiler;

#[cfg(feature = "spirv-reflect-backend")]
pub use crate::reflect::spirv_reflect_backend::SpirvReflectReflector;
