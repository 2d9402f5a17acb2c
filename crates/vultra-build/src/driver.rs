//! The build driver: parse, cache-check, compile, reflect, synthesise, hash.

use tracing::debug;
use vultra_meta::{parse_vultra_metadata, EngineKeywords};
use vultra_types::{
    hash64_str, hash64_words, shader_id_hash_from_virtual_path, Result, ShaderBinary, ShaderStage,
};

use crate::cache::{self, CacheConfig};
use crate::compiler::{CompileOptions, ShaderCompiler, SourceInput};
use crate::material::synthesize_material_description;
use crate::reflect::{normalize_reflection, ReflectionOptions, SpirvReflector};
use crate::variant::compute_variant_hash;

/// The external collaborators a build needs.
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    pub compiler: &'a dyn ShaderCompiler,
    pub reflector: &'a dyn SpirvReflector,
}

/// One build request: a source, its compile options, and policy.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub source: SourceInput,
    pub options: CompileOptions,
    /// Engine-wide keyword declarations and assignments, used when resolving
    /// permutation keyword values for the variant hash.
    pub engine_keywords: Option<EngineKeywords>,
    pub cache: CacheConfig,
}

/// A successful build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub binary: ShaderBinary,
    /// Compiler info log (warnings), or a cache-hit note.
    pub log: String,
    pub from_cache: bool,
}

/// Build one shader variant.
///
/// Runs the whole pipeline in order: metadata parse, cache probe, compile,
/// reflect, material synthesis, variant hash, best-effort cache write. All
/// errors propagate unchanged.
pub fn build_shader(toolchain: &Toolchain<'_>, req: &BuildRequest) -> Result<BuildOutcome> {
    // Metadata parses first so it can contribute to the cache key even when
    // compilation would fail later.
    let meta = parse_vultra_metadata(&req.source.source_text)?;

    let build_hash = cache::build_input_hash(&req.source, &req.options, &meta);

    if req.cache.enabled {
        if let Some((binary, path)) = cache::try_read(&req.cache.dir, build_hash) {
            return Ok(BuildOutcome {
                binary,
                log: format!("cache hit: {}", path.display()),
                from_cache: true,
            });
        }
    }

    let compiled = toolchain.compiler.compile(&req.source, &req.options)?;
    debug!(
        path = %req.source.virtual_path,
        words = compiled.spirv.len(),
        deps = compiled.dependencies.len(),
        "compiled"
    );

    let raw = toolchain
        .reflector
        .reflect(&compiled.spirv, &ReflectionOptions::default())?;
    let reflection = normalize_reflection(&raw);

    let shader_id_hash = shader_id_hash_from_virtual_path(&req.source.virtual_path);

    let mut binary = ShaderBinary {
        content_hash: hash64_str(&req.source.source_text),
        spirv_hash: hash64_words(&compiled.spirv),
        shader_id_hash,
        variant_hash: 0,
        stage: req.options.stage,
        reflection,
        spirv: compiled.spirv,
        ..ShaderBinary::default()
    };

    binary.variant_hash = compute_variant_hash(
        &meta,
        req.options.stage,
        &req.options.defines,
        req.engine_keywords.as_ref(),
        shader_id_hash,
    )?;

    binary.material_desc = synthesize_material_description(&meta, &binary.reflection)?;

    if req.cache.enabled {
        cache::try_write(&req.cache.dir, build_hash, &binary);
    }

    Ok(BuildOutcome {
        binary,
        log: compiled.info_log,
        from_cache: false,
    })
}

/// Build a `ShaderBinary` from pre-compiled SPIR-V: reflect and synthesise a
/// (metadata-free) material description.
pub fn build_from_spirv(
    reflector: &dyn SpirvReflector,
    spirv: &[u32],
    stage: ShaderStage,
) -> Result<ShaderBinary> {
    let raw = reflector.reflect(spirv, &ReflectionOptions::default())?;
    let reflection = normalize_reflection(&raw);

    let meta = vultra_meta::ParsedMetadata::default();
    let material_desc = synthesize_material_description(&meta, &reflection)?;

    let spirv_hash = hash64_words(spirv);
    Ok(ShaderBinary {
        content_hash: spirv_hash,
        spirv_hash,
        stage,
        reflection,
        material_desc,
        spirv: spirv.to_vec(),
        ..ShaderBinary::default()
    })
}
