//! Content-addressed on-disk build cache.
//!
//! The cache key folds in every input that can affect the artifact: source
//! text, virtual path, stage, the sorted define list, include directories in
//! declared order, the canonical metadata fingerprint, and the `.vshbin`
//! format version (so a codec upgrade never reuses stale entries). Cache read
//! failures fall through to a normal build; write failures are logged and
//! ignored.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vultra_meta::ParsedMetadata;
use vultra_types::{hash64, hash64_with_seed, ShaderBinary};
use vultra_vshbin::{read_vshbin_file, write_vshbin_file, VSHBIN_VERSION};

use crate::compiler::{CompileOptions, SourceInput};

/// Where (and whether) to cache build results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".vshader_cache"),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

fn normalized_define_list(options: &CompileOptions) -> String {
    let mut lines: Vec<String> = options
        .defines
        .iter()
        .map(|d| {
            if d.value.is_empty() {
                d.name.clone()
            } else {
                format!("{}={}", d.name, d.value)
            }
        })
        .collect();
    lines.sort_unstable();
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Canonical text form of everything in the metadata that shapes the
/// artifact. Params and textures iterate in name order (the maps are
/// ordered), so the fingerprint is stable across runs.
fn metadata_fingerprint(meta: &ParsedMetadata) -> String {
    let mut out = String::with_capacity(256);
    let s = &meta.render_state;

    let _ = writeln!(out, "material={}", u8::from(meta.has_material_decl));
    let _ = writeln!(out, "depthTest={}", u8::from(s.depth_test));
    let _ = writeln!(out, "depthWrite={}", u8::from(s.depth_write));
    let _ = writeln!(out, "depthFunc={}", s.depth_func as u8);
    let _ = writeln!(out, "cull={}", s.cull as u8);
    let _ = writeln!(out, "blendEnable={}", u8::from(s.blend_enable));
    let _ = writeln!(out, "srcColor={}", s.src_color as u8);
    let _ = writeln!(out, "dstColor={}", s.dst_color as u8);
    let _ = writeln!(out, "colorOp={}", s.color_op as u8);
    let _ = writeln!(out, "srcAlpha={}", s.src_alpha as u8);
    let _ = writeln!(out, "dstAlpha={}", s.dst_alpha as u8);
    let _ = writeln!(out, "alphaOp={}", s.alpha_op as u8);
    let _ = writeln!(out, "colorMask={}", s.color_mask.bits());
    let _ = writeln!(out, "alphaToCoverage={}", u8::from(s.alpha_to_coverage));
    let _ = writeln!(out, "depthBiasFactor={}", s.depth_bias_factor.to_bits());
    let _ = writeln!(out, "depthBiasUnits={}", s.depth_bias_units.to_bits());

    for (name, param) in &meta.params {
        let _ = writeln!(out, "p:{name}:sem={}", param.semantic as u32);
        if let Some(default) = &param.default {
            let _ = write!(out, "p:{name}:def={}:", default.ty as u8);
            for byte in default.value {
                let _ = write!(out, "{byte},");
            }
            out.push('\n');
        }
        if let Some(range) = &param.range {
            let _ = writeln!(
                out,
                "p:{name}:range={},{}",
                range.min.to_bits(),
                range.max.to_bits()
            );
        }
    }

    for (name, texture) in &meta.textures {
        let _ = writeln!(out, "t:{name}:sem={}", texture.semantic as u32);
    }

    out
}

/// Compute the build-input hash (the cache key).
pub fn build_input_hash(
    source: &SourceInput,
    options: &CompileOptions,
    meta: &ParsedMetadata,
) -> u64 {
    let mut h = hash64(source.source_text.as_bytes());
    h = hash64_with_seed(source.virtual_path.as_bytes(), h);

    let stage_byte = options.stage.wire_index().unwrap_or(u8::MAX);
    h = hash64_with_seed(&[stage_byte], h);

    h = hash64_with_seed(normalized_define_list(options).as_bytes(), h);

    for dir in &options.include_dirs {
        h = hash64_with_seed(dir.as_bytes(), h);
    }

    h = hash64_with_seed(metadata_fingerprint(meta).as_bytes(), h);
    h = hash64_with_seed(&VSHBIN_VERSION.to_le_bytes(), h);
    h
}

/// The cache file path for a build-input hash.
pub fn cache_path(dir: &Path, build_hash: u64) -> PathBuf {
    dir.join(format!("{build_hash:016x}.vshbin"))
}

/// Try to load a cached binary. Any failure is a miss.
pub(crate) fn try_read(dir: &Path, build_hash: u64) -> Option<(ShaderBinary, PathBuf)> {
    let path = cache_path(dir, build_hash);
    match read_vshbin_file(&path) {
        Ok(binary) => Some((binary, path)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cache miss");
            None
        }
    }
}

/// Best-effort cache write; failures only warn.
pub(crate) fn try_write(dir: &Path, build_hash: u64, binary: &ShaderBinary) {
    let path = cache_path(dir, build_hash);
    if let Err(err) = write_vshbin_file(&path, binary) {
        warn!(path = %path.display(), error = %err, "failed to write cache entry");
    }
}
