//! The library build orchestrator: enumerate variants, prune, build, dedup,
//! and accumulate `.vshlib` entries.

use std::collections::BTreeSet;

use tracing::{debug, info};
use vultra_meta::{eval_only_if, parse_vultra_metadata, ParsedMetadata};
use vultra_types::{hash64_with_seed, Error, KeywordValueKind, Result, ShaderStage};
use vultra_vshbin::encode_vshbin;
use vultra_vshlib::ShaderLibraryEntry;

use crate::cache::CacheConfig;
use crate::compiler::{CompileOptions, Define, SourceInput};
use crate::driver::{build_shader, BuildRequest, Toolchain};
use crate::variant::resolve_keyword_context;

/// One shader to be built into a library, already located by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryShaderInput {
    /// Root-relative path with forward slashes; the logical shader id and
    /// include resolution derive from it.
    pub virtual_path: String,
    pub source_text: String,
    pub stage: ShaderStage,
}

/// Library-wide build policy.
#[derive(Debug, Clone, Default)]
pub struct LibraryBuildOptions {
    pub include_dirs: Vec<String>,
    pub engine_keywords: Option<vultra_meta::EngineKeywords>,
    pub cache: CacheConfig,
    /// Skip variants whose `only_if` constraints fail instead of erroring.
    pub skip_invalid: bool,
}

/// Counters for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LibraryBuildStats {
    pub variants_built: usize,
    pub variants_pruned: usize,
    pub duplicates_dropped: usize,
    pub cache_hits: usize,
}

/// The accumulated entries, sorted and ready to write.
#[derive(Debug, Clone, Default)]
pub struct LibraryBuildOutput {
    pub entries: Vec<ShaderLibraryEntry>,
    pub stats: LibraryBuildStats,
}

/// Enumerate the Cartesian product of permutation keyword values, in
/// declaration order: bool keywords contribute `"0"`, `"1"`; enum keywords
/// contribute each enumerant name in declared order. No permutation keywords
/// yields a single empty define list.
pub fn enumerate_variant_defines(meta: &ParsedMetadata) -> Vec<Vec<Define>> {
    let permute: Vec<_> = meta.permutation_keywords().collect();

    let mut out = Vec::new();
    let mut current: Vec<Define> = Vec::with_capacity(permute.len());

    fn recurse(
        decls: &[&vultra_types::KeywordDecl],
        index: usize,
        current: &mut Vec<Define>,
        out: &mut Vec<Vec<Define>>,
    ) {
        let Some(decl) = decls.get(index) else {
            out.push(current.clone());
            return;
        };

        match decl.value_kind {
            KeywordValueKind::Bool => {
                for value in ["0", "1"] {
                    current.push(Define::new(&decl.name, value));
                    recurse(decls, index + 1, current, out);
                    current.pop();
                }
            }
            KeywordValueKind::Enum => {
                for enumerant in &decl.enum_values {
                    current.push(Define::new(&decl.name, enumerant));
                    recurse(decls, index + 1, current, out);
                    current.pop();
                }
            }
        }
    }

    recurse(&permute, 0, &mut current, &mut out);

    if out.is_empty() {
        out.push(Vec::new());
    }
    out
}

/// Evaluate every declared `only_if` constraint for one candidate variant.
///
/// Returns the name of the first failing constraint's keyword, or `None`
/// when the variant is admissible.
fn first_violated_constraint<'m>(
    meta: &'m ParsedMetadata,
    defines: &[Define],
    engine_keywords: Option<&vultra_meta::EngineKeywords>,
) -> Result<Option<&'m str>> {
    let ctx = resolve_keyword_context(meta, defines, engine_keywords)?;
    for decl in &meta.keywords {
        if let Some(constraint) = &decl.constraint {
            if !eval_only_if(constraint, &ctx)? {
                return Ok(Some(decl.name.as_str()));
            }
        }
    }
    Ok(None)
}

/// Build every admissible variant of every input shader.
///
/// Entries accumulate in (shader-enumeration x variant-enumeration) order and
/// are sorted by `(keyHash, stage)` at finalisation. Duplicate
/// `(keyHash, stage)` signatures are dropped silently: distinct variants can
/// legitimately collapse onto one artifact. Everything else fails fast.
pub fn build_library(
    toolchain: &Toolchain<'_>,
    inputs: &[LibraryShaderInput],
    options: &LibraryBuildOptions,
) -> Result<LibraryBuildOutput> {
    let mut entries: Vec<ShaderLibraryEntry> = Vec::new();
    let mut seen_signatures: BTreeSet<u64> = BTreeSet::new();
    let mut stats = LibraryBuildStats::default();

    for (shader_index, input) in inputs.iter().enumerate() {
        let meta = parse_vultra_metadata(&input.source_text).map_err(|err| match err {
            Error::Parse(m) => Error::Parse(format!("{}: {m}", input.virtual_path)),
            other => other,
        })?;

        let variant_sets = enumerate_variant_defines(&meta);
        info!(
            shader = %input.virtual_path,
            index = shader_index + 1,
            total = inputs.len(),
            variants = variant_sets.len(),
            "building shader"
        );

        for (variant_index, defines) in variant_sets.iter().enumerate() {
            if let Some(keyword) =
                first_violated_constraint(&meta, defines, options.engine_keywords.as_ref())?
            {
                stats.variants_pruned += 1;
                if options.skip_invalid {
                    debug!(
                        shader = %input.virtual_path,
                        variant = variant_index + 1,
                        keyword,
                        "pruned variant"
                    );
                    continue;
                }
                return Err(Error::parse(format!(
                    "variant violates only_if constraint in {} (keyword '{keyword}')",
                    input.virtual_path
                )));
            }

            let request = BuildRequest {
                source: SourceInput {
                    virtual_path: input.virtual_path.clone(),
                    source_text: input.source_text.clone(),
                },
                options: CompileOptions {
                    stage: input.stage,
                    defines: defines.clone(),
                    include_dirs: options.include_dirs.clone(),
                    ..CompileOptions::default()
                },
                engine_keywords: options.engine_keywords.clone(),
                cache: options.cache.clone(),
            };

            let outcome = build_shader(toolchain, &request)?;
            stats.variants_built += 1;
            if outcome.from_cache {
                stats.cache_hits += 1;
            }

            let binary = outcome.binary;
            let key_hash = if binary.variant_hash != 0 {
                binary.variant_hash
            } else {
                binary.content_hash
            };

            let stage_byte = binary
                .stage
                .wire_index()
                .ok_or_else(|| Error::invalid_argument("built binary has unknown stage"))?;
            let signature = hash64_with_seed(&key_hash.to_le_bytes(), u64::from(stage_byte));

            if !seen_signatures.insert(signature) {
                stats.duplicates_dropped += 1;
                debug!(
                    shader = %input.virtual_path,
                    variant = variant_index + 1,
                    key_hash,
                    "dropping duplicate entry"
                );
                continue;
            }

            let blob = encode_vshbin(&binary)?;
            entries.push(ShaderLibraryEntry {
                key_hash,
                stage: binary.stage,
                blob,
            });
        }
    }

    entries.sort_by_key(|e| (e.key_hash, e.stage as u8));

    info!(
        entries = entries.len(),
        pruned = stats.variants_pruned,
        duplicates = stats.duplicates_dropped,
        cache_hits = stats.cache_hits,
        "library build finished"
    );

    Ok(LibraryBuildOutput { entries, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vultra_meta::parse_vultra_metadata;

    #[test]
    fn enumeration_order_is_declaration_major() {
        let meta = parse_vultra_metadata(
            "\
#pragma vultra keyword permute USE_SHADOW=0
#pragma vultra keyword permute PASS=A|B
",
        )
        .unwrap();

        let sets = enumerate_variant_defines(&meta);
        let rendered: Vec<Vec<(String, String)>> = sets
            .iter()
            .map(|defines| {
                defines
                    .iter()
                    .map(|d| (d.name.clone(), d.value.clone()))
                    .collect()
            })
            .collect();

        let pair = |a: (&str, &str), b: (&str, &str)| {
            vec![
                (a.0.to_owned(), a.1.to_owned()),
                (b.0.to_owned(), b.1.to_owned()),
            ]
        };
        assert_eq!(
            rendered,
            vec![
                pair(("USE_SHADOW", "0"), ("PASS", "A")),
                pair(("USE_SHADOW", "0"), ("PASS", "B")),
                pair(("USE_SHADOW", "1"), ("PASS", "A")),
                pair(("USE_SHADOW", "1"), ("PASS", "B")),
            ]
        );
    }

    #[test]
    fn no_permutation_keywords_yield_one_empty_variant() {
        let meta = parse_vultra_metadata("#pragma vultra keyword runtime FOG=0\n").unwrap();
        assert_eq!(enumerate_variant_defines(&meta), vec![Vec::<Define>::new()]);

        let empty = parse_vultra_metadata("").unwrap();
        assert_eq!(enumerate_variant_defines(&empty), vec![Vec::<Define>::new()]);
    }

    #[test]
    fn enumeration_is_deterministic() {
        let meta = parse_vultra_metadata(
            "\
#pragma vultra keyword permute SURFACE=OPAQUE|CUTOUT|TRANSPARENT
#pragma vultra keyword permute USE_SHADOW=1
",
        )
        .unwrap();
        assert_eq!(enumerate_variant_defines(&meta), enumerate_variant_defines(&meta));
        assert_eq!(enumerate_variant_defines(&meta).len(), 6);
    }
}
