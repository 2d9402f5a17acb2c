//! Variant-hash computation and keyword value resolution.

use std::collections::BTreeMap;

use vultra_meta::{parse_keyword_value, EngineKeywords, KeywordValueContext, ParsedMetadata};
use vultra_types::{KeywordDecl, KeywordScope, Result, ShaderStage, VariantKey};

use crate::compiler::Define;

fn define_map(defines: &[Define]) -> BTreeMap<&str, &str> {
    // Later -D entries win, matching preprocessor behaviour.
    defines
        .iter()
        .map(|d| (d.name.as_str(), d.value.as_str()))
        .collect()
}

/// Resolve one keyword's numeric value.
///
/// Precedence, highest first: an exact-name `-D` define, the engine-keywords
/// `set` map (global-scope keywords only), the declared default.
pub fn resolve_keyword_value(
    decl: &KeywordDecl,
    defines: &BTreeMap<&str, &str>,
    engine_keywords: Option<&EngineKeywords>,
) -> Result<u32> {
    if let Some(raw) = defines.get(decl.name.as_str()) {
        return parse_keyword_value(decl, raw);
    }
    if decl.scope == KeywordScope::Global {
        if let Some(raw) = engine_keywords.and_then(|kw| kw.value(&decl.name)) {
            return parse_keyword_value(decl, raw);
        }
    }
    Ok(decl.default_value)
}

/// Resolve every declared keyword into an evaluation context for `only_if`
/// pruning.
pub fn resolve_keyword_context<'m>(
    meta: &'m ParsedMetadata,
    defines: &[Define],
    engine_keywords: Option<&EngineKeywords>,
) -> Result<KeywordValueContext<'m>> {
    let defines = define_map(defines);
    let mut ctx = KeywordValueContext::new();
    for decl in &meta.keywords {
        let value = resolve_keyword_value(decl, &defines, engine_keywords)?;
        ctx.insert(decl, value);
    }
    Ok(ctx)
}

/// Compute the 64-bit variant hash for one build.
///
/// Only permutation-dispatch keywords participate. Returns 0 when the shader
/// declares none, which makes "unkeyed" binaries fall back to their content
/// hash as the library key.
///
/// `shader_id_hash` seeds the key exactly like the runtime's
/// [`VariantKey`] builder does, so a runtime caller reconstructs the same
/// value from the shader id, stage, and keyword assignments alone.
pub fn compute_variant_hash(
    meta: &ParsedMetadata,
    stage: ShaderStage,
    defines: &[Define],
    engine_keywords: Option<&EngineKeywords>,
    shader_id_hash: u64,
) -> Result<u64> {
    let defines = define_map(defines);

    let mut key = VariantKey::new();
    key.set_shader_id_hash(shader_id_hash).set_stage(stage);

    let mut permutation_count = 0usize;
    for decl in meta.permutation_keywords() {
        let value = resolve_keyword_value(decl, &defines, engine_keywords)?;
        key.set(&decl.name, value);
        permutation_count += 1;
    }

    if permutation_count == 0 {
        return Ok(0);
    }
    Ok(key.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vultra_meta::{parse_engine_keywords, parse_vultra_metadata};

    fn meta() -> ParsedMetadata {
        parse_vultra_metadata(
            "\
#pragma vultra keyword permute USE_SHADOW=0
#pragma vultra keyword permute global SHADOW_QUALITY=LOW|HIGH
#pragma vultra keyword runtime DEBUG_VIEW=0
",
        )
        .unwrap()
    }

    #[test]
    fn define_beats_engine_keywords_beats_default() {
        let meta = meta();
        let engine = parse_engine_keywords("set SHADOW_QUALITY=HIGH\nset USE_SHADOW=1\n").unwrap();
        let quality = &meta.keywords[1];

        // Default.
        let defines = define_map(&[]);
        assert_eq!(resolve_keyword_value(quality, &defines, None).unwrap(), 0);

        // Engine keywords apply to the global-scope keyword...
        assert_eq!(
            resolve_keyword_value(quality, &defines, Some(&engine)).unwrap(),
            1
        );
        // ...but not to the shader-local one.
        let shadow = &meta.keywords[0];
        assert_eq!(
            resolve_keyword_value(shadow, &defines, Some(&engine)).unwrap(),
            0
        );

        // A define wins over everything.
        let binding = [Define::new("SHADOW_QUALITY", "LOW")];
        let defines = define_map(&binding);
        assert_eq!(
            resolve_keyword_value(quality, &defines, Some(&engine)).unwrap(),
            0
        );
    }

    #[test]
    fn variant_hash_matches_runtime_key() {
        let meta = meta();
        let shader_id_hash = vultra_types::shader_id_hash("pbr.frag");
        let defines = [Define::new("USE_SHADOW", "1")];

        let hash = compute_variant_hash(
            &meta,
            ShaderStage::Fragment,
            &defines,
            None,
            shader_id_hash,
        )
        .unwrap();

        let mut key = VariantKey::new();
        key.set_shader_id("pbr.frag")
            .set_stage(ShaderStage::Fragment)
            .set("USE_SHADOW", 1)
            .set("SHADOW_QUALITY", 0);
        assert_eq!(hash, key.build());
    }

    #[test]
    fn runtime_keywords_do_not_affect_the_hash() {
        let meta = meta();
        let with_debug = [Define::new("DEBUG_VIEW", "1")];
        let without: [Define; 0] = [];

        let a =
            compute_variant_hash(&meta, ShaderStage::Fragment, &with_debug, None, 1).unwrap();
        let b = compute_variant_hash(&meta, ShaderStage::Fragment, &without, None, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn no_permutation_keywords_means_zero() {
        let meta = parse_vultra_metadata("#pragma vultra keyword runtime FOG=1\n").unwrap();
        assert_eq!(
            compute_variant_hash(&meta, ShaderStage::Fragment, &[], None, 1).unwrap(),
            0
        );
    }

    #[test]
    fn distinct_bool_values_give_distinct_hashes() {
        let meta = meta();
        let zero = [Define::new("USE_SHADOW", "0")];
        let one = [Define::new("USE_SHADOW", "1")];

        let a = compute_variant_hash(&meta, ShaderStage::Fragment, &zero, None, 1).unwrap();
        let b = compute_variant_hash(&meta, ShaderStage::Fragment, &one, None, 1).unwrap();
        let default = compute_variant_hash(&meta, ShaderStage::Fragment, &[], None, 1).unwrap();
        assert_ne!(a, b);
        // Omitting the define resolves to the default (0).
        assert_eq!(a, default);
    }

    #[test]
    fn bad_define_value_is_a_parse_error() {
        let meta = meta();
        let bad = [Define::new("SHADOW_QUALITY", "ULTRA")];
        assert!(compute_variant_hash(&meta, ShaderStage::Fragment, &bad, None, 1).is_err());
    }
}
