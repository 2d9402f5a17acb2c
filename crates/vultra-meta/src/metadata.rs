//! The `#pragma vultra` directive parser.
//!
//! The scan is line oriented and tolerant of `\r\n`. Ordinary shader code is
//! passed over untouched; only lines whose first tokens are `#pragma vultra`
//! participate. The grammar is intentionally small and strict.

use std::collections::BTreeMap;

use vultra_types::{
    BlendFactor, BlendOp, ColorMask, CompareOp, CullMode, Error, KeywordDecl, KeywordDispatch,
    ParamDefault, ParamRange, RenderState, Result, Semantic,
};

use crate::decl::parse_keyword_decl;

/// Metadata declared for one material parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamMeta {
    pub semantic: Semantic,
    pub default: Option<ParamDefault>,
    pub range: Option<ParamRange>,
}

/// Metadata declared for one material texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureMeta {
    pub semantic: Semantic,
}

/// Everything the metadata mini-language declared for one shader source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedMetadata {
    pub has_material_decl: bool,

    pub params: BTreeMap<String, ParamMeta>,
    pub textures: BTreeMap<String, TextureMeta>,

    /// Keyword declarations in source order; enumeration depends on this
    /// ordering being stable.
    pub keywords: Vec<KeywordDecl>,

    pub render_state: RenderState,
    /// True once any `state` (or `render`) directive was seen.
    pub render_state_explicit: bool,
}

impl ParsedMetadata {
    /// Declared keywords with permutation dispatch, in declaration order.
    pub fn permutation_keywords(&self) -> impl Iterator<Item = &KeywordDecl> {
        self.keywords
            .iter()
            .filter(|k| k.dispatch == KeywordDispatch::Permutation)
    }
}

/// Parse all `#pragma vultra ...` directives out of a shader source.
pub fn parse_vultra_metadata(source_text: &str) -> Result<ParsedMetadata> {
    let mut out = ParsedMetadata::default();

    for (index, raw_line) in source_text.lines().enumerate() {
        let line_no = index + 1;
        let tokens: Vec<&str> = raw_line.split_whitespace().collect();

        if tokens.len() < 2 || tokens[0] != "#pragma" || tokens[1] != "vultra" {
            continue;
        }
        if tokens.len() < 3 {
            return Err(line_error(line_no, "#pragma vultra requires a directive"));
        }

        let directive = tokens[2];
        match directive {
            "material" => out.has_material_decl = true,
            "param" => parse_param(&tokens, &mut out).map_err(|e| at_line(line_no, e))?,
            "texture" => parse_texture(&tokens, &mut out).map_err(|e| at_line(line_no, e))?,
            "state" => parse_state(&tokens, &mut out).map_err(|e| at_line(line_no, e))?,
            "keyword" => {
                let decl = parse_keyword_decl(&tokens[2..]).map_err(|e| at_line(line_no, e))?;
                out.keywords.push(decl);
            }
            // Accepted for forward compatibility with render-queue hints; it
            // only marks the render state as explicitly authored.
            "render" => out.render_state_explicit = true,
            other => {
                return Err(line_error(
                    line_no,
                    format!("unknown #pragma vultra directive: {other}"),
                ));
            }
        }
    }

    Ok(out)
}

fn line_error(line_no: usize, message: impl Into<String>) -> Error {
    Error::parse(format!("line {line_no}: {}", message.into()))
}

fn at_line(line_no: usize, err: Error) -> Error {
    match err {
        Error::Parse(message) => Error::Parse(format!("line {line_no}: {message}")),
        other => other,
    }
}

/// Extract the payload of an attribute token of the form `name(payload)`.
fn attr_payload<'a>(token: &'a str, name: &str) -> Option<&'a str> {
    token
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_float_list(payload: &str) -> Result<Vec<f32>> {
    let mut values = Vec::new();
    for item in payload.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(Error::parse("empty entry in numeric list"));
        }
        let value: f32 = item
            .parse()
            .map_err(|_| Error::parse(format!("invalid number: {item}")))?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(Error::parse("empty numeric list"));
    }
    Ok(values)
}

fn parse_semantic_payload(payload: &str) -> Result<Semantic> {
    Semantic::from_name(payload)
        .ok_or_else(|| Error::parse(format!("unknown semantic: {payload}")))
}

fn parse_param(tokens: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let name = *tokens
        .get(3)
        .ok_or_else(|| Error::parse("param directive requires a parameter name"))?;
    let meta = out.params.entry(name.to_owned()).or_default();

    for token in &tokens[4..] {
        if let Some(payload) = attr_payload(token, "semantic") {
            meta.semantic = parse_semantic_payload(payload)?;
        } else if let Some(payload) = attr_payload(token, "default") {
            let values = parse_float_list(payload)
                .map_err(|_| Error::parse(format!("invalid default(...) list: {token}")))?;
            // The buffer type is stamped later from reflection; only the raw
            // floats are recorded here.
            meta.default = Some(ParamDefault::from_floats(&values));
        } else if let Some(payload) = attr_payload(token, "range") {
            let values = parse_float_list(payload)?;
            if values.len() != 2 {
                return Err(Error::parse("range(min,max) expects exactly two numbers"));
            }
            meta.range = Some(ParamRange {
                min: f64::from(values[0]),
                max: f64::from(values[1]),
            });
        } else {
            return Err(Error::parse(format!("unknown param attribute: {token}")));
        }
    }

    Ok(())
}

fn parse_texture(tokens: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let name = *tokens
        .get(3)
        .ok_or_else(|| Error::parse("texture directive requires a texture name"))?;
    let meta = out.textures.entry(name.to_owned()).or_default();

    for token in &tokens[4..] {
        if let Some(payload) = attr_payload(token, "semantic") {
            meta.semantic = parse_semantic_payload(payload)?;
        } else {
            return Err(Error::parse(format!("unknown texture attribute: {token}")));
        }
    }

    Ok(())
}

fn parse_on_off(token: &str) -> Result<bool> {
    match token {
        "On" => Ok(true),
        "Off" => Ok(false),
        other => Err(Error::parse(format!("expected On|Off, got {other}"))),
    }
}

fn state_arg<'a>(args: &[&'a str], sub: &str, index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| Error::parse(format!("state {sub} requires {what}")))
}

fn parse_state(tokens: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let sub = *tokens
        .get(3)
        .ok_or_else(|| Error::parse("state directive requires a sub-directive"))?;
    let args = &tokens[4..];
    let state = &mut out.render_state;

    match sub {
        "Blend" => {
            let src = BlendFactor::from_name(state_arg(args, sub, 0, "src and dst factors")?)
                .ok_or_else(|| Error::parse(format!("unknown blend factor: {}", args[0])))?;
            let dst = BlendFactor::from_name(state_arg(args, sub, 1, "src and dst factors")?)
                .ok_or_else(|| Error::parse(format!("unknown blend factor: {}", args[1])))?;
            state.blend_enable = true;
            state.src_color = src;
            state.dst_color = dst;
            state.src_alpha = src;
            state.dst_alpha = dst;
        }
        "BlendOp" => {
            let color_op = BlendOp::from_name(state_arg(args, sub, 0, "color and alpha ops")?)
                .ok_or_else(|| Error::parse(format!("unknown blend operation: {}", args[0])))?;
            let alpha_op = BlendOp::from_name(state_arg(args, sub, 1, "color and alpha ops")?)
                .ok_or_else(|| Error::parse(format!("unknown blend operation: {}", args[1])))?;
            state.blend_enable = true;
            state.color_op = color_op;
            state.alpha_op = alpha_op;
        }
        "ZTest" => state.depth_test = parse_on_off(state_arg(args, sub, 0, "On|Off")?)?,
        "ZWrite" => state.depth_write = parse_on_off(state_arg(args, sub, 0, "On|Off")?)?,
        "CompareOp" => {
            state.depth_func =
                CompareOp::from_name(state_arg(args, sub, 0, "a comparison function")?)
                    .ok_or_else(|| Error::parse(format!("unknown compare op: {}", args[0])))?;
        }
        "Cull" => {
            state.cull = CullMode::from_name(state_arg(args, sub, 0, "None|Back|Front")?)
                .ok_or_else(|| Error::parse(format!("unknown cull mode: {}", args[0])))?;
        }
        "AlphaToCoverage" => {
            state.alpha_to_coverage = parse_on_off(state_arg(args, sub, 0, "On|Off")?)?
        }
        "ColorMask" => {
            let letters = state_arg(args, sub, 0, "a combination of R, G, B, A")?;
            let mut mask = ColorMask::empty();
            for c in letters.chars() {
                mask |= match c {
                    'R' => ColorMask::R,
                    'G' => ColorMask::G,
                    'B' => ColorMask::B,
                    'A' => ColorMask::A,
                    other => {
                        return Err(Error::parse(format!("unknown color mask character: {other}")))
                    }
                };
            }
            state.color_mask = mask;
        }
        "DepthBias" => {
            let factor: f32 = state_arg(args, sub, 0, "factor and units")?
                .parse()
                .map_err(|_| Error::parse(format!("invalid DepthBias factor: {}", args[0])))?;
            let units: f32 = state_arg(args, sub, 1, "factor and units")?
                .parse()
                .map_err(|_| Error::parse(format!("invalid DepthBias units: {}", args[1])))?;
            state.depth_bias_factor = factor;
            state.depth_bias_units = units;
        }
        other => return Err(Error::parse(format!("unknown state sub-directive: {other}"))),
    }

    out.render_state_explicit = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn material_excerpt_parses() {
        let src = "\
#pragma vultra material
#pragma vultra param BaseColor semantic(BaseColor) default(1,1,1,1)
#pragma vultra texture albedoTex semantic(BaseColor)
#pragma vultra state Cull None
#pragma vultra state Blend SrcAlpha OneMinusSrcAlpha
";
        let meta = parse_vultra_metadata(src).unwrap();

        assert!(meta.has_material_decl);

        let param = &meta.params["BaseColor"];
        assert_eq!(param.semantic, Semantic::BaseColor);
        let default = param.default.unwrap();
        assert_eq!(default.floats(4), vec![1.0, 1.0, 1.0, 1.0]);

        assert_eq!(meta.textures["albedoTex"].semantic, Semantic::BaseColor);

        assert!(meta.render_state_explicit);
        assert_eq!(meta.render_state.cull, CullMode::None);
        assert!(meta.render_state.blend_enable);
        assert_eq!(meta.render_state.src_color, BlendFactor::SrcAlpha);
        assert_eq!(meta.render_state.dst_color, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(meta.render_state.src_alpha, BlendFactor::SrcAlpha);
        assert_eq!(meta.render_state.dst_alpha, BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn ordinary_shader_code_is_ignored() {
        let src = "\
#version 460
layout(location = 0) out vec4 outColor;
// #pragma-looking comment that is not a directive
void main() { outColor = vec4(1.0); }
";
        let meta = parse_vultra_metadata(src).unwrap();
        assert_eq!(meta, ParsedMetadata::default());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let src = "#pragma vultra material\r\n#pragma vultra state ZWrite Off\r\n";
        let meta = parse_vultra_metadata(src).unwrap();
        assert!(meta.has_material_decl);
        assert!(!meta.render_state.depth_write);
    }

    #[test]
    fn keyword_directives_preserve_declaration_order() {
        let src = "\
#pragma vultra keyword permute USE_SHADOW=0
#pragma vultra keyword permute PASS=A|B
#pragma vultra keyword runtime global FOG=1
";
        let meta = parse_vultra_metadata(src).unwrap();
        let names: Vec<_> = meta.keywords.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["USE_SHADOW", "PASS", "FOG"]);
        let permute: Vec<_> = meta.permutation_keywords().map(|k| k.name.as_str()).collect();
        assert_eq!(permute, ["USE_SHADOW", "PASS"]);
    }

    #[test]
    fn keyword_constraint_is_kept_raw() {
        let src = "#pragma vultra keyword permute RECEIVE_SHADOW=1 only_if(SURFACE==OPAQUE && USE_SHADOW)\n";
        let meta = parse_vultra_metadata(src).unwrap();
        assert_eq!(
            meta.keywords[0].constraint.as_deref(),
            Some("only_if(SURFACE==OPAQUE && USE_SHADOW)")
        );
    }

    #[test]
    fn state_directives_cover_every_sub_keyword() {
        let src = "\
#pragma vultra state ZTest Off
#pragma vultra state ZWrite Off
#pragma vultra state CompareOp Greater
#pragma vultra state Cull Front
#pragma vultra state BlendOp Min Max
#pragma vultra state AlphaToCoverage On
#pragma vultra state ColorMask RG
#pragma vultra state DepthBias 1.25 -2.0
";
        let meta = parse_vultra_metadata(src).unwrap();
        let s = &meta.render_state;
        assert!(!s.depth_test && !s.depth_write);
        assert_eq!(s.depth_func, CompareOp::Greater);
        assert_eq!(s.cull, CullMode::Front);
        assert!(s.blend_enable);
        assert_eq!(s.color_op, BlendOp::Min);
        assert_eq!(s.alpha_op, BlendOp::Max);
        assert!(s.alpha_to_coverage);
        assert_eq!(s.color_mask, ColorMask::R | ColorMask::G);
        assert_eq!(s.depth_bias_factor, 1.25);
        assert_eq!(s.depth_bias_units, -2.0);
    }

    #[test]
    fn color_mask_boundaries() {
        let full = parse_vultra_metadata("#pragma vultra state ColorMask RGBA\n").unwrap();
        assert_eq!(full.render_state.color_mask.bits(), 0b1111);

        let red = parse_vultra_metadata("#pragma vultra state ColorMask R\n").unwrap();
        assert_eq!(red.render_state.color_mask.bits(), 0b0001);
    }

    #[test]
    fn errors_carry_one_based_line_numbers() {
        let src = "#version 460\n#pragma vultra nonsense\n";
        let err = parse_vultra_metadata(src).unwrap_err();
        assert!(matches!(&err, Error::Parse(m) if m.contains("line 2")), "{err}");
    }

    #[test]
    fn strictness_rejections() {
        for src in [
            "#pragma vultra\n",
            "#pragma vultra param\n",
            "#pragma vultra param Foo glow(1)\n",
            "#pragma vultra param Foo semantic(Sparkle)\n",
            "#pragma vultra param Foo default(a,b)\n",
            "#pragma vultra param Foo range(1)\n",
            "#pragma vultra param Foo range(1,2,3)\n",
            "#pragma vultra texture Tex filter(linear)\n",
            "#pragma vultra state Blend SrcAlpha\n",
            "#pragma vultra state Blend Foo Bar\n",
            "#pragma vultra state ZTest Maybe\n",
            "#pragma vultra state ColorMask RX\n",
            "#pragma vultra state DepthBias 1.0 units\n",
            "#pragma vultra state Fancy On\n",
            "#pragma vultra keyword permute SURFACE=A|B stray\n",
        ] {
            assert!(parse_vultra_metadata(src).is_err(), "accepted: {src}");
        }
    }

    #[test]
    fn later_param_directives_update_existing_entries() {
        let src = "\
#pragma vultra param Roughness semantic(Roughness)
#pragma vultra param Roughness range(0,1)
";
        let meta = parse_vultra_metadata(src).unwrap();
        let param = &meta.params["Roughness"];
        assert_eq!(param.semantic, Semantic::Roughness);
        assert_eq!(param.range, Some(ParamRange { min: 0.0, max: 1.0 }));
        assert_eq!(meta.params.len(), 1);
    }
}
