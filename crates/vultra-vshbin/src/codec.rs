use std::path::Path;

use vultra_types::{
    hash64_words, write_file_atomic, BlendFactor, BlendOp, BlockLayout, BlockMember, ColorMask,
    CompareOp, CullMode, DescriptorBinding, DescriptorKind, Error, MaterialDescription,
    MaterialParamDesc, MaterialTextureDesc, ParamDefault, ParamRange, ParamType, RenderState,
    Result, Semantic, ShaderBinary, ShaderReflection, ShaderStage, ShaderStageFlags, TextureType,
    PARAM_DEFAULT_BYTES,
};

use crate::rw::{put_f32, put_f64, put_string, put_u32, put_u64, put_u8, Reader};
use crate::tag::ChunkTag;

/// First eight bytes of every `.vshbin`.
pub const VSHBIN_MAGIC: [u8; 8] = *b"VSHBIN\0\0";

/// Current format version. Bump on any layout change; the build cache folds
/// this into its key so old entries cannot leak across versions.
pub const VSHBIN_VERSION: u32 = 2;

const HEADER_LEN: usize = 32;

// ------------------------------------------------------------------
// REFL chunk
// ------------------------------------------------------------------

fn serialize_reflection(r: &ShaderReflection) -> Vec<u8> {
    let mut out = Vec::new();

    put_u32(&mut out, r.descriptors.len() as u32);
    for d in &r.descriptors {
        put_string(&mut out, &d.name);
        put_u32(&mut out, d.set);
        put_u32(&mut out, d.binding);
        put_u32(&mut out, d.count);
        put_u8(&mut out, d.kind as u8);
        put_u32(&mut out, d.stage_flags.bits());
        put_u8(&mut out, u8::from(d.runtime_sized));
    }

    put_u32(&mut out, r.blocks.len() as u32);
    for b in &r.blocks {
        put_string(&mut out, &b.name);
        put_u32(&mut out, b.set);
        put_u32(&mut out, b.binding);
        put_u32(&mut out, b.size);
        put_u8(&mut out, u8::from(b.is_push_constant));
        put_u32(&mut out, b.stage_flags.bits());

        put_u32(&mut out, b.members.len() as u32);
        for m in &b.members {
            put_string(&mut out, &m.name);
            put_u32(&mut out, m.offset);
            put_u32(&mut out, m.size);
            put_u8(&mut out, m.ty as u8);
        }
    }

    put_u8(&mut out, u8::from(r.has_local_size));
    for axis in r.local_size {
        put_u32(&mut out, axis);
    }

    out
}

fn deserialize_reflection(bytes: &[u8]) -> Result<ShaderReflection> {
    let mut r = Reader::new(bytes);
    let mut out = ShaderReflection::default();

    let descriptor_count = r.u32("REFL descriptor count")?;
    for _ in 0..descriptor_count {
        let name = r.string("REFL descriptor name")?;
        let set = r.u32("REFL descriptor set")?;
        let binding = r.u32("REFL descriptor binding")?;
        let count = r.u32("REFL descriptor count field")?;
        let kind_byte = r.u8("REFL descriptor kind")?;
        let kind = DescriptorKind::from_wire(kind_byte).ok_or_else(|| {
            Error::deserialize(format!("REFL: invalid descriptor kind {kind_byte}"))
        })?;
        let stage_flags = ShaderStageFlags::from_bits_retain(r.u32("REFL descriptor stage flags")?);
        let runtime_sized = r.u8("REFL descriptor runtime-sized flag")? != 0;

        out.descriptors.push(DescriptorBinding {
            name,
            set,
            binding,
            count,
            kind,
            stage_flags,
            runtime_sized,
        });
    }

    let block_count = r.u32("REFL block count")?;
    for _ in 0..block_count {
        let name = r.string("REFL block name")?;
        let set = r.u32("REFL block set")?;
        let binding = r.u32("REFL block binding")?;
        let size = r.u32("REFL block size")?;
        let is_push_constant = r.u8("REFL block push-constant flag")? != 0;
        let stage_flags = ShaderStageFlags::from_bits_retain(r.u32("REFL block stage flags")?);

        let member_count = r.u32("REFL member count")?;
        let mut members = Vec::with_capacity(member_count.min(1024) as usize);
        for _ in 0..member_count {
            let name = r.string("REFL member name")?;
            let offset = r.u32("REFL member offset")?;
            let size = r.u32("REFL member size")?;
            let ty_byte = r.u8("REFL member type")?;
            let ty = ParamType::from_wire(ty_byte).ok_or_else(|| {
                Error::deserialize(format!("REFL: invalid member type {ty_byte}"))
            })?;
            members.push(BlockMember {
                name,
                offset,
                size,
                ty,
            });
        }

        out.blocks.push(BlockLayout {
            name,
            set,
            binding,
            size,
            is_push_constant,
            stage_flags,
            members,
        });
    }

    out.has_local_size = r.u8("REFL local-size flag")? != 0;
    for axis in &mut out.local_size {
        *axis = r.u32("REFL local size")?;
    }

    r.finish("REFL chunk")?;
    Ok(out)
}

// ------------------------------------------------------------------
// MDES chunk
// ------------------------------------------------------------------

fn serialize_render_state(out: &mut Vec<u8>, s: &RenderState) {
    put_u8(out, u8::from(s.depth_test));
    put_u8(out, u8::from(s.depth_write));
    put_u8(out, s.depth_func as u8);
    put_u8(out, s.cull as u8);
    put_u8(out, u8::from(s.blend_enable));
    put_u8(out, s.src_color as u8);
    put_u8(out, s.dst_color as u8);
    put_u8(out, s.color_op as u8);
    put_u8(out, s.src_alpha as u8);
    put_u8(out, s.dst_alpha as u8);
    put_u8(out, s.alpha_op as u8);
    put_u8(out, s.color_mask.bits());
    put_u8(out, u8::from(s.alpha_to_coverage));
    put_f32(out, s.depth_bias_factor);
    put_f32(out, s.depth_bias_units);
}

fn deserialize_render_state(r: &mut Reader<'_>) -> Result<RenderState> {
    let depth_test = r.u8("MDES depthTest")? != 0;
    let depth_write = r.u8("MDES depthWrite")? != 0;
    let depth_func_byte = r.u8("MDES depthFunc")?;
    let cull_byte = r.u8("MDES cull")?;
    let blend_enable = r.u8("MDES blendEnable")? != 0;
    let src_color_byte = r.u8("MDES srcColor")?;
    let dst_color_byte = r.u8("MDES dstColor")?;
    let color_op_byte = r.u8("MDES colorOp")?;
    let src_alpha_byte = r.u8("MDES srcAlpha")?;
    let dst_alpha_byte = r.u8("MDES dstAlpha")?;
    let alpha_op_byte = r.u8("MDES alphaOp")?;
    let color_mask_byte = r.u8("MDES colorMask")?;
    let alpha_to_coverage = r.u8("MDES alphaToCoverage")? != 0;
    let depth_bias_factor = r.f32("MDES depthBiasFactor")?;
    let depth_bias_units = r.f32("MDES depthBiasUnits")?;

    let bad = |field: &str, value: u8| {
        Error::deserialize(format!("MDES: invalid {field} value {value}"))
    };

    Ok(RenderState {
        depth_test,
        depth_write,
        depth_func: CompareOp::from_wire(depth_func_byte)
            .ok_or_else(|| bad("depthFunc", depth_func_byte))?,
        cull: CullMode::from_wire(cull_byte).ok_or_else(|| bad("cull", cull_byte))?,
        blend_enable,
        src_color: BlendFactor::from_wire(src_color_byte)
            .ok_or_else(|| bad("srcColor", src_color_byte))?,
        dst_color: BlendFactor::from_wire(dst_color_byte)
            .ok_or_else(|| bad("dstColor", dst_color_byte))?,
        color_op: BlendOp::from_wire(color_op_byte).ok_or_else(|| bad("colorOp", color_op_byte))?,
        src_alpha: BlendFactor::from_wire(src_alpha_byte)
            .ok_or_else(|| bad("srcAlpha", src_alpha_byte))?,
        dst_alpha: BlendFactor::from_wire(dst_alpha_byte)
            .ok_or_else(|| bad("dstAlpha", dst_alpha_byte))?,
        alpha_op: BlendOp::from_wire(alpha_op_byte).ok_or_else(|| bad("alphaOp", alpha_op_byte))?,
        color_mask: ColorMask::from_bits(color_mask_byte)
            .ok_or_else(|| bad("colorMask", color_mask_byte))?,
        alpha_to_coverage,
        depth_bias_factor,
        depth_bias_units,
    })
}

fn serialize_mdesc(m: &MaterialDescription) -> Vec<u8> {
    let mut out = Vec::new();

    put_string(&mut out, &m.material_block_name);
    put_u32(&mut out, m.material_param_size);
    serialize_render_state(&mut out, &m.render_state);

    put_u32(&mut out, m.params.len() as u32);
    for p in &m.params {
        put_string(&mut out, &p.name);
        put_u8(&mut out, p.ty as u8);
        put_u32(&mut out, p.offset);
        put_u32(&mut out, p.size);
        put_u32(&mut out, p.semantic as u32);

        put_u8(&mut out, u8::from(p.default.is_some()));
        if let Some(default) = &p.default {
            put_u8(&mut out, default.ty as u8);
            out.extend_from_slice(&default.value);
        }

        put_u8(&mut out, u8::from(p.range.is_some()));
        if let Some(range) = &p.range {
            put_f64(&mut out, range.min);
            put_f64(&mut out, range.max);
        }
    }

    put_u32(&mut out, m.textures.len() as u32);
    for t in &m.textures {
        put_string(&mut out, &t.name);
        put_u8(&mut out, t.ty as u8);
        put_u32(&mut out, t.set);
        put_u32(&mut out, t.binding);
        put_u32(&mut out, t.count);
        put_u32(&mut out, t.semantic as u32);
    }

    out
}

fn deserialize_mdesc(bytes: &[u8]) -> Result<MaterialDescription> {
    let mut r = Reader::new(bytes);

    let material_block_name = r.string("MDES material block name")?;
    let material_param_size = r.u32("MDES material param size")?;
    let render_state = deserialize_render_state(&mut r)?;

    let param_count = r.u32("MDES param count")?;
    let mut params = Vec::with_capacity(param_count.min(1024) as usize);
    for _ in 0..param_count {
        let name = r.string("MDES param name")?;
        let ty_byte = r.u8("MDES param type")?;
        let ty = ParamType::from_wire(ty_byte)
            .ok_or_else(|| Error::deserialize(format!("MDES: invalid param type {ty_byte}")))?;
        let offset = r.u32("MDES param offset")?;
        let size = r.u32("MDES param size")?;
        let semantic_value = r.u32("MDES param semantic")?;
        let semantic = Semantic::from_wire(semantic_value).ok_or_else(|| {
            Error::deserialize(format!("MDES: invalid param semantic {semantic_value}"))
        })?;

        let default = if r.u8("MDES hasDefault")? != 0 {
            let default_ty_byte = r.u8("MDES default type")?;
            let default_ty = ParamType::from_wire(default_ty_byte).ok_or_else(|| {
                Error::deserialize(format!("MDES: invalid default type {default_ty_byte}"))
            })?;
            let buffer = r.take(PARAM_DEFAULT_BYTES, "MDES default value")?;
            let mut value = [0u8; PARAM_DEFAULT_BYTES];
            value.copy_from_slice(buffer);
            Some(ParamDefault {
                ty: default_ty,
                value,
            })
        } else {
            None
        };

        let range = if r.u8("MDES hasRange")? != 0 {
            Some(ParamRange {
                min: r.f64("MDES range min")?,
                max: r.f64("MDES range max")?,
            })
        } else {
            None
        };

        params.push(MaterialParamDesc {
            name,
            ty,
            offset,
            size,
            semantic,
            default,
            range,
        });
    }

    let texture_count = r.u32("MDES texture count")?;
    let mut textures = Vec::with_capacity(texture_count.min(1024) as usize);
    for _ in 0..texture_count {
        let name = r.string("MDES texture name")?;
        let ty_byte = r.u8("MDES texture type")?;
        let ty = TextureType::from_wire(ty_byte)
            .ok_or_else(|| Error::deserialize(format!("MDES: invalid texture type {ty_byte}")))?;
        let set = r.u32("MDES texture set")?;
        let binding = r.u32("MDES texture binding")?;
        let count = r.u32("MDES texture count field")?;
        let semantic_value = r.u32("MDES texture semantic")?;
        let semantic = Semantic::from_wire(semantic_value).ok_or_else(|| {
            Error::deserialize(format!("MDES: invalid texture semantic {semantic_value}"))
        })?;

        textures.push(MaterialTextureDesc {
            name,
            ty,
            set,
            binding,
            count,
            semantic,
        });
    }

    r.finish("MDES chunk")?;

    Ok(MaterialDescription {
        material_block_name,
        material_param_size,
        params,
        textures,
        render_state,
    })
}

// ------------------------------------------------------------------
// Container
// ------------------------------------------------------------------

/// Serialise a shader binary to `.vshbin` bytes.
pub fn encode_vshbin(bin: &ShaderBinary) -> Result<Vec<u8>> {
    if bin.spirv.is_empty() {
        return Err(Error::serialize("cannot write .vshbin with empty SPIR-V"));
    }
    let stage_index = bin.stage.wire_index().ok_or_else(|| {
        Error::serialize("cannot write .vshbin with unknown shader stage")
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + 64 + bin.spirv.len() * 4);

    out.extend_from_slice(&VSHBIN_MAGIC);
    put_u32(&mut out, VSHBIN_VERSION);
    put_u32(&mut out, u32::from(stage_index));
    put_u64(&mut out, bin.content_hash);
    put_u64(&mut out, bin.spirv_hash);
    debug_assert_eq!(out.len(), HEADER_LEN);

    let mut write_chunk = |out: &mut Vec<u8>, tag: ChunkTag, payload: &[u8]| {
        put_u32(out, tag.to_wire());
        put_u32(out, payload.len() as u32);
        out.extend_from_slice(payload);
    };

    if bin.shader_id_hash != 0 {
        write_chunk(&mut out, ChunkTag::SIDH, &bin.shader_id_hash.to_le_bytes());
    }
    if bin.variant_hash != 0 {
        write_chunk(&mut out, ChunkTag::VKEY, &bin.variant_hash.to_le_bytes());
    }

    let mut spirv_bytes = Vec::with_capacity(bin.spirv.len() * 4);
    for word in &bin.spirv {
        spirv_bytes.extend_from_slice(&word.to_le_bytes());
    }
    write_chunk(&mut out, ChunkTag::SPRV, &spirv_bytes);

    write_chunk(&mut out, ChunkTag::REFL, &serialize_reflection(&bin.reflection));
    write_chunk(&mut out, ChunkTag::MDES, &serialize_mdesc(&bin.material_desc));

    Ok(out)
}

/// Decode `.vshbin` bytes.
pub fn decode_vshbin(bytes: &[u8]) -> Result<ShaderBinary> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::deserialize("file too small to be a valid .vshbin"));
    }

    let mut r = Reader::new(bytes);
    let magic = r.take(8, "magic")?;
    if magic != VSHBIN_MAGIC {
        return Err(Error::deserialize("invalid magic (not a .vshbin)"));
    }

    let version = r.u32("version")?;
    if version < 1 || version > VSHBIN_VERSION {
        return Err(Error::deserialize(format!(
            "unsupported .vshbin version {version}"
        )));
    }

    let flags = r.u32("flags")?;
    let stage_byte = (flags & 0xFF) as u8;
    let stage = ShaderStage::from_wire_index(stage_byte)
        .ok_or_else(|| Error::deserialize(format!("invalid shader stage {stage_byte}")))?;

    let content_hash = r.u64("contentHash")?;
    let spirv_hash = r.u64("spirvHash")?;

    let mut out = ShaderBinary {
        content_hash,
        spirv_hash,
        stage,
        ..ShaderBinary::default()
    };

    let mut has_sprv = false;
    let mut has_refl = false;
    let mut has_mdes = false;

    while !r.is_empty() {
        let tag = ChunkTag::from_wire(r.u32("chunk tag")?);
        let size = r.u32("chunk size")? as usize;
        let payload = r.take(size, "chunk payload")?;

        match tag {
            ChunkTag::SIDH => {
                if size != 8 {
                    return Err(Error::deserialize("SIDH chunk size invalid"));
                }
                let mut chunk = Reader::new(payload);
                out.shader_id_hash = chunk.u64("SIDH value")?;
            }
            ChunkTag::VKEY => {
                if size != 8 {
                    return Err(Error::deserialize("VKEY chunk size invalid"));
                }
                let mut chunk = Reader::new(payload);
                out.variant_hash = chunk.u64("VKEY value")?;
            }
            ChunkTag::SPRV => {
                if size % 4 != 0 {
                    return Err(Error::deserialize("SPRV chunk size not a multiple of 4"));
                }
                out.spirv = payload
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                has_sprv = true;
            }
            ChunkTag::REFL => {
                out.reflection = deserialize_reflection(payload)?;
                has_refl = true;
            }
            ChunkTag::MDES => {
                out.material_desc = deserialize_mdesc(payload)?;
                has_mdes = true;
            }
            // Unknown chunks are skipped for forward compatibility.
            _ => {}
        }
    }

    if !has_sprv {
        return Err(Error::deserialize("missing SPRV chunk"));
    }
    if !has_refl {
        return Err(Error::deserialize("missing REFL chunk"));
    }
    if !has_mdes {
        return Err(Error::deserialize("missing MDES chunk"));
    }

    if out.spirv_hash != 0 {
        let computed = hash64_words(&out.spirv);
        if computed != out.spirv_hash {
            return Err(Error::deserialize("SPIR-V hash mismatch"));
        }
    }

    Ok(out)
}

/// Encode and write atomically.
pub fn write_vshbin_file(path: &Path, bin: &ShaderBinary) -> Result<()> {
    let bytes = encode_vshbin(bin)?;
    write_file_atomic(path, &bytes)
}

/// Read and decode a `.vshbin` file.
pub fn read_vshbin_file(path: &Path) -> Result<ShaderBinary> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::io(format!("failed to read {}: {e}", path.display())))?;
    decode_vshbin(&bytes)
}
