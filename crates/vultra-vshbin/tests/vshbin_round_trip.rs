use pretty_assertions::assert_eq;
use vultra_types::{
    hash64_words, BlendFactor, BlockLayout, BlockMember, ColorMask, CullMode, DescriptorBinding,
    DescriptorKind, Error, MaterialDescription, MaterialParamDesc, MaterialTextureDesc,
    ParamDefault, ParamRange, ParamType, Semantic, ShaderBinary, ShaderReflection, ShaderStage,
    ShaderStageFlags, TextureType,
};
use vultra_vshbin::{decode_vshbin, encode_vshbin, read_vshbin_file, write_vshbin_file};

const TEST_SPIRV: [u32; 5] = [0x0723_0203, 0x0001_0500, 0, 0, 0];

fn minimal_binary() -> ShaderBinary {
    ShaderBinary {
        content_hash: 0xC0FFEE,
        spirv_hash: hash64_words(&TEST_SPIRV),
        stage: ShaderStage::Fragment,
        spirv: TEST_SPIRV.to_vec(),
        ..ShaderBinary::default()
    }
}

fn full_binary() -> ShaderBinary {
    let reflection = ShaderReflection {
        descriptors: vec![
            DescriptorBinding {
                name: "Material".to_owned(),
                set: 0,
                binding: 0,
                count: 1,
                kind: DescriptorKind::UniformBuffer,
                stage_flags: ShaderStageFlags::FRAGMENT,
                runtime_sized: false,
            },
            DescriptorBinding {
                name: "albedoTex".to_owned(),
                set: 0,
                binding: 1,
                count: 0,
                kind: DescriptorKind::CombinedImageSampler,
                stage_flags: ShaderStageFlags::FRAGMENT,
                runtime_sized: true,
            },
        ],
        blocks: vec![BlockLayout {
            name: "Material".to_owned(),
            set: 0,
            binding: 0,
            size: 32,
            is_push_constant: false,
            stage_flags: ShaderStageFlags::FRAGMENT,
            members: vec![
                BlockMember {
                    name: "baseColor".to_owned(),
                    offset: 0,
                    size: 16,
                    ty: ParamType::Vec4,
                },
                BlockMember {
                    name: "roughness".to_owned(),
                    offset: 16,
                    size: 4,
                    ty: ParamType::F32,
                },
            ],
        }],
        has_local_size: false,
        local_size: [1, 1, 1],
    };

    let material_desc = MaterialDescription {
        material_block_name: "Material".to_owned(),
        material_param_size: 32,
        params: vec![MaterialParamDesc {
            name: "baseColor".to_owned(),
            ty: ParamType::Vec4,
            offset: 0,
            size: 16,
            semantic: Semantic::BaseColor,
            default: Some(ParamDefault {
                ty: ParamType::Vec4,
                value: {
                    let mut v = [0u8; 64];
                    for (slot, f) in v.chunks_exact_mut(4).zip([1.0f32; 4]) {
                        slot.copy_from_slice(&f.to_le_bytes());
                    }
                    v
                },
            }),
            range: Some(ParamRange { min: 0.0, max: 1.0 }),
        }],
        textures: vec![MaterialTextureDesc {
            name: "albedoTex".to_owned(),
            ty: TextureType::Tex2D,
            set: 0,
            binding: 1,
            count: 1,
            semantic: Semantic::BaseColor,
        }],
        render_state: {
            let mut s = vultra_types::RenderState::default();
            s.blend_enable = true;
            s.src_color = BlendFactor::SrcAlpha;
            s.dst_color = BlendFactor::OneMinusSrcAlpha;
            s.cull = CullMode::None;
            s.color_mask = ColorMask::RGB;
            s.depth_bias_factor = 1.5;
            s
        },
    };

    ShaderBinary {
        content_hash: 0xDEAD_BEEF,
        spirv_hash: hash64_words(&TEST_SPIRV),
        shader_id_hash: 0x1234_5678_9ABC_DEF0,
        variant_hash: 0x0FED_CBA9_8765_4321,
        stage: ShaderStage::Fragment,
        reflection,
        material_desc,
        spirv: TEST_SPIRV.to_vec(),
    }
}

#[test]
fn minimal_round_trip_and_header_bytes() {
    let bin = minimal_binary();
    let bytes = encode_vshbin(&bin).unwrap();

    assert_eq!(&bytes[0..8], b"VSHBIN\0\0");
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
    // Fragment stage index in the low flag bits.
    assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 1);
    assert_eq!(
        u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        0xC0FFEE
    );

    let decoded = decode_vshbin(&bytes).unwrap();
    assert_eq!(decoded, bin);
}

#[test]
fn full_round_trip() {
    let bin = full_binary();
    let decoded = decode_vshbin(&encode_vshbin(&bin).unwrap()).unwrap();
    assert_eq!(decoded, bin);
}

#[test]
fn optional_chunks_are_omitted_when_zero() {
    let bin = minimal_binary();
    let bytes = encode_vshbin(&bin).unwrap();
    let haystack = bytes.windows(4);
    assert!(!haystack.clone().any(|w| w == b"SIDH"));
    assert!(!haystack.clone().any(|w| w == b"VKEY"));

    let full = encode_vshbin(&full_binary()).unwrap();
    assert!(full.windows(4).any(|w| w == b"SIDH"));
    assert!(full.windows(4).any(|w| w == b"VKEY"));
}

#[test]
fn unknown_chunks_are_skipped() {
    let bin = minimal_binary();
    let mut bytes = encode_vshbin(&bin).unwrap();

    // Append an unknown chunk after the known ones.
    bytes.extend_from_slice(b"XTRA");
    bytes.extend_from_slice(&4u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 2, 3, 4]);

    let decoded = decode_vshbin(&bytes).unwrap();
    assert_eq!(decoded, bin);
}

#[test]
fn empty_spirv_is_a_serialize_error() {
    let mut bin = minimal_binary();
    bin.spirv.clear();
    assert!(matches!(
        encode_vshbin(&bin).unwrap_err(),
        Error::Serialize(_)
    ));
}

#[test]
fn unknown_stage_is_a_serialize_error() {
    let mut bin = minimal_binary();
    bin.stage = ShaderStage::Unknown;
    assert!(matches!(
        encode_vshbin(&bin).unwrap_err(),
        Error::Serialize(_)
    ));
}

#[test]
fn bad_magic_and_version_are_rejected() {
    let bytes = encode_vshbin(&minimal_binary()).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        decode_vshbin(&bad_magic).unwrap_err(),
        Error::Deserialize(_)
    ));

    let mut bad_version = bytes.clone();
    bad_version[8..12].copy_from_slice(&99u32.to_le_bytes());
    assert!(matches!(
        decode_vshbin(&bad_version).unwrap_err(),
        Error::Deserialize(_)
    ));

    assert!(decode_vshbin(&bytes[..16]).is_err());
}

#[test]
fn truncated_chunk_is_rejected() {
    let mut bytes = encode_vshbin(&minimal_binary()).unwrap();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(
        decode_vshbin(&bytes).unwrap_err(),
        Error::Deserialize(_)
    ));
}

#[test]
fn spirv_hash_mismatch_is_rejected() {
    let mut bin = minimal_binary();
    bin.spirv_hash = 0x1111_2222_3333_4444;
    let bytes = encode_vshbin(&bin).unwrap();
    let err = decode_vshbin(&bytes).unwrap_err();
    assert!(matches!(&err, Error::Deserialize(m) if m.contains("hash mismatch")), "{err}");
}

#[test]
fn zero_spirv_hash_means_unverified() {
    let mut bin = minimal_binary();
    bin.spirv_hash = 0;
    let decoded = decode_vshbin(&encode_vshbin(&bin).unwrap()).unwrap();
    assert_eq!(decoded.spirv_hash, 0);
    assert_eq!(decoded.spirv, bin.spirv);
}

#[test]
fn missing_required_chunk_is_rejected() {
    // Re-frame the encoded file, dropping the MDES chunk.
    let bytes = encode_vshbin(&minimal_binary()).unwrap();
    let mut out = bytes[..32].to_vec();
    let mut pos = 32;
    while pos < bytes.len() {
        let tag = &bytes[pos..pos + 4];
        let size =
            u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let end = pos + 8 + size;
        if tag != b"MDES" {
            out.extend_from_slice(&bytes[pos..end]);
        }
        pos = end;
    }
    let err = decode_vshbin(&out).unwrap_err();
    assert!(matches!(&err, Error::Deserialize(m) if m.contains("MDES")), "{err}");
}

#[test]
fn file_round_trip_is_atomic_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("pbr.frag.vshbin");

    let bin = full_binary();
    write_vshbin_file(&path, &bin).unwrap();
    assert_eq!(read_vshbin_file(&path).unwrap(), bin);

    // Overwrite with different content.
    let other = minimal_binary();
    write_vshbin_file(&path, &other).unwrap();
    assert_eq!(read_vshbin_file(&path).unwrap(), other);

    // No temp droppings.
    let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["pbr.frag.vshbin".to_owned()]);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = read_vshbin_file(std::path::Path::new("/nonexistent/nope.vshbin")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
