//! Material-description synthesis: joins reflection with parsed metadata and
//! validates that every declared name exists in the compiled module.

use vultra_meta::ParsedMetadata;
use vultra_types::{
    DescriptorKind, Error, MaterialDescription, MaterialParamDesc, MaterialTextureDesc, Result,
    ShaderReflection, TextureType,
};

/// Build the material description for one compiled variant.
///
/// Policy:
/// - the material block is the first non-push-constant block named
///   `materialBlockName` (`"Material"`); a missing block is legitimate for
///   compute/fullscreen/ray shaders as long as the metadata declares no
///   parameters;
/// - params mirror the reflected members in reflected order, merged with
///   metadata semantics/defaults/ranges by name (defaults are stamped with
///   the reflected member type);
/// - textures mirror sampled-image and combined-image-sampler descriptors;
/// - render state is copied from the metadata wholesale.
///
/// Validation is strict: a metadata param missing from the block members or a
/// metadata texture missing from the descriptor list is a `Parse` error.
pub fn synthesize_material_description(
    meta: &ParsedMetadata,
    reflection: &ShaderReflection,
) -> Result<MaterialDescription> {
    let mut desc = MaterialDescription::default();

    match reflection.find_block(&desc.material_block_name) {
        None => {
            if let Some(name) = meta.params.keys().next() {
                return Err(Error::parse(format!(
                    "shader declares metadata param '{name}' but has no {} block",
                    desc.material_block_name
                )));
            }
        }
        Some(block) => {
            desc.material_param_size = block.size;
            desc.params.reserve(block.members.len());

            for member in &block.members {
                let mut param = MaterialParamDesc {
                    name: member.name.clone(),
                    ty: member.ty,
                    offset: member.offset,
                    size: member.size,
                    ..MaterialParamDesc::default()
                };

                if let Some(meta_param) = meta.params.get(&member.name) {
                    param.semantic = meta_param.semantic;
                    if let Some(mut default) = meta_param.default {
                        default.ty = member.ty;
                        param.default = Some(default);
                    }
                    param.range = meta_param.range;
                }

                desc.params.push(param);
            }

            for name in meta.params.keys() {
                if !block.members.iter().any(|m| &m.name == name) {
                    return Err(Error::parse(format!(
                        "metadata param '{name}' not found in {} block members",
                        desc.material_block_name
                    )));
                }
            }
        }
    }

    for descriptor in &reflection.descriptors {
        let is_texture = matches!(
            descriptor.kind,
            DescriptorKind::CombinedImageSampler | DescriptorKind::SampledImage
        );
        if !is_texture {
            continue;
        }

        let mut texture = MaterialTextureDesc {
            name: descriptor.name.clone(),
            ty: TextureType::Unknown,
            set: descriptor.set,
            binding: descriptor.binding,
            count: descriptor.count,
            ..MaterialTextureDesc::default()
        };
        if let Some(meta_texture) = meta.textures.get(&descriptor.name) {
            texture.semantic = meta_texture.semantic;
        }
        desc.textures.push(texture);
    }

    for name in meta.textures.keys() {
        if !reflection.descriptors.iter().any(|d| &d.name == name) {
            return Err(Error::parse(format!(
                "metadata texture '{name}' not found in reflected descriptors"
            )));
        }
    }

    desc.render_state = meta.render_state;

    Ok(desc)
}
