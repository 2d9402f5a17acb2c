use crate::reflection::ParamType;
use crate::state::RenderState;

/// Size of the on-disk default-value buffer: enough for a `mat4` of `f32`.
pub const PARAM_DEFAULT_BYTES: usize = 64;

/// What a material parameter or texture means to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Semantic {
    #[default]
    Unknown = 0,
    BaseColor = 1,
    Metallic = 2,
    Roughness = 3,
    Normal = 4,
    Emissive = 5,
    Occlusion = 6,
    Opacity = 7,
    AlphaClip = 8,
    Custom = 9,
}

impl Semantic {
    pub fn from_wire(value: u32) -> Option<Semantic> {
        use Semantic::*;
        [
            Unknown, BaseColor, Metallic, Roughness, Normal, Emissive, Occlusion, Opacity,
            AlphaClip, Custom,
        ]
        .get(value as usize)
        .copied()
    }

    /// Parse the directive spelling (`semantic(BaseColor)`, ...).
    pub fn from_name(name: &str) -> Option<Semantic> {
        Some(match name {
            "Unknown" => Semantic::Unknown,
            "BaseColor" => Semantic::BaseColor,
            "Metallic" => Semantic::Metallic,
            "Roughness" => Semantic::Roughness,
            "Normal" => Semantic::Normal,
            "Emissive" => Semantic::Emissive,
            "Occlusion" => Semantic::Occlusion,
            "Opacity" => Semantic::Opacity,
            "AlphaClip" => Semantic::AlphaClip,
            "Custom" => Semantic::Custom,
            _ => return None,
        })
    }
}

/// Dimensionality of a material texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextureType {
    Tex2D = 0,
    TexCube = 1,
    Tex3D = 2,
    Tex2DArray = 3,
    #[default]
    Unknown = 4,
}

impl TextureType {
    pub fn from_wire(byte: u8) -> Option<TextureType> {
        use TextureType::*;
        [Tex2D, TexCube, Tex3D, Tex2DArray, Unknown]
            .get(usize::from(byte))
            .copied()
    }
}

/// Inclusive editor range for a scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ParamRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Default value for a material parameter.
///
/// The buffer holds up to 16 little-endian `f32`s, zero padded; `ty` is
/// stamped from the reflected member type so consumers know how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDefault {
    pub ty: ParamType,
    pub value: [u8; PARAM_DEFAULT_BYTES],
}

impl Default for ParamDefault {
    fn default() -> Self {
        Self {
            ty: ParamType::F32,
            value: [0; PARAM_DEFAULT_BYTES],
        }
    }
}

impl ParamDefault {
    /// Pack a float list into the value buffer (at most 16 values are kept).
    pub fn from_floats(values: &[f32]) -> Self {
        let mut out = Self::default();
        for (slot, v) in out.value.chunks_exact_mut(4).zip(values.iter()) {
            slot.copy_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Read back the leading `count` floats of the buffer.
    pub fn floats(&self, count: usize) -> Vec<f32> {
        self.value
            .chunks_exact(4)
            .take(count.min(16))
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

/// One material parameter: a member of the material block, joined with the
/// metadata declared for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialParamDesc {
    pub name: String,
    pub ty: ParamType,
    pub offset: u32,
    pub size: u32,
    pub semantic: Semantic,
    pub default: Option<ParamDefault>,
    pub range: Option<ParamRange>,
}

/// One material texture: a sampled-image descriptor joined with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialTextureDesc {
    pub name: String,
    pub ty: TextureType,
    pub set: u32,
    pub binding: u32,
    pub count: u32,
    pub semantic: Semantic,
}

/// The synthesised material description embedded in every `.vshbin`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescription {
    pub material_block_name: String,
    pub material_param_size: u32,
    pub params: Vec<MaterialParamDesc>,
    pub textures: Vec<MaterialTextureDesc>,
    pub render_state: RenderState,
}

impl Default for MaterialDescription {
    fn default() -> Self {
        Self {
            material_block_name: "Material".to_owned(),
            material_param_size: 0,
            params: Vec::new(),
            textures: Vec::new(),
            render_state: RenderState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_default_packs_floats_little_endian() {
        let def = ParamDefault::from_floats(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(&def.value[0..4], &1.0f32.to_le_bytes());
        assert_eq!(def.floats(4), vec![1.0, 1.0, 1.0, 1.0]);
        assert!(def.value[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn param_default_truncates_past_sixteen_floats() {
        let values = [2.0f32; 20];
        let def = ParamDefault::from_floats(&values);
        assert_eq!(def.floats(20).len(), 16);
    }

    #[test]
    fn semantic_wire_round_trips() {
        for value in 0..=9u32 {
            let s = Semantic::from_wire(value).unwrap();
            assert_eq!(s as u32, value);
        }
        assert_eq!(Semantic::from_wire(10), None);
    }
}
