use bitflags::bitflags;

/// Depth comparison function (`state CompareOp ...`, `state ZTest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompareOp {
    Never = 0,
    Less = 1,
    Equal = 2,
    #[default]
    LessOrEqual = 3,
    Greater = 4,
    NotEqual = 5,
    GreaterOrEqual = 6,
    Always = 7,
}

impl CompareOp {
    pub fn from_wire(byte: u8) -> Option<CompareOp> {
        use CompareOp::*;
        [
            Never,
            Less,
            Equal,
            LessOrEqual,
            Greater,
            NotEqual,
            GreaterOrEqual,
            Always,
        ]
        .get(usize::from(byte))
        .copied()
    }

    /// Parse the directive token spelling (`LessOrEqual`, `Always`, ...).
    pub fn from_name(name: &str) -> Option<CompareOp> {
        Some(match name {
            "Never" => CompareOp::Never,
            "Less" => CompareOp::Less,
            "Equal" => CompareOp::Equal,
            "LessOrEqual" => CompareOp::LessOrEqual,
            "Greater" => CompareOp::Greater,
            "NotEqual" => CompareOp::NotEqual,
            "GreaterOrEqual" => CompareOp::GreaterOrEqual,
            "Always" => CompareOp::Always,
            _ => return None,
        })
    }
}

/// Blend factor for `state Blend <Src> <Dst>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlendFactor {
    Zero = 0,
    One = 1,
    SrcColor = 2,
    OneMinusSrcColor = 3,
    DstColor = 4,
    OneMinusDstColor = 5,
    SrcAlpha = 6,
    OneMinusSrcAlpha = 7,
    DstAlpha = 8,
    OneMinusDstAlpha = 9,
}

impl BlendFactor {
    pub fn from_wire(byte: u8) -> Option<BlendFactor> {
        use BlendFactor::*;
        [
            Zero,
            One,
            SrcColor,
            OneMinusSrcColor,
            DstColor,
            OneMinusDstColor,
            SrcAlpha,
            OneMinusSrcAlpha,
            DstAlpha,
            OneMinusDstAlpha,
        ]
        .get(usize::from(byte))
        .copied()
    }

    pub fn from_name(name: &str) -> Option<BlendFactor> {
        Some(match name {
            "Zero" => BlendFactor::Zero,
            "One" => BlendFactor::One,
            "SrcColor" => BlendFactor::SrcColor,
            "OneMinusSrcColor" => BlendFactor::OneMinusSrcColor,
            "DstColor" => BlendFactor::DstColor,
            "OneMinusDstColor" => BlendFactor::OneMinusDstColor,
            "SrcAlpha" => BlendFactor::SrcAlpha,
            "OneMinusSrcAlpha" => BlendFactor::OneMinusSrcAlpha,
            "DstAlpha" => BlendFactor::DstAlpha,
            "OneMinusDstAlpha" => BlendFactor::OneMinusDstAlpha,
            _ => return None,
        })
    }
}

/// Blend operation for `state BlendOp <ColorOp> <AlphaOp>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BlendOp {
    #[default]
    Add = 0,
    Subtract = 1,
    ReverseSubtract = 2,
    Min = 3,
    Max = 4,
}

impl BlendOp {
    pub fn from_wire(byte: u8) -> Option<BlendOp> {
        use BlendOp::*;
        [Add, Subtract, ReverseSubtract, Min, Max]
            .get(usize::from(byte))
            .copied()
    }

    pub fn from_name(name: &str) -> Option<BlendOp> {
        Some(match name {
            "Add" => BlendOp::Add,
            "Subtract" => BlendOp::Subtract,
            "ReverseSubtract" => BlendOp::ReverseSubtract,
            "Min" => BlendOp::Min,
            "Max" => BlendOp::Max,
            _ => return None,
        })
    }
}

/// Triangle culling mode for `state Cull None|Back|Front`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CullMode {
    None = 0,
    #[default]
    Back = 1,
    Front = 2,
}

impl CullMode {
    pub fn from_wire(byte: u8) -> Option<CullMode> {
        [CullMode::None, CullMode::Back, CullMode::Front]
            .get(usize::from(byte))
            .copied()
    }

    pub fn from_name(name: &str) -> Option<CullMode> {
        Some(match name {
            "None" => CullMode::None,
            "Back" => CullMode::Back,
            "Front" => CullMode::Front,
            _ => return None,
        })
    }
}

bitflags! {
    /// Four-bit color write mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

impl ColorMask {
    pub const RGB: ColorMask = ColorMask::R.union(ColorMask::G).union(ColorMask::B);
    pub const RGBA: ColorMask = ColorMask::RGB.union(ColorMask::A);
}

impl Default for ColorMask {
    fn default() -> Self {
        ColorMask::RGBA
    }
}

/// Fixed-function render state attached to a material.
///
/// Defaults: depth test/write on with `LessOrEqual`, back-face culling,
/// blending off, full color mask, no alpha-to-coverage, zero depth bias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareOp,

    pub cull: CullMode,

    pub blend_enable: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,

    pub color_mask: ColorMask,

    pub alpha_to_coverage: bool,

    pub depth_bias_factor: f32,
    pub depth_bias_units: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: CompareOp::LessOrEqual,
            cull: CullMode::Back,
            blend_enable: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            color_mask: ColorMask::RGBA,
            alpha_to_coverage: false,
            depth_bias_factor: 0.0,
            depth_bias_units: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let s = RenderState::default();
        assert!(s.depth_test && s.depth_write);
        assert_eq!(s.depth_func, CompareOp::LessOrEqual);
        assert_eq!(s.cull, CullMode::Back);
        assert!(!s.blend_enable);
        assert_eq!(s.color_mask, ColorMask::RGBA);
        assert!(!s.alpha_to_coverage);
        assert_eq!(s.depth_bias_factor, 0.0);
        assert_eq!(s.depth_bias_units, 0.0);
    }

    #[test]
    fn blend_factor_wire_round_trips() {
        for byte in 0..=9u8 {
            let f = BlendFactor::from_wire(byte).unwrap();
            assert_eq!(f as u8, byte);
        }
        assert_eq!(BlendFactor::from_wire(10), None);
    }

    #[test]
    fn color_mask_bits() {
        assert_eq!(ColorMask::RGBA.bits(), 0b1111);
        assert_eq!(ColorMask::R.bits(), 0b0001);
        assert_eq!(ColorMask::RGB.bits(), 0b0111);
    }
}
