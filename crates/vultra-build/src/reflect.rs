//! The external SPIR-V reflector seam and the normalisation of its output
//! into the wire-format reflection records.

use vultra_types::{
    BlockLayout, BlockMember, DescriptorBinding, DescriptorKind, ParamType, Result,
    ShaderReflection, ShaderStage,
};

/// Options forwarded to the external reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectionOptions {
    pub include_block_members: bool,
    pub include_push_constants: bool,
}

impl Default for ReflectionOptions {
    fn default() -> Self {
        Self {
            include_block_members: true,
            include_push_constants: true,
        }
    }
}

/// Scalar base type as reported by the reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawScalarKind {
    #[default]
    Float,
    Int,
    UInt,
    Bool,
    Unknown,
}

/// Raw member type: base scalar times (columns x vector size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMemberType {
    pub scalar: RawScalarKind,
    /// 1 for scalars and vectors; 3 or 4 for matrices.
    pub columns: u32,
    /// Component count for vectors; 1 for scalars.
    pub vec_size: u32,
}

impl Default for RawMemberType {
    fn default() -> Self {
        Self {
            scalar: RawScalarKind::Float,
            columns: 1,
            vec_size: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBlockMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub ty: RawMemberType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBlock {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub size: u32,
    pub push_constant: bool,
    pub members: Vec<RawBlockMember>,
}

/// A raw descriptor binding; `count == 0` means runtime-sized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDescriptor {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub count: u32,
    pub kind: DescriptorKind,
}

/// Opaque reflector output, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReflection {
    pub descriptors: Vec<RawDescriptor>,
    pub blocks: Vec<RawBlock>,
    /// Execution model of the module's entry point.
    pub stage: ShaderStage,
    /// LocalSize execution mode, when declared.
    pub local_size: Option<[u32; 3]>,
}

/// The external reflector interface.
pub trait SpirvReflector {
    fn reflect(&self, spirv: &[u32], options: &ReflectionOptions) -> Result<RawReflection>;
}

fn map_member_type(ty: &RawMemberType) -> ParamType {
    match ty.scalar {
        RawScalarKind::Float => {
            if ty.columns == 3 {
                ParamType::Mat3
            } else if ty.columns == 4 {
                ParamType::Mat4
            } else {
                match ty.vec_size {
                    2 => ParamType::Vec2,
                    3 => ParamType::Vec3,
                    4 => ParamType::Vec4,
                    _ => ParamType::F32,
                }
            }
        }
        RawScalarKind::Int => ParamType::I32,
        RawScalarKind::UInt => ParamType::U32,
        RawScalarKind::Bool => ParamType::Bool,
        // Unhandled reflector types fall back to f32.
        RawScalarKind::Unknown => ParamType::F32,
    }
}

/// Normalise raw reflector output into the wire-format records.
pub fn normalize_reflection(raw: &RawReflection) -> ShaderReflection {
    let stage_flags = raw.stage.flag();

    let descriptors = raw
        .descriptors
        .iter()
        .map(|d| DescriptorBinding {
            name: d.name.clone(),
            set: d.set,
            binding: d.binding,
            count: d.count,
            kind: d.kind,
            stage_flags,
            runtime_sized: d.count == 0,
        })
        .collect();

    let blocks = raw
        .blocks
        .iter()
        .map(|b| BlockLayout {
            name: b.name.clone(),
            set: if b.push_constant { 0 } else { b.set },
            binding: if b.push_constant { 0 } else { b.binding },
            size: b.size,
            is_push_constant: b.push_constant,
            stage_flags,
            members: b
                .members
                .iter()
                .map(|m| BlockMember {
                    name: m.name.clone(),
                    offset: m.offset,
                    size: m.size,
                    ty: map_member_type(&m.ty),
                })
                .collect(),
        })
        .collect();

    let mut out = ShaderReflection {
        descriptors,
        blocks,
        ..ShaderReflection::default()
    };

    if raw.stage.has_local_size() {
        out.has_local_size = true;
        out.local_size = raw.local_size.unwrap_or([1, 1, 1]);
    }

    out
}

pub(crate) mod spirv_scan {
    //! Minimal scan of a SPIR-V word stream for the entry point's execution
    //! model and LocalSize execution mode. The input is untrusted: all
    //! offsets are bounds checked and malformed word counts abort the scan.

    use vultra_types::{Error, Result, ShaderStage};

    const SPIRV_MAGIC: u32 = 0x0723_0203;
    const OP_ENTRY_POINT: u32 = 15;
    const OP_EXECUTION_MODE: u32 = 16;
    const EXECUTION_MODE_LOCAL_SIZE: u32 = 17;

    fn stage_from_execution_model(model: u32) -> Result<ShaderStage> {
        Ok(match model {
            0 => ShaderStage::Vertex,
            4 => ShaderStage::Fragment,
            5 => ShaderStage::Compute,
            // Task/mesh have NV and EXT numbering.
            5267 | 5364 => ShaderStage::Task,
            5268 | 5365 => ShaderStage::Mesh,
            5313 => ShaderStage::RayGen,
            5314 => ShaderStage::RayIntersection,
            5315 => ShaderStage::RayAnyHit,
            5316 => ShaderStage::RayClosestHit,
            5317 => ShaderStage::RayMiss,
            other => {
                return Err(Error::reflect(format!(
                    "unsupported SPIR-V execution model {other}"
                )))
            }
        })
    }

    /// Returns the stage of the first entry point and its LocalSize, if any.
    pub fn scan_execution_info(spirv: &[u32]) -> Result<(ShaderStage, Option<[u32; 3]>)> {
        if spirv.len() < 5 {
            return Err(Error::reflect("SPIR-V module too short"));
        }
        if spirv[0] != SPIRV_MAGIC {
            return Err(Error::reflect("invalid SPIR-V magic"));
        }

        let mut stage = None;
        let mut local_size = None;

        let mut pos = 5usize;
        while pos < spirv.len() {
            let word = spirv[pos];
            let opcode = word & 0xFFFF;
            let count = (word >> 16) as usize;
            if count == 0 || pos + count > spirv.len() {
                return Err(Error::reflect("malformed SPIR-V instruction stream"));
            }

            match opcode {
                OP_ENTRY_POINT if stage.is_none() && count >= 2 => {
                    stage = Some(stage_from_execution_model(spirv[pos + 1])?);
                }
                OP_EXECUTION_MODE if count >= 6 && spirv[pos + 2] == EXECUTION_MODE_LOCAL_SIZE => {
                    local_size = Some([spirv[pos + 3], spirv[pos + 4], spirv[pos + 5]]);
                }
                _ => {}
            }

            pos += count;
        }

        let stage = stage.ok_or_else(|| Error::reflect("SPIR-V module has no entry point"))?;
        Ok((stage, local_size))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn module(instructions: &[Vec<u32>]) -> Vec<u32> {
            let mut words = vec![SPIRV_MAGIC, 0x0001_0500, 0, 100, 0];
            for inst in instructions {
                words.extend_from_slice(inst);
            }
            words
        }

        fn op(opcode: u32, operands: &[u32]) -> Vec<u32> {
            let mut words = vec![((operands.len() as u32 + 1) << 16) | opcode];
            words.extend_from_slice(operands);
            words
        }

        #[test]
        fn finds_stage_and_local_size() {
            // OpEntryPoint GLCompute %main "main"; OpExecutionMode %main LocalSize 8 4 1
            let words = module(&[
                op(OP_ENTRY_POINT, &[5, 1, 0x6E69_616D, 0]),
                op(OP_EXECUTION_MODE, &[1, EXECUTION_MODE_LOCAL_SIZE, 8, 4, 1]),
            ]);
            let (stage, local_size) = scan_execution_info(&words).unwrap();
            assert_eq!(stage, ShaderStage::Compute);
            assert_eq!(local_size, Some([8, 4, 1]));
        }

        #[test]
        fn fragment_without_local_size() {
            let words = module(&[op(OP_ENTRY_POINT, &[4, 1, 0])]);
            let (stage, local_size) = scan_execution_info(&words).unwrap();
            assert_eq!(stage, ShaderStage::Fragment);
            assert_eq!(local_size, None);
        }

        #[test]
        fn rejects_garbage() {
            assert!(scan_execution_info(&[]).is_err());
            assert!(scan_execution_info(&[1, 2, 3, 4, 5]).is_err());
            // Zero word count would never advance.
            let words = module(&[vec![OP_ENTRY_POINT]]);
            assert!(scan_execution_info(&words).is_err());
            // No entry point at all.
            let words = module(&[]);
            assert!(scan_execution_info(&words).is_err());
        }
    }
}

#[cfg(feature = "spirv-reflect-backend")]
pub mod spirv_reflect_backend {
    use spirv_reflect::types::{ReflectBlockVariable, ReflectDescriptorType, ReflectTypeFlags};
    use spirv_reflect::ShaderModule;

    use vultra_types::{DescriptorKind, Error, Result};

    use super::spirv_scan::scan_execution_info;
    use super::{
        RawBlock, RawBlockMember, RawDescriptor, RawMemberType, RawScalarKind, RawReflection,
        ReflectionOptions, SpirvReflector,
    };

    /// SPIR-V reflector backed by `spirv-reflect`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SpirvReflectReflector;

    fn descriptor_kind(ty: ReflectDescriptorType) -> DescriptorKind {
        match ty {
            ReflectDescriptorType::UniformBuffer => DescriptorKind::UniformBuffer,
            ReflectDescriptorType::StorageBuffer => DescriptorKind::StorageBuffer,
            ReflectDescriptorType::SampledImage => DescriptorKind::SampledImage,
            ReflectDescriptorType::StorageImage => DescriptorKind::StorageImage,
            ReflectDescriptorType::Sampler => DescriptorKind::Sampler,
            ReflectDescriptorType::CombinedImageSampler => DescriptorKind::CombinedImageSampler,
            ReflectDescriptorType::AccelerationStructureNV => DescriptorKind::AccelerationStructure,
            _ => DescriptorKind::Unknown,
        }
    }

    fn member_type(member: &ReflectBlockVariable) -> RawMemberType {
        let Some(desc) = member.type_description.as_ref() else {
            return RawMemberType::default();
        };

        let scalar = if desc.type_flags.contains(ReflectTypeFlags::FLOAT) {
            RawScalarKind::Float
        } else if desc.type_flags.contains(ReflectTypeFlags::INT) {
            if member.numeric.scalar.signedness != 0 {
                RawScalarKind::Int
            } else {
                RawScalarKind::UInt
            }
        } else if desc.type_flags.contains(ReflectTypeFlags::BOOL) {
            RawScalarKind::Bool
        } else {
            RawScalarKind::Unknown
        };

        let (columns, vec_size) = if desc.type_flags.contains(ReflectTypeFlags::MATRIX) {
            (member.numeric.matrix.column_count, member.numeric.matrix.row_count)
        } else if desc.type_flags.contains(ReflectTypeFlags::VECTOR) {
            (1, member.numeric.vector.component_count)
        } else {
            (1, 1)
        };

        RawMemberType {
            scalar,
            columns,
            vec_size,
        }
    }

    fn block_from(
        block: &ReflectBlockVariable,
        name: String,
        set: u32,
        binding: u32,
        push_constant: bool,
        options: &ReflectionOptions,
    ) -> RawBlock {
        let members = if options.include_block_members {
            block
                .members
                .iter()
                .map(|m| RawBlockMember {
                    name: m.name.clone(),
                    offset: m.offset,
                    size: m.size,
                    ty: member_type(m),
                })
                .collect()
        } else {
            Vec::new()
        };

        RawBlock {
            name,
            set,
            binding,
            size: block.size,
            push_constant,
            members,
        }
    }

    impl SpirvReflector for SpirvReflectReflector {
        fn reflect(&self, spirv: &[u32], options: &ReflectionOptions) -> Result<RawReflection> {
            let (stage, local_size) = scan_execution_info(spirv)?;

            let module = ShaderModule::load_u32_data(spirv)
                .map_err(|e| Error::reflect(format!("spirv-reflect: {e}")))?;

            let mut bindings = module
                .enumerate_descriptor_bindings(None)
                .map_err(|e| Error::reflect(format!("spirv-reflect: {e}")))?;
            // Stable order regardless of module id numbering.
            bindings.sort_by(|a, b| {
                (a.set, a.binding, a.name.as_str()).cmp(&(b.set, b.binding, b.name.as_str()))
            });

            let mut descriptors = Vec::with_capacity(bindings.len());
            let mut blocks = Vec::new();

            for binding in &bindings {
                let kind = descriptor_kind(binding.descriptor_type);

                // GLSL buffer blocks commonly have no instance name; the
                // block's type name ("Material") is the stable identity.
                let buffer_like = matches!(
                    kind,
                    DescriptorKind::UniformBuffer | DescriptorKind::StorageBuffer
                );
                let type_name = binding
                    .type_description
                    .as_ref()
                    .map(|t| t.type_name.clone())
                    .unwrap_or_default();
                let name = if buffer_like && !type_name.is_empty() {
                    type_name
                } else if !binding.name.is_empty() {
                    binding.name.clone()
                } else {
                    type_name
                };

                descriptors.push(RawDescriptor {
                    name: name.clone(),
                    set: binding.set,
                    binding: binding.binding,
                    count: binding.count,
                    kind,
                });

                if buffer_like {
                    blocks.push(block_from(
                        &binding.block,
                        name,
                        binding.set,
                        binding.binding,
                        false,
                        options,
                    ));
                }
            }

            if options.include_push_constants {
                let push_blocks = module
                    .enumerate_push_constant_blocks(None)
                    .map_err(|e| Error::reflect(format!("spirv-reflect: {e}")))?;
                for block in &push_blocks {
                    blocks.push(block_from(block, block.name.clone(), 0, 0, true, options));
                }
            }

            Ok(RawReflection {
                descriptors,
                blocks,
                stage,
                local_size,
            })
        }
    }
}
