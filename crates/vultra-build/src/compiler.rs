//! The external GLSL -> SPIR-V compiler seam.

use vultra_types::{Result, ShaderStage};

/// One preprocessor define, injected in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Define {
    pub name: String,
    /// Empty means "defined without a value".
    pub value: String,
}

impl Define {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a `-D` argument: `NAME` or `NAME=VALUE`.
    pub fn parse(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, value)) => Self::new(name, value),
            None => Self::new(arg, ""),
        }
    }
}

/// Options for one compile invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub stage: ShaderStage,
    pub optimize: bool,
    pub debug_info: bool,
    pub strip_debug_info: bool,
    pub defines: Vec<Define>,
    /// User include directories, searched in declared order after the source
    /// file's directory and the including file's directory.
    pub include_dirs: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            stage: ShaderStage::Fragment,
            optimize: false,
            debug_info: false,
            strip_debug_info: false,
            defines: Vec::new(),
            include_dirs: Vec::new(),
        }
    }
}

/// The shader source being built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceInput {
    /// Used for diagnostics, include resolution, and the logical shader id.
    pub virtual_path: String,
    pub source_text: String,
}

/// A successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOutput {
    pub spirv: Vec<u32>,
    pub info_log: String,
    /// Normalised absolute paths of every file the includer opened.
    pub dependencies: Vec<String>,
}

/// The external compiler interface; driver tests swap in a fake.
pub trait ShaderCompiler {
    fn compile(&self, input: &SourceInput, options: &CompileOptions) -> Result<CompileOutput>;
}

#[cfg(feature = "shaderc-backend")]
pub mod shaderc_backend {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use vultra_types::{Error, Result, ShaderStage};

    use super::{CompileOptions, CompileOutput, ShaderCompiler, SourceInput};

    /// GLSL -> SPIR-V front-end backed by `shaderc`.
    pub struct ShadercCompiler {
        compiler: shaderc::Compiler,
    }

    impl ShadercCompiler {
        /// Initialise the process-wide shaderc state. Idempotent per
        /// instance; shaderc serialises global init internally.
        pub fn new() -> Result<Self> {
            let compiler = shaderc::Compiler::new()
                .ok_or_else(|| Error::compile("failed to initialize shaderc"))?;
            Ok(Self { compiler })
        }
    }

    fn shader_kind(stage: ShaderStage) -> Result<shaderc::ShaderKind> {
        Ok(match stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Compute => shaderc::ShaderKind::Compute,
            ShaderStage::Task => shaderc::ShaderKind::Task,
            ShaderStage::Mesh => shaderc::ShaderKind::Mesh,
            ShaderStage::RayGen => shaderc::ShaderKind::RayGeneration,
            ShaderStage::RayMiss => shaderc::ShaderKind::Miss,
            ShaderStage::RayClosestHit => shaderc::ShaderKind::ClosestHit,
            ShaderStage::RayAnyHit => shaderc::ShaderKind::AnyHit,
            ShaderStage::RayIntersection => shaderc::ShaderKind::Intersection,
            ShaderStage::Unknown => {
                return Err(Error::invalid_argument("cannot compile unknown stage"))
            }
        })
    }

    /// Resolve an include request against the search order: the source
    /// file's directory, the including file's directory, then each user
    /// include directory in declared order. Absolute requests are taken
    /// as-is when they exist.
    fn resolve_include(
        requested: &str,
        requester: &str,
        source_dir: Option<&Path>,
        include_dirs: &[PathBuf],
    ) -> Option<PathBuf> {
        let requested_path = Path::new(requested);
        if requested_path.is_absolute() {
            return requested_path.exists().then(|| requested_path.to_path_buf());
        }

        let requester_dir = Path::new(requester).parent();
        let candidates = source_dir
            .into_iter()
            .chain(requester_dir)
            .chain(include_dirs.iter().map(PathBuf::as_path));

        for dir in candidates {
            let candidate = dir.join(requested_path);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    fn normalize_dep_path(path: &Path) -> String {
        path.canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned()
    }

    impl ShaderCompiler for ShadercCompiler {
        fn compile(&self, input: &SourceInput, options: &CompileOptions) -> Result<CompileOutput> {
            if input.virtual_path.is_empty() {
                return Err(Error::invalid_argument("virtualPath must not be empty"));
            }

            let kind = shader_kind(options.stage)?;

            let mut opts = shaderc::CompileOptions::new()
                .ok_or_else(|| Error::compile("failed to create shaderc compile options"))?;
            opts.set_source_language(shaderc::SourceLanguage::GLSL);
            opts.set_target_env(
                shaderc::TargetEnv::Vulkan,
                shaderc::EnvVersion::Vulkan1_2 as u32,
            );
            opts.set_optimization_level(if options.optimize {
                shaderc::OptimizationLevel::Performance
            } else {
                shaderc::OptimizationLevel::Zero
            });
            if options.debug_info && !options.strip_debug_info {
                opts.set_generate_debug_info();
            }

            // Defines go in declared order so later ones can override.
            for define in &options.defines {
                let value = (!define.value.is_empty()).then_some(define.value.as_str());
                opts.add_macro_definition(&define.name, value);
            }

            let dependencies = Rc::new(RefCell::new(Vec::<String>::new()));
            let dep_sink = Rc::clone(&dependencies);
            let source_dir = Path::new(&input.virtual_path).parent().map(Path::to_path_buf);
            let include_dirs: Vec<PathBuf> =
                options.include_dirs.iter().map(PathBuf::from).collect();

            opts.set_include_callback(move |requested, _ty, requester, _depth| {
                let resolved =
                    resolve_include(requested, requester, source_dir.as_deref(), &include_dirs)
                        .ok_or_else(|| format!("could not resolve include \"{requested}\""))?;
                let content = std::fs::read_to_string(&resolved)
                    .map_err(|e| format!("failed to read include {}: {e}", resolved.display()))?;

                let normalized = normalize_dep_path(&resolved);
                let mut deps = dep_sink.borrow_mut();
                if !deps.contains(&normalized) {
                    deps.push(normalized);
                }

                Ok(shaderc::ResolvedInclude {
                    resolved_name: resolved.to_string_lossy().into_owned(),
                    content,
                })
            });

            let artifact = self
                .compiler
                .compile_into_spirv(
                    &input.source_text,
                    kind,
                    &input.virtual_path,
                    "main",
                    Some(&opts),
                )
                .map_err(|e| {
                    Error::compile(format!(
                        "shaderc failed for stage {}:\n{e}",
                        options.stage.name()
                    ))
                })?;

            let info_log = artifact.get_warning_messages();
            let spirv = artifact.as_binary().to_vec();
            drop(opts);

            Ok(CompileOutput {
                spirv,
                info_log,
                dependencies: Rc::try_unwrap(dependencies)
                    .map(RefCell::into_inner)
                    .unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_parse_splits_on_first_equals() {
        assert_eq!(Define::parse("USE_SHADOW"), Define::new("USE_SHADOW", ""));
        assert_eq!(Define::parse("PASS=A"), Define::new("PASS", "A"));
        assert_eq!(Define::parse("EXPR=a=b"), Define::new("EXPR", "a=b"));
    }
}
