use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use vultra_build::{
    build_library, build_shader, BuildRequest, CacheConfig, CompileOptions, Define,
    LibraryBuildOptions, LibraryShaderInput, ShadercCompiler, SourceInput, SpirvReflectReflector,
    Toolchain,
};
use vultra_meta::{load_engine_keywords, parse_vultra_metadata, EngineKeywords};
use vultra_types::{hash64_with_seed, Error, KeywordDispatch, KeywordScope, ShaderStage};
use vultra_vshbin::{read_vshbin_file, write_vshbin_file};
use vultra_vshlib::{write_vshlib_file, ShaderLibraryEntry};

const DEFAULT_CACHE_DIR: &str = ".vshader_cache";
const SHADER_EXTENSION: &str = "vshader";

#[derive(Debug, Parser)]
#[command(name = "vshaderc", version, about = "Offline shader compiler for the vultra shader system")]
struct Cli {
    /// Verbose logging (also honours RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile one shader, one variant, into a `.vshbin`.
    Compile(CompileArgs),
    /// Scan a shader root, enumerate keyword permutations, and produce a `.vshlib`.
    Build(BuildArgs),
    /// Concatenate pre-built `.vshbin` files into a `.vshlib`.
    Packlib(PacklibArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Input shader source.
    #[arg(short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Output `.vshbin` path.
    #[arg(short = 'o', value_name = "FILE")]
    output: PathBuf,

    /// Shader stage: vert, frag, comp, task, mesh, rgen, rmiss, rchit, rahit, rint.
    #[arg(short = 'S', value_name = "STAGE", value_parser = parse_stage_arg)]
    stage: ShaderStage,

    /// Include directory (repeatable).
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<String>,

    /// Preprocessor define, NAME or NAME=VALUE (repeatable).
    #[arg(short = 'D', value_name = "NAME[=VAL]")]
    defines: Vec<String>,

    /// Engine keywords file; global permutation values it `set`s are injected
    /// as defines when the shader declares them.
    #[arg(long, value_name = "FILE")]
    keywords_file: Option<PathBuf>,

    /// Disable the build cache.
    #[arg(long)]
    no_cache: bool,

    /// Cache directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    cache: PathBuf,
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Root directory scanned for `*.vshader` sources; shader ids are derived
    /// from paths relative to it.
    #[arg(long, value_name = "DIR")]
    shader_root: PathBuf,

    /// Build only specific shaders (repeatable); relative paths resolve
    /// against the shader root.
    #[arg(long = "shader", value_name = "PATH")]
    shaders: Vec<PathBuf>,

    /// Include directory (repeatable), searched after the shader root.
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<String>,

    /// Engine keywords file; embedded into the output library.
    #[arg(long, value_name = "FILE")]
    keywords_file: Option<PathBuf>,

    /// Output `.vshlib` path.
    #[arg(short = 'o', value_name = "FILE")]
    output: PathBuf,

    /// Disable the build cache.
    #[arg(long)]
    no_cache: bool,

    /// Cache directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    cache: PathBuf,

    /// Skip variants whose `only_if` constraints fail instead of erroring.
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Debug, Args)]
struct PacklibArgs {
    /// Output `.vshlib` path.
    #[arg(short = 'o', value_name = "FILE")]
    output: PathBuf,

    /// Engine keywords file bytes to embed.
    #[arg(long, value_name = "FILE")]
    keywords_file: Option<PathBuf>,

    /// Pre-built `.vshbin` inputs.
    #[arg(required = true, value_name = "VSHBIN")]
    inputs: Vec<PathBuf>,
}

fn parse_stage_arg(s: &str) -> std::result::Result<ShaderStage, String> {
    ShaderStage::from_name(s).ok_or_else(|| format!("unknown stage: {s}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Compile(args) => cmd_compile(args),
        Commands::Build(args) => cmd_build(args),
        Commands::Packlib(args) => cmd_packlib(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Exit codes communicate error classes: 1 generic, 2 argument errors (also
/// used by clap), then one code per pipeline failure kind.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::InvalidArgument(_)) => 2,
        Some(Error::Io(_)) => 3,
        Some(Error::Parse(_)) => 4,
        Some(Error::Compile(_)) => 5,
        Some(Error::Reflect(_)) => 6,
        Some(Error::Serialize(_)) | Some(Error::Deserialize(_)) => 7,
        None => 1,
    }
}

fn make_toolchain() -> Result<(ShadercCompiler, SpirvReflectReflector)> {
    Ok((ShadercCompiler::new()?, SpirvReflectReflector))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader source {}", path.display()))
}

/// Inject engine `set` values for global permutation keywords the shader
/// declares, without overriding explicit `-D` defines.
fn inject_global_keyword_defines(
    defines: &mut Vec<Define>,
    source_text: &str,
    engine: &EngineKeywords,
) -> Result<()> {
    let meta = parse_vultra_metadata(source_text)?;
    for decl in meta.keywords {
        if decl.dispatch != KeywordDispatch::Permutation || decl.scope != KeywordScope::Global {
            continue;
        }
        if defines.iter().any(|d| d.name == decl.name) {
            continue;
        }
        if let Some(value) = engine.value(&decl.name) {
            debug!(keyword = %decl.name, value, "injecting engine keyword");
            defines.push(Define::new(decl.name, value));
        }
    }
    Ok(())
}

fn cmd_compile(args: CompileArgs) -> Result<()> {
    let source_text = read_source(&args.input)?;

    let mut defines: Vec<Define> = args.defines.iter().map(|d| Define::parse(d)).collect();

    let engine_keywords = match &args.keywords_file {
        Some(path) => {
            let engine = load_engine_keywords(path)?;
            inject_global_keyword_defines(&mut defines, &source_text, &engine)?;
            Some(engine)
        }
        None => None,
    };

    let request = BuildRequest {
        source: SourceInput {
            virtual_path: args.input.to_string_lossy().into_owned(),
            source_text,
        },
        options: CompileOptions {
            stage: args.stage,
            defines,
            include_dirs: args.include_dirs,
            ..CompileOptions::default()
        },
        engine_keywords,
        cache: CacheConfig {
            enabled: !args.no_cache,
            dir: args.cache,
        },
    };

    let (compiler, reflector) = make_toolchain()?;
    let toolchain = Toolchain {
        compiler: &compiler,
        reflector: &reflector,
    };

    let start = Instant::now();
    let outcome = build_shader(&toolchain, &request)?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        from_cache = outcome.from_cache,
        "built {}",
        args.input.display()
    );

    write_vshbin_file(&args.output, &outcome.binary)?;
    info!("wrote {}", args.output.display());
    if !outcome.log.is_empty() {
        debug!("compile log:\n{}", outcome.log);
    }

    Ok(())
}

fn infer_stage_from_path(path: &Path) -> Option<ShaderStage> {
    if path.extension()?.to_str()? != SHADER_EXTENSION {
        return None;
    }
    let stage_ext = Path::new(path.file_stem()?).extension()?.to_str()?;
    ShaderStage::from_name(stage_ext)
}

fn scan_shader_root(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to scan {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
            let path = entry.path();
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(SHADER_EXTENSION) {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn virtual_path_for(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    // Forward slashes keep shader ids and cache keys identical across hosts.
    rel.to_string_lossy().replace('\\', "/")
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let shader_root = args
        .shader_root
        .canonicalize()
        .with_context(|| format!("shader root {} not found", args.shader_root.display()))?;

    // Implicit include dirs: the root itself, and root/include when present.
    let mut include_dirs = args.include_dirs.clone();
    include_dirs.push(shader_root.to_string_lossy().into_owned());
    let implicit_include = shader_root.join("include");
    if implicit_include.is_dir() {
        include_dirs.push(implicit_include.to_string_lossy().into_owned());
    }

    let (engine_keywords, keywords_bytes) = match &args.keywords_file {
        Some(path) => {
            info!("loading engine keywords {}", path.display());
            let engine = load_engine_keywords(path)?;
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read keywords file {}", path.display()))?;
            (Some(engine), Some(bytes))
        }
        None => (None, None),
    };

    let shader_files = if args.shaders.is_empty() {
        scan_shader_root(&shader_root)?
    } else {
        let mut files: Vec<PathBuf> = args
            .shaders
            .iter()
            .map(|p| {
                if p.is_relative() {
                    shader_root.join(p)
                } else {
                    p.clone()
                }
            })
            .collect();
        files.sort();
        files
    };
    if shader_files.is_empty() {
        bail!("no shaders found under {}", shader_root.display());
    }
    info!(count = shader_files.len(), "collected shaders");

    let mut inputs = Vec::with_capacity(shader_files.len());
    for path in &shader_files {
        let stage = infer_stage_from_path(path).ok_or_else(|| {
            Error::invalid_argument(format!(
                "cannot infer stage from file name: {}",
                path.display()
            ))
        })?;
        inputs.push(LibraryShaderInput {
            virtual_path: virtual_path_for(&shader_root, path),
            source_text: read_source(path)?,
            stage,
        });
    }

    let (compiler, reflector) = make_toolchain()?;
    let toolchain = Toolchain {
        compiler: &compiler,
        reflector: &reflector,
    };

    let output = build_library(
        &toolchain,
        &inputs,
        &LibraryBuildOptions {
            include_dirs,
            engine_keywords,
            cache: CacheConfig {
                enabled: !args.no_cache,
                dir: args.cache,
            },
            skip_invalid: args.skip_invalid,
        },
    )?;

    write_vshlib_file(&args.output, &output.entries, keywords_bytes.as_deref())?;
    info!(
        entries = output.entries.len(),
        pruned = output.stats.variants_pruned,
        "wrote {}",
        args.output.display()
    );

    Ok(())
}

fn cmd_packlib(args: PacklibArgs) -> Result<()> {
    let keywords_bytes = match &args.keywords_file {
        Some(path) => {
            // Validate before embedding.
            load_engine_keywords(path)?;
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read keywords file {}", path.display()))?;
            info!("embedding keywords file {}", path.display());
            Some(bytes)
        }
        None => None,
    };

    let mut entries = Vec::with_capacity(args.inputs.len());
    let mut seen = BTreeSet::new();

    for path in &args.inputs {
        let binary = read_vshbin_file(path)?;

        let key_hash = if binary.variant_hash != 0 {
            binary.variant_hash
        } else {
            binary.content_hash
        };
        let stage_byte = binary
            .stage
            .wire_index()
            .ok_or_else(|| Error::invalid_argument("input binary has unknown stage"))?;

        debug!(
            input = %path.display(),
            key_hash,
            stage = %binary.stage,
            "adding entry"
        );

        // Unlike `build`, colliding inputs here are a caller mistake.
        let signature = hash64_with_seed(&key_hash.to_le_bytes(), u64::from(stage_byte));
        if !seen.insert(signature) {
            return Err(Error::invalid_argument(format!(
                "duplicate entry for keyHash={key_hash:016x} stage={} ({})",
                binary.stage,
                path.display()
            ))
            .into());
        }

        let blob = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        entries.push(ShaderLibraryEntry {
            key_hash,
            stage: binary.stage,
            blob,
        });
    }

    write_vshlib_file(&args.output, &entries, keywords_bytes.as_deref())?;
    info!(entries = entries.len(), "wrote {}", args.output.display());

    Ok(())
}
