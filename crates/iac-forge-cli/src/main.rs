// crates/iac-forge-cli/src/main.rs
// ============================================================================
// Module: iac-forge CLI Entry Point
// Description: Command dispatcher for configuration tree workflows.
// Purpose: Create, validate, compile, and drift-check configuration trees.
// Dependencies: clap, iac-forge-codegen, iac-forge-config, iac-forge-core,
//               serde_json, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `iac-forge` binary wraps the store and the generator:
//!
//! - `init` writes the default tree.
//! - `validate` loads a tree and reports every record whose save is disabled,
//!   plus nameless records and repeated sibling names.
//! - `generate` compiles a tree to Terraform and writes it atomically.
//! - `check` compiles a tree and fails when the file on disk differs.
//!
//! Inputs are untrusted: the tree is read with a size limit and references
//! are reconciled before anything else looks at it.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use iac_forge_codegen::generate;
use iac_forge_config::ConfigError;
use iac_forge_config::ConfigSource;
use iac_forge_config::IacForgeConfig;
use iac_forge_config::LogFormat;
use iac_forge_config::LoggingConfig;
use iac_forge_core::ConfigStore;
use iac_forge_core::ConfigTree;
use iac_forge_core::Location;
use iac_forge_core::OpContext;
use iac_forge_core::ResourceKind;
use iac_forge_core::StoreError;
use iac_forge_core::default_tree;
use iac_forge_core::record_name;
use iac_forge_core::should_disable_save;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "iac-forge", version, disable_help_subcommand = true)]
struct Cli {
    /// Path to `iac-forge.toml` (overrides `IAC_FORGE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default configuration tree.
    Init(InitCommand),
    /// Report records whose save would be disabled.
    Validate(InputArgs),
    /// Compile a configuration tree to Terraform.
    Generate(GenerateCommand),
    /// Fail when the Terraform on disk differs from a fresh compile.
    Check(GenerateCommand),
}

/// Arguments for `init`.
#[derive(Args, Debug)]
struct InitCommand {
    /// Destination for the tree JSON.
    #[arg(long, value_name = "PATH")]
    out: PathBuf,
    /// Replace an existing file.
    #[arg(long)]
    force: bool,
}

/// Tree input shared by every command that reads one.
#[derive(Args, Debug)]
struct InputArgs {
    /// Configuration tree JSON (defaults to `generator.input`).
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

/// Arguments for `generate` and `check`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Tree input.
    #[command(flatten)]
    input: InputArgs,
    /// Terraform file (defaults to `generator.output`; `generate` writes to
    /// stdout when neither is set).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures surfaced to the user.
#[derive(Debug, Error)]
enum CliError {
    /// Tool configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The store rejected the tree.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// No path was given on the command line or in the config file.
    #[error("no {what} path given; pass --{flag} or set generator.{what} in iac-forge.toml")]
    MissingPath {
        /// Config key under `[generator]`.
        what: &'static str,
        /// Command-line flag.
        flag: &'static str,
    },
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// The tree exceeds `limits.max_input_bytes`.
    #[error("{} exceeds the input limit of {limit} bytes", path.display())]
    TooLarge {
        /// Offending file.
        path: PathBuf,
        /// Configured limit.
        limit: usize,
    },
    /// The tree is not valid JSON.
    #[error("invalid configuration tree in {}: {source}", path.display())]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Parser failure.
        source: serde_json::Error,
    },
    /// The tree is JSON but not an object.
    #[error("configuration tree in {} must be a JSON object", path.display())]
    NotObject {
        /// Offending file.
        path: PathBuf,
    },
    /// The tree could not be serialized.
    #[error("failed to serialize configuration tree: {0}")]
    Serialize(serde_json::Error),
    /// A file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// `init` would overwrite an existing file.
    #[error("{} already exists; pass --force to replace it", path.display())]
    Exists {
        /// Existing file.
        path: PathBuf,
    },
    /// Generated output differs from the file on disk.
    #[error("drift detected for {}. Run iac-forge generate.", path.display())]
    Drift {
        /// Checked file.
        path: PathBuf,
    },
    /// Writing to stdout or stderr failed.
    #[error("failed to write to {stream}: {source}")]
    Output {
        /// Stream name.
        stream: &'static str,
        /// Underlying failure.
        source: io::Error,
    },
    /// The log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let (config, source) = IacForgeConfig::load_with_source(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    match &source {
        ConfigSource::File(path) => debug!(path = %path.display(), "loaded configuration"),
        ConfigSource::Defaults => debug!("no configuration file; using defaults"),
    }
    match cli.command {
        Commands::Init(command) => command_init(&command),
        Commands::Validate(input) => command_validate(&config, &input),
        Commands::Generate(command) => command_generate(&config, &command),
        Commands::Check(command) => command_check(&config, &command),
    }
}

/// Installs the global subscriber; `RUST_LOG` overrides the configured level.
fn init_logging(logging: &LoggingConfig) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };
    installed.map_err(|err| CliError::Logging(err.to_string()))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `init`.
fn command_init(command: &InitCommand) -> CliResult<ExitCode> {
    if command.out.exists() && !command.force {
        return Err(CliError::Exists {
            path: command.out.clone(),
        });
    }
    let mut json = serde_json::to_string_pretty(&default_tree()).map_err(CliError::Serialize)?;
    json.push('\n');
    write_atomic(&command.out, &json)?;
    info!(path = %command.out.display(), "wrote default configuration tree");
    Ok(ExitCode::SUCCESS)
}

/// Executes `validate`.
fn command_validate(config: &IacForgeConfig, input: &InputArgs) -> CliResult<ExitCode> {
    let path = input_path(config, input)?;
    let tree = load_tree(&path, config.limits.max_input_bytes)?;
    let mut findings: Vec<String> =
        disabled_saves(&tree).into_iter().map(|label| format!("{label}: save disabled")).collect();
    findings.extend(naming_problems(&tree));
    for finding in &findings {
        write_stdout_line(finding)?;
    }
    if findings.is_empty() {
        write_stdout_line("configuration tree is valid")?;
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(count = findings.len(), "records cannot be saved");
        write_stdout_line(&format!("{} record(s) cannot be saved", findings.len()))?;
        Ok(ExitCode::FAILURE)
    }
}

/// Executes `generate`.
fn command_generate(config: &IacForgeConfig, command: &GenerateCommand) -> CliResult<ExitCode> {
    let path = input_path(config, &command.input)?;
    let document = compile(&path, config.limits.max_input_bytes)?;
    match command.out.as_ref().or(config.generator.output.as_ref()) {
        Some(out) => {
            write_atomic(out, &document)?;
            info!(path = %out.display(), bytes = document.len(), "wrote terraform");
        }
        None => write_stdout(&document)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `check`.
fn command_check(config: &IacForgeConfig, command: &GenerateCommand) -> CliResult<ExitCode> {
    let path = input_path(config, &command.input)?;
    let out = command.out.as_ref().or(config.generator.output.as_ref()).ok_or(CliError::MissingPath {
        what: "output",
        flag: "out",
    })?;
    let document = compile(&path, config.limits.max_input_bytes)?;
    check_output(out, &document)?;
    write_stdout_line(&format!("{} is up to date", out.display()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Tree Handling
// ============================================================================

/// Resolves the tree path from the flag or the config file.
fn input_path(config: &IacForgeConfig, input: &InputArgs) -> CliResult<PathBuf> {
    input.input.clone().or_else(|| config.generator.input.clone()).ok_or(CliError::MissingPath {
        what: "input",
        flag: "input",
    })
}

/// Reads a tree, fills missing keys, and reconciles its references.
fn load_tree(path: &Path, max_bytes: usize) -> CliResult<ConfigTree> {
    let bytes = read_bytes_with_limit(path, max_bytes)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(map) = value else {
        return Err(CliError::NotObject {
            path: path.to_path_buf(),
        });
    };
    let store = ConfigStore::from_tree(ConfigTree::from_map(map))?;
    if store.reconcile_all()? {
        info!(path = %path.display(), "reconciled dangling references");
    }
    Ok(store.snapshot()?)
}

/// Loads and compiles a tree.
fn compile(path: &Path, max_bytes: usize) -> CliResult<String> {
    let tree = load_tree(path, max_bytes)?;
    Ok(generate(&tree).unwrap_or_default())
}

/// Every record whose save is disabled, as `kind parent/name` labels.
fn disabled_saves(tree: &ConfigTree) -> Vec<String> {
    let mut findings = Vec::new();
    for kind in ResourceKind::ALL {
        for located in tree.located(kind) {
            let name = record_name(located.record).unwrap_or_default();
            let mut ctx = OpContext::editing(name);
            if let Some(parent) = located.parent {
                ctx = ctx.under(parent);
            }
            if should_disable_save(kind, located.record, tree, &ctx) {
                findings.push(finding_label(kind, located.parent, name));
            }
        }
    }
    findings
}

/// Lists records without a string name and repeated sibling names.
fn naming_problems(tree: &ConfigTree) -> Vec<String> {
    let mut findings = Vec::new();
    for kind in ResourceKind::ALL {
        if kind.location() == Location::Singleton {
            continue;
        }
        let mut seen: HashSet<(Option<&str>, &str)> = HashSet::new();
        for located in tree.located(kind) {
            let Some(name) = record_name(located.record) else {
                findings.push(format!("{}: missing name", finding_label(kind, located.parent, "")));
                continue;
            };
            if !seen.insert((located.parent, name)) {
                findings.push(format!("{}: duplicate name", finding_label(kind, located.parent, name)));
            }
        }
    }
    findings
}

fn finding_label(kind: ResourceKind, parent: Option<&str>, name: &str) -> String {
    match (parent, name) {
        (_, "") => kind.to_string(),
        (Some(parent), name) => format!("{kind} {parent}/{name}"),
        (None, name) => format!("{kind} {name}"),
    }
}

/// Reads a file, refusing anything larger than `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let read_error = |source: io::Error| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    let too_large = || CliError::TooLarge {
        path: path.to_path_buf(),
        limit: max_bytes,
    };
    let file = File::open(path).map_err(read_error)?;
    let limit = u64::try_from(max_bytes).map_err(|_| too_large())?;
    if file.metadata().map_err(read_error)?.len() > limit {
        return Err(too_large());
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(read_error)?;
    if bytes.len() > max_bytes {
        return Err(too_large());
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Per-process counter keeping temp names unique.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temp file next to `path`: `.{file}.tmp.{pid}.{counter}`.
fn temp_path(path: &Path) -> PathBuf {
    let file = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file}.tmp.{}.{counter}", std::process::id()))
}

/// Writes `contents` to a temp file and renames it over `path`.
fn write_atomic(path: &Path, contents: &str) -> CliResult<()> {
    let write_error = |source: io::Error| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let temp = temp_path(path);
    let written = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp)
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&temp);
        return Err(write_error(source));
    }
    Ok(())
}

/// Compares generated output with the file on disk.
fn check_output(path: &Path, contents: &str) -> CliResult<()> {
    let existing = match fs::read_to_string(path) {
        Ok(existing) => existing,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Err(CliError::Drift {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(CliError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if existing != contents {
        return Err(CliError::Drift {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|source| CliError::Output {
        stream: "stdout",
        source,
    })
}

/// Writes text to stdout as-is.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    stdout.write_all(text.as_bytes()).map_err(|source| CliError::Output {
        stream: "stdout",
        source,
    })
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> io::Result<()> {
    let mut stderr = io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
