use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Parser, Subcommand};
use stitch::config::BundleConfig;
use stitch::{BundleOutput, Bundler};
use tracing::warn;

mod telemetry;

/// Bundle a multi-file OpenAPI specification into one document
///
/// Follows every `$ref` that points into another file and produces a single
/// self-contained document in the root's own format (JSON or YAML).
///
/// MODES:
///
///   inline   replace each external `$ref` with a copy of its target
///   compose  lift external targets into `components` and point at them
///
/// EXAMPLES:
///
///   stitch compose specs/openapi.yaml -o dist/openapi.yaml
///   stitch compose specs/openapi.yaml --origins dist/origins.json
///   stitch inline specs/openapi.json > bundled.json
#[derive(Parser)]
#[command(name = "stitch")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'stitch <command> --help' for more information on a specific command.")]
struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace every external pointer with a copy of its target
    ///
    /// Circular pointers are left as written.
    Inline(BundleArgs),

    /// Lift external targets into the root's components section
    ///
    /// Names that collide with existing components get a suffix derived
    /// from the source file.
    Compose(ComposeArgs),
}

#[derive(Args)]
struct BundleArgs {
    /// Root document
    spec: PathBuf,

    /// Write the bundle here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(long, env = "STITCH_CONFIG", default_value = "stitch.toml")]
    config: PathBuf,

    /// Reject `$ref` siblings in documents older than OpenAPI 3.1
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ComposeArgs {
    #[command(flatten)]
    common: BundleArgs,

    /// Separator between a colliding name and its suffix
    #[arg(long)]
    delimiter: Option<String>,

    /// Write the component origin map (JSON) to this file
    #[arg(long)]
    origins: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match cli.command {
        Commands::Inline(args) => {
            let bundler = bundler(&args, None)?;
            let out = bundler.inline(&read_spec(&args.spec)?)?;
            emit(&out, args.output.as_deref())
        }
        Commands::Compose(args) => {
            let bundler = bundler(&args.common, args.delimiter)?;
            let root = read_spec(&args.common.spec)?;
            let out = if args.origins.is_some() {
                bundler.compose_with_origins(&root)?
            } else {
                bundler.compose(&root)?
            };
            emit(&out, args.common.output.as_deref())?;
            if let Some(path) = &args.origins {
                let json = serde_json::to_vec_pretty(&out.origins)?;
                std::fs::write(path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            Ok(())
        }
    }
}

/// Build the bundler: config file first, then command-line overrides.
/// The root's directory always becomes the base for relative pointers.
fn bundler(args: &BundleArgs, delimiter: Option<String>) -> Result<Bundler> {
    let mut config = BundleConfig::load(&args.config)?;
    let Some(file_name) = args.spec.file_name() else {
        bail!("{} is not a file", args.spec.display());
    };
    config.source.base_dir = Some(
        args.spec
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    );
    config.source.spec_file = PathBuf::from(file_name);
    if args.strict {
        config.composition.strict_validation = true;
    }
    if let Some(delimiter) = delimiter {
        config.composition.delimiter = delimiter;
    }
    Ok(Bundler::new(config))
}

fn read_spec(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn emit(out: &BundleOutput, output: Option<&Path>) -> Result<()> {
    for m in &out.report.unresolved_mappings {
        warn!(
            file = %m.file.display(),
            tag = %m.tag,
            value = %m.value,
            "bundle keeps an unresolved discriminator mapping"
        );
    }
    match output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            std::fs::write(path, &out.bytes)
                .with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&out.bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
