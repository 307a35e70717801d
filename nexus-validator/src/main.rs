mod describe;
mod validate;

use clap::{Args, Parser, Subcommand};
use nexus_accessor::{AccessorSettings, DeprecationPolicy, SchemaRegistry};
use nexus_common::{init_tracer, tracer::TracerOptions};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Directory of additional `*.nxdl.xml` definitions, loaded over the built-in base classes.
    #[clap(long, global = true, env = "NEXUS_NXDL_DIR")]
    nxdl_dir: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[clap(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Checks every group of a NeXus file whose class is known against its definition.
    Validate(ValidateOpts),

    /// Lists the known classes.
    Classes,

    /// Prints the resolved definition of one class.
    Describe(DescribeOpts),
}

#[derive(Debug, Args)]
struct ValidateOpts {
    /// The NeXus file to validate.
    #[clap(long)]
    file: PathBuf,

    /// How deprecated classes, fields and children are treated.
    /// With `allow` they are not reported, with `deny` any deprecation fails the run.
    #[clap(long, default_value = "warn")]
    deprecation: DeprecationPolicy,

    /// Print the violations as a JSON array rather than one per line.
    #[clap(long)]
    json: bool,

    /// Exit with an error if any violation is found.
    #[clap(long)]
    fail_on_violation: bool,
}

#[derive(Debug, Args)]
struct DescribeOpts {
    /// The class name, for instance `NXmoderator`.
    class: String,

    /// Print the definition as JSON.
    #[clap(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _tracer = init_tracer!(TracerOptions {
        default_level: cli.log_level,
        ..Default::default()
    })?;

    let settings = match &cli.command {
        Commands::Validate(args) => {
            AccessorSettings::new(Default::default(), args.deprecation)
        }
        _ => AccessorSettings::default(),
    };
    let registry = load_registry(cli.nxdl_dir.as_deref(), settings)?;

    match cli.command {
        Commands::Validate(args) => validate::run(registry, args),
        Commands::Classes => describe::list_classes(&registry),
        Commands::Describe(args) => describe::run(&registry, args),
    }
}

fn load_registry(
    nxdl_dir: Option<&std::path::Path>,
    settings: AccessorSettings,
) -> anyhow::Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::with_builtin_classes()?.with_settings(settings);
    if let Some(dir) = nxdl_dir {
        registry.load_nxdl_dir(dir)?;
    }
    Ok(registry)
}
