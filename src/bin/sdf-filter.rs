use clap::Parser;
use sdf_filter::{FilterBuilder, SDF_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sdf-filter")]
#[command(about = "Resolve model:// includes in an SDF or URDF file and print canonical SDF", long_about = None)]
#[command(version)]
struct Args {
    /// Input SDF or URDF file
    #[arg(required_unless_present = "sdf_version")]
    input: Option<PathBuf>,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Additional model:// search root (repeatable, searched after $HOME/.gazebo/models)
    #[arg(long = "model-path", value_name = "DIR")]
    model_paths: Vec<PathBuf>,

    /// Print the SDF format version and exit
    #[arg(long = "sdf-version")]
    sdf_version: bool,

    /// Quiet operation, suppress warnings
    #[arg(short = 'q', conflicts_with = "verbose")]
    quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Set verbosity level explicitly (0-4)
    #[arg(
        long = "verbosity",
        value_name = "LEVEL",
        conflicts_with = "verbose",
        conflicts_with = "quiet"
    )]
    verbosity_level: Option<u8>,
}

impl Args {
    fn get_verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else if let Some(level) = self.verbosity_level {
            level.min(4)
        } else {
            1 + self.verbose.min(3)
        }
    }
}

fn init_logging(verbosity: u8) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new().filter_level(level).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.sdf_version {
        println!("{}", SDF_VERSION);
        return Ok(());
    }

    init_logging(args.get_verbosity());

    let Some(input) = args.input.as_ref() else {
        anyhow::bail!("no input file given");
    };

    // A missing HOME is fatal here, before any file is touched
    let builder = FilterBuilder::from_env()?;
    let filter = args
        .model_paths
        .iter()
        .fold(builder, |b, dir| b.with_model_path(dir))
        .build();
    log::info!("model:// search path: {:?}", filter.uri_paths());

    let result = filter
        .filter(input)
        .map_err(|e| anyhow::anyhow!("Failed to filter '{}': {}", input.display(), e))?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, result)?;
    } else {
        print!("{}", result);
        io::stdout().flush()?;
    }

    Ok(())
}
