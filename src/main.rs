//! bkz-compare: compare lattice reduction variants over a grid of
//! dimensions and block sizes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bkz_compare::config::CompareConfig;
use bkz_compare::logging;
use bkz_compare::observer::TracingObserver;
use bkz_compare::registry::VariantRegistry;

#[derive(Parser, Debug)]
#[command(name = "bkz-compare")]
#[command(about = "Compare the performance of lattice reduction variants")]
#[command(version)]
struct Args {
    /// Variants to compare
    #[arg(short = 'c', long = "variants", num_args = 1..)]
    variants: Option<Vec<String>>,

    /// Number of concurrent runs
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Number of tours per run
    #[arg(short = 'r', long)]
    tours: Option<usize>,

    /// Number of instances per configuration
    #[arg(short = 's', long)]
    samples: Option<usize>,

    /// Base seed (decimal or 0x-prefixed hex). Every configuration starts
    /// again at this seed, so all block sizes of one dimension run on the
    /// same instances
    #[arg(short = 'z', long, value_parser = parse_seed)]
    seed: Option<u64>,

    /// Block sizes
    #[arg(short = 'b', long = "block-sizes", num_args = 1..)]
    block_sizes: Option<Vec<usize>>,

    /// Lattice dimensions
    #[arg(short = 'd', long, num_args = 1..)]
    dimensions: Option<Vec<usize>>,

    /// JSON config file; flags given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the results and log files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Leave wall-clock metrics out of the traces
    #[arg(long)]
    no_timings: bool,
}

fn parse_seed(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid seed '{s}': {e}"))
}

impl Args {
    fn apply(self, config: &mut CompareConfig) {
        if let Some(variants) = self.variants {
            config.variants = variants;
        }
        if let Some(threads) = self.threads {
            config.run.threads = threads;
        }
        if let Some(tours) = self.tours {
            config.run.tours = tours;
        }
        if let Some(samples) = self.samples {
            config.run.samples = samples;
        }
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(block_sizes) = self.block_sizes {
            config.block_sizes = block_sizes;
        }
        if let Some(dimensions) = self.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if self.no_timings {
            config.record_timings = false;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CompareConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CompareConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    // resolve before creating any output
    let registry = VariantRegistry::with_builtins();
    let grid = config.build_grid(&registry)?;

    let name = logging::run_name(&logging::hostname(), &chrono::Local::now());
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    logging::init(Some(&config.output_dir.join(format!("{name}.log"))))?;

    tracing::debug!("variants: {:?}", config.variants);
    tracing::debug!("dimensions: {:?}", config.dimensions);
    tracing::debug!("block sizes: {:?}", config.block_sizes);
    tracing::debug!("threads: {}", config.run.threads);
    tracing::debug!("tours: {}", config.run.tours);
    tracing::debug!("samples: {}", config.run.samples);
    tracing::debug!("seed: 0x{:x}", config.run.seed);
    tracing::debug!("matrix: {:?}", config.matrix);

    let results = grid.run(&config.run, &TracingObserver::new())?;

    let path = config.output_dir.join(format!("{name}.json"));
    let json = serde_json::to_string_pretty(&results)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("results written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("0x1337"), Ok(0x1337));
        assert_eq!(parse_seed("4919"), Ok(4919));
        assert!(parse_seed("0xzz").is_err());
    }

    #[test]
    fn test_seed_help_mentions_shared_instances() {
        use clap::CommandFactory;

        let help = Args::command().render_long_help().to_string();
        let help = help.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(help.contains("Every configuration starts again at this seed"));
        assert!(help.contains("same instances"));
    }

    #[test]
    fn test_repeated_dimension_rejected() {
        let args = Args::parse_from(["bkz-compare", "-d", "60", "60"]);
        let mut config = CompareConfig::default();
        args.apply(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["bkz-compare", "-c", "LLL", "LLL75", "-t", "4", "-z", "0x10", "--no-timings"]);
        let mut config = CompareConfig::default();
        args.apply(&mut config);
        assert_eq!(config.variants, vec!["LLL", "LLL75"]);
        assert_eq!(config.run.threads, 4);
        assert_eq!(config.run.seed, 0x10);
        assert_eq!(config.run.samples, 4);
        assert!(!config.record_timings);
    }
}
