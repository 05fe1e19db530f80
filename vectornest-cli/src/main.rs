use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};

use vectornest::config::NestConfig;
use vectornest::geometry::Polygon;
use vectornest::placement::PlacementPlan;
use vectornest::session::NestingSession;
use vectornest::util;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Instance file holding the bin outline and the parts to nest
    #[arg(short, long, value_name = "FILE")]
    input_file: PathBuf,
    /// Where to write the resulting placement plan
    #[arg(short, long, value_name = "FILE")]
    output_file: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    config_file: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "[off, error, warn, info, debug, trace]",
        default_value = "info"
    )]
    log_level: LevelFilter,
}

#[derive(Debug, Serialize, Deserialize)]
struct NestInstance {
    bin: Polygon,
    parts: Vec<Polygon>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    util::init_logger(Some(args.log_level));

    let config = match args.config_file {
        None => {
            warn!("[MAIN] no config file provided, using defaults");
            NestConfig::default()
        }
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("could not open config file {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).context("incorrect config file format")?
        }
    };
    info!("[MAIN] config: {config:?}");

    let instance = read_instance(&args.input_file)?;
    info!(
        "[MAIN] instance: {} parts, bin with {} vertices",
        instance.parts.len(),
        instance.bin.points.len()
    );

    let mut session = NestingSession::new(instance.bin, instance.parts, config)?;
    session.start(
        |fraction| debug!("[MAIN] NFP progress: {:.0}%", fraction * 100.0),
        |update| {
            if let Some(update) = update {
                info!(
                    "[MAIN] improved plan: {}/{} placed across {} bins, utilization {:.1}%",
                    update.placed,
                    update.total,
                    update.plan.bins.len(),
                    update.utilization * 100.0
                );
            }
        },
    )?;
    session.join();

    let Some(plan) = session.best_plan() else {
        bail!("no placement plan found");
    };
    write_plan(&plan, &args.output_file)?;
    info!(
        "[MAIN] done: fitness {:.4}, plan written to {}",
        plan.fitness,
        args.output_file.display()
    );
    Ok(())
}

fn read_instance(path: &PathBuf) -> Result<NestInstance> {
    let file = File::open(path)
        .with_context(|| format!("could not open instance file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("could not parse instance file {}", path.display()))
}

fn write_plan(plan: &PlacementPlan, path: &PathBuf) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("could not create output file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), plan)
        .with_context(|| format!("could not write output file {}", path.display()))
}
