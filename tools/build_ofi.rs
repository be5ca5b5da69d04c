//! OFI Build Tool
//!
//! Loads book messages from CSV, builds bar-level multi-level and integrated
//! OFI for one symbol, and optionally aligns several symbols into a design
//! matrix.
//!
//! # Output
//!
//! - `{SYM}_ofi.npy`, `{SYM}_raw_ofi.npy`, `{SYM}_depth.npy`, `{SYM}_corr.npy`,
//!   `{SYM}_bar_start_ns.npy`, `{SYM}_metadata.json`, `{SYM}_bars.csv`
//! - With `--symbols`: `design_matrix.npy`, `design_mask.npy`,
//!   `design_index.npy`, `design_metadata.json`, `design_matrix.csv`
//!
//! Nothing is written unless every requested symbol was processed.
//!
//! # Usage
//!
//! ```bash
//! build_ofi --csv book.csv --symbol AAPL --freq 1min --out out/
//! build_ofi --csv book.csv --symbol AAPL --symbols AAPL,MSFT,JPM --include-levels
//! build_ofi --csv book.csv --symbol AAPL --config ofi.toml
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use ofi_features::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "build_ofi",
    about = "Build multi-level and integrated OFI features from book messages"
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "CSV file of book messages")]
    csv: PathBuf,

    #[arg(long, value_name = "SYMBOL", help = "Symbol to build bars for")]
    symbol: String,

    #[arg(long, value_name = "FREQ", help = "Bar width, e.g. \"1min\" or \"30s\"")]
    freq: Option<String>,

    #[arg(long, value_name = "N", help = "Book levels to use (1-10)")]
    levels: Option<usize>,

    #[arg(
        long,
        value_name = "A,B,...",
        value_delimiter = ',',
        help = "Symbols to align into a design matrix (case-insensitive)"
    )]
    symbols: Vec<String>,

    #[arg(long, default_value = "ofi_output", value_name = "DIR")]
    out: PathBuf,

    #[arg(long, value_name = "FILE", help = "TOML or JSON pipeline config")]
    config: Option<PathBuf>,

    #[arg(long, help = "Scale loadings to unit L1 norm")]
    l1: bool,

    #[arg(long, help = "Normalize every level by the pooled average depth")]
    pooled_depth: bool,

    #[arg(long, help = "Add per-level OFI columns to the design matrix")]
    include_levels: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    log::info!(
        "{}",
        PipelineBuilder::from_config(config.clone()).summary()
    );

    let messages = load_messages(&cli.csv, config.levels)
        .with_context(|| format!("failed to load {}", cli.csv.display()))?;
    if messages.is_empty() {
        bail!("{} contains no messages", cli.csv.display());
    }

    let symbols = symbol_list(&cli.symbols);
    let pipeline = OfiPipeline::from_config(config.with_symbols(symbols.iter().cloned()))?;

    // Everything is computed before the first file is written.
    let output = if symbols.is_empty() {
        None
    } else {
        Some(pipeline.process(&messages)?)
    };
    let single;
    let frame = match output.as_ref().and_then(|o| o.frame(&cli.symbol)) {
        Some(frame) => frame,
        None => {
            let subset: Vec<BookMessage> = messages
                .iter()
                .filter(|m| m.symbol == cli.symbol)
                .cloned()
                .collect();
            if subset.is_empty() {
                return Err(OfiError::UnknownSymbol(cli.symbol.clone()).into());
            }
            single = pipeline.process_symbol(&subset)?;
            &single
        }
    };

    let numpy = NumpyExporter::new(&cli.out);
    let csv = CsvExporter::new(&cli.out);

    numpy.export_frame(frame)?;
    csv.export_frame(frame)?;
    println!(
        "{}: {} bars, loadings {:?}, explained variance {:.1}%",
        frame.symbol,
        frame.len(),
        frame.loadings,
        frame.explained_variance_ratio * 100.0
    );

    if let Some(output) = &output {
        numpy.export_design(&output.design)?;
        csv.export_design(&output.design)?;
        println!(
            "design matrix: {} rows × {} columns, {} gaps, {} complete rows",
            output.design.n_rows(),
            output.design.n_cols(),
            output.design.missing_count(),
            output.design.complete_rows().len()
        );
    }

    println!("output written to {}", cli.out.display());
    Ok(())
}

/// Trimmed, upper-cased `--symbols`, without empty entries.
fn symbol_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(levels) = cli.levels {
        config.levels = levels;
    }
    if let Some(freq) = &cli.freq {
        config = config.with_frequency(freq)?;
    }
    if cli.l1 {
        config.reduction.loading_norm = LoadingNorm::L1;
    }
    if cli.pooled_depth {
        config.bars.depth_scope = DepthScope::Pooled;
    }
    if cli.include_levels {
        config.alignment.include_levels = true;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => PipelineConfig::load_json(path),
        _ => PipelineConfig::load_toml(path),
    }
    .with_context(|| format!("failed to load config {}", path.display()))?;
    Ok(config)
}
