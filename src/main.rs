use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use tributary_io::{
    align, AttributeStore, BasinId, DataLayout, DateRange, ExperimentName, ManifestEntry,
    SampleArchive, SampleWriter, StationMap, TimeSeriesLoader,
};
use tributary_seq::{Scaler, ScalerConstants, Variable, Windower};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Basin attribute and forcing data preparation for sequence models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel preparation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Basins to process, given inline or as a file.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct BasinArgs {
    /// Comma-separated basin codes (e.g. 1001,06037)
    #[arg(long, value_delimiter = ',')]
    basins: Vec<String>,

    /// File with one basin code per line
    #[arg(long)]
    basin_file: Option<PathBuf>,
}

/// Output location shared by the artifact-writing subcommands.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for artifact files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Load the attribute CSV into the SQLite attribute store
    Ingest {
        /// Data root holding the attribute CSV
        #[arg(long)]
        root: PathBuf,

        /// Attribute CSV (defaults to <root>/demo.csv)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Path to the SQLite store (created if absent)
        #[arg(long)]
        db: PathBuf,

        /// Table name inside the store
        #[arg(long, default_value = "basin_attributes")]
        table: String,

        /// Identifier column in the attribute CSV
        #[arg(long, default_value = "FIPS")]
        id_column: String,
    },

    /// Export the stored attributes of selected basins as JSON
    Attributes {
        /// Path to the SQLite store
        #[arg(long)]
        db: PathBuf,

        /// Table name inside the store
        #[arg(long, default_value = "basin_attributes")]
        table: String,

        #[command(flatten)]
        basins: BasinArgs,

        /// Comma-separated attribute columns to keep (all valid columns if unset)
        #[arg(long, value_delimiter = ',')]
        keep: Option<Vec<String>>,

        /// Comma-separated columns dropped when --keep is not given
        #[arg(long, value_delimiter = ',')]
        invalid: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Align, normalize and window each basin's forcing and discharge
    Prepare {
        /// Data root holding forcing, discharge and mapping files
        #[arg(long)]
        root: PathBuf,

        #[command(flatten)]
        basins: BasinArgs,

        /// Window length in timesteps
        #[arg(long, default_value_t = 270)]
        seq_length: usize,

        /// Comma-separated forcing columns (all non-date columns if unset)
        #[arg(long, value_delimiter = ',')]
        features: Option<Vec<String>>,

        /// First date to keep (inclusive)
        #[arg(long, value_parser = parse_cli_date)]
        start: Option<NaiveDate>,

        /// Last date to keep (inclusive)
        #[arg(long, value_parser = parse_cli_date)]
        end: Option<NaiveDate>,

        /// JSON file with scaler constants (reference statistics if unset)
        #[arg(long)]
        scaler: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Summarize a sample archive
    Inspect {
        /// Path to a `.bin` sample archive
        #[arg(long)]
        archive: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct IngestOutput {
    store: PathBuf,
    table: String,
    n_basins: usize,
    columns: Vec<String>,
}

#[derive(Serialize)]
struct AttributesOutput {
    experiment: String,
    n_requested: usize,
    n_basins: usize,
    columns: Vec<String>,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct PrepareOutput {
    experiment: String,
    n_basins: usize,
    n_samples: usize,
    seq_length: usize,
    manifest: PathBuf,
}

#[derive(Serialize)]
struct InspectOutput {
    basin_id: String,
    feature_names: Vec<String>,
    n_samples: usize,
    seq_length: usize,
    n_features: usize,
    first_target: Option<NaiveDate>,
    last_target: Option<NaiveDate>,
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    tributary_io::parse_date(s)
        .ok_or_else(|| format!("invalid date \"{s}\" (expected YYYY-MM-DD or M/D/YYYY)"))
}

/// Collect the requested basins, coerced to zero-padded IDs, first occurrence kept.
fn resolve_basins(args: &BasinArgs) -> Result<Vec<BasinId>> {
    let raw: Vec<String> = match &args.basin_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read basin file {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        None => args.basins.clone(),
    };

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for code in &raw {
        let id = BasinId::parse(code)?;
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    anyhow::ensure!(!ids.is_empty(), "no basins requested");
    Ok(ids)
}

fn load_scaler(path: Option<&Path>) -> Result<(Scaler, ScalerConstants)> {
    let constants = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read scaler file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse scaler file {}", path.display()))?
        }
        None => ScalerConstants::default(),
    };
    let scaler = Scaler::new(constants.clone()).context("invalid scaler constants")?;
    Ok((scaler, constants))
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Option<DateRange>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    let range = DateRange::new(
        start.unwrap_or(NaiveDate::MIN),
        end.unwrap_or(NaiveDate::MAX),
    )?;
    Ok(Some(range))
}

/// Everything one basin's preparation reads, shared across workers.
struct Preparation<'a> {
    loader: &'a TimeSeriesLoader,
    stations: &'a StationMap,
    scaler: &'a Scaler,
    windower: Windower,
    range: Option<DateRange>,
}

impl Preparation<'_> {
    #[instrument(skip(self, basin_id), fields(basin = %basin_id))]
    fn run(&self, basin_id: &BasinId) -> Result<(ManifestEntry, SampleArchive)> {
        let forcing = self
            .loader
            .load_forcing_with(self.stations, basin_id)
            .with_context(|| format!("failed to load forcing for basin {basin_id}"))?;
        let discharge = self
            .loader
            .load_discharge(basin_id, forcing.area)
            .with_context(|| format!("failed to load discharge for basin {basin_id}"))?;
        let series = align(&forcing.table, &discharge, self.range)
            .with_context(|| format!("failed to align basin {basin_id}"))?;

        let x = self.scaler.normalize(series.x(), Variable::Inputs)?;
        let y = self.scaler.normalize(series.y(), Variable::Output)?;
        let samples = self
            .windower
            .window(&x, &y)
            .with_context(|| format!("failed to window basin {basin_id}"))?;

        let archive = SampleArchive::new(&series, samples);
        Ok((ManifestEntry::new(&series, &archive), archive))
    }

    /// Prepare every basin in parallel, then write the archives and manifest.
    ///
    /// Nothing is written, and the output directory is not created, unless
    /// every basin succeeds.
    fn run_all(
        &self,
        basin_ids: &[BasinId],
        output: &OutputArgs,
        constants: &ScalerConstants,
    ) -> Result<PrepareOutput> {
        let experiment_name = ExperimentName::new(output.experiment.clone())?;
        let prepared = basin_ids
            .par_iter()
            .map(|basin_id| self.run(basin_id))
            .collect::<Result<Vec<_>>>()?;

        let writer = SampleWriter::new(&output.output_dir, experiment_name)?;
        for (_, archive) in &prepared {
            writer.write_samples(archive)?;
        }
        let entries: Vec<ManifestEntry> = prepared.into_iter().map(|(entry, _)| entry).collect();
        let seq_length = self.windower.seq_length();
        let manifest = writer.write_manifest(&entries, seq_length, constants)?;

        Ok(PrepareOutput {
            experiment: output.experiment.clone(),
            n_basins: entries.len(),
            n_samples: entries.iter().map(|e| e.n_samples).sum(),
            seq_length,
            manifest,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Ingest {
            root,
            source,
            db,
            table,
            id_column,
        } => {
            let source = source.unwrap_or_else(|| DataLayout::new(&root).attributes_path());
            let store = AttributeStore::new(&db)
                .with_table(table.clone())
                .with_id_column(id_column);
            let ingested = store
                .ingest(&source)
                .with_context(|| format!("failed to ingest {}", source.display()))?;

            let output = IngestOutput {
                store: db,
                table,
                n_basins: ingested.n_basins(),
                columns: ingested.column_names().into_iter().map(String::from).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Attributes {
            db,
            table,
            basins,
            keep,
            invalid,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;
            let basin_ids = resolve_basins(&basins)?;

            let store = AttributeStore::new(&db)
                .with_table(table)
                .with_invalid_columns(invalid);
            let attributes = store
                .load(&basin_ids, keep.as_deref())
                .context("failed to load attributes")?;
            info!(
                n_basins = attributes.n_basins(),
                n_columns = attributes.n_columns(),
                "attributes loaded"
            );

            let writer = SampleWriter::new(&output.output_dir, experiment_name)?;
            let path = writer.write_attributes(&attributes)?;

            let summary = AttributesOutput {
                experiment: output.experiment,
                n_requested: basin_ids.len(),
                n_basins: attributes.n_basins(),
                columns: attributes.column_names().into_iter().map(String::from).collect(),
                path,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Prepare {
            root,
            basins,
            seq_length,
            features,
            start,
            end,
            scaler,
            output,
        } => {
            // Validate the name before any basin is loaded.
            ExperimentName::new(output.experiment.clone())?;
            let basin_ids = resolve_basins(&basins)?;
            let (scaler, constants) = load_scaler(scaler.as_deref())?;
            let windower = Windower::new(seq_length)?;
            let range = date_range(start, end)?;

            let mut loader = TimeSeriesLoader::new(DataLayout::new(&root));
            if let Some(features) = features {
                loader = loader.with_forcing_columns(features);
            }
            let stations = loader
                .read_station_map()
                .context("failed to read station mapping")?;
            info!(n_basins = basin_ids.len(), n_stations = stations.len(), "preparing basins");

            let preparation = Preparation {
                loader: &loader,
                stations: &stations,
                scaler: &scaler,
                windower,
                range,
            };
            let summary = preparation.run_all(&basin_ids, &output, &constants)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Inspect { archive } => {
            let loaded = SampleArchive::load(&archive)
                .with_context(|| format!("failed to load archive {}", archive.display()))?;
            let samples = loaded.samples();

            let output = InspectOutput {
                basin_id: loaded.basin_id().to_string(),
                feature_names: loaded.feature_names().to_vec(),
                n_samples: samples.n_samples(),
                seq_length: samples.seq_length(),
                n_features: samples.n_features(),
                first_target: loaded.target_dates().first().copied(),
                last_target: loaded.target_dates().last().copied(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
