//! Command runners behind the `simord` binary.
//!
//! Each runner resolves its settings (explicit argument, then environment,
//! then built-in default), does its work through the library API, and prints
//! console tables to stdout. Diagnostics go through `tracing`.

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, error::ErrorKind};
use tracing::info;

use crate::assemble::{
    AssemblyStats, CountValidation, OrdersIndex, assemble, primock_keys, validate_counts,
    write_splits,
};
use crate::config::PipelineConfig;
use crate::constants::aci_bench::DEFAULT_DATASET;
use crate::constants::env;
use crate::constants::layout::DEFAULT_DATA_DIR;
use crate::constants::primock::{DEFAULT_BASE_URL, DEFAULT_PREVIEW_ID, PREVIEW_CHARS, SOURCE_ID};
use crate::data::OriginSet;
use crate::errors::SimordError;
use crate::ids::parse_primock_id;
use crate::reallocation::{ReallocationMap, reallocate};
use crate::report::{
    BucketSummary, render_bucket_table, render_count_validation, render_delta_table,
    render_reallocation_table, render_stats,
};
use crate::source::aci_bench::AciBenchLoader;
use crate::source::primock::PrimockClient;
use crate::source::{ConsultationTranscripts, EncounterTranscripts};
use crate::transport::fs::{load_origins, read_json, write_json_pretty};
use crate::utils::truncate_chars;
use crate::verify::verify;

#[derive(Debug, Parser)]
#[command(
    name = "simord",
    disable_help_subcommand = true,
    about = "Reallocate SIMORD splits and rebuild the dataset",
    long_about = "Detect misplaced SIMORD examples, reallocate them into train/test1/test2, verify the result, and assemble transcripts with their orders.",
    after_help = "Settings are resolved in order by explicit arg, environment variables, then project defaults."
)]
struct SimordCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report misplaced ids, reallocate, verify and write the reallocation map.
    Analyze(DataArgs),
    /// Assemble the reallocated dataset from the map and both collaborators.
    Build(BuildArgs),
    /// Print the start of one PriMock57 transcript.
    Transcript(TranscriptArgs),
}

#[derive(Debug, Args)]
struct DataArgs {
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        env = env::DATA_DIR,
        default_value = DEFAULT_DATA_DIR,
        help = "Directory holding original/, new/ and the reallocation map"
    )]
    data_dir: PathBuf,
}

#[derive(Debug, Args)]
struct BuildArgs {
    #[command(flatten)]
    data: DataArgs,
    #[arg(
        long = "aci-dataset",
        value_name = "DATASET",
        env = env::ACI_DATASET,
        default_value = DEFAULT_DATASET,
        help = "Hugging Face dataset id providing ACI-Bench dialogues"
    )]
    aci_dataset: String,
    #[command(flatten)]
    primock: PrimockArgs,
}

#[derive(Debug, Args)]
struct PrimockArgs {
    #[arg(
        long = "primock-base-url",
        value_name = "URL",
        env = env::PRIMOCK_BASE_URL,
        default_value = DEFAULT_BASE_URL,
        help = "Directory URL of the PriMock57 TextGrid files"
    )]
    primock_base_url: String,
}

#[derive(Debug, Args)]
struct TranscriptArgs {
    #[arg(
        value_name = "ID",
        default_value = DEFAULT_PREVIEW_ID,
        help = "PriMock57 id to preview (primock57_<day>_<consultation>)"
    )]
    id: String,
    #[command(flatten)]
    primock: PrimockArgs,
}

/// Outcome of assembling the dataset.
#[derive(Clone, Debug)]
pub struct BuildOutcome {
    /// Counters from assembly.
    pub stats: AssemblyStats,
    /// Allocation versus output comparison.
    pub validation: CountValidation,
    /// Split files written.
    pub written: Vec<PathBuf>,
}

/// Parse `args_iter` (without the program name) and run the chosen command.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<SimordCli, _>(std::iter::once("simord".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    match cli.command {
        Command::Analyze(args) => {
            let config = PipelineConfig::with_data_dir(args.data_dir);
            config.validate()?;
            run_analyze(&config)?;
        }
        Command::Build(args) => {
            let config = PipelineConfig {
                data_dir: args.data.data_dir,
                aci_dataset: args.aci_dataset,
                primock_base_url: args.primock.primock_base_url,
            };
            config.validate()?;
            run_build(&config)?;
        }
        Command::Transcript(args) => {
            let config = PipelineConfig {
                primock_base_url: args.primock.primock_base_url,
                ..PipelineConfig::default()
            };
            config.validate()?;
            run_transcript(&config, &args.id)?;
        }
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

/// Classify, reallocate, verify and persist the reallocation map.
///
/// Nothing is written when verification fails.
pub fn run_analyze(config: &PipelineConfig) -> Result<ReallocationMap, SimordError> {
    let origins = load_origins(&config.original_dir())?;

    let summaries: Vec<BucketSummary> = origins.iter().map(BucketSummary::from_origin).collect();
    println!("{}", render_bucket_table(&summaries));

    let allocation = reallocate(&origins);
    let report = verify(&origins, &allocation)?;
    info!(
        "[simord:analyze] verified {} ids ({} misplaced)",
        report.universe, report.misplaced
    );

    let map = ReallocationMap::new(&origins, allocation);
    let map_path = config.map_path();
    write_json_pretty(&map_path, &map)?;

    println!("Reallocation map saved to: {}", map_path.display());
    println!();
    print!("{}", render_reallocation_table(&map));
    Ok(map)
}

/// Assemble the dataset using live collaborators.
///
/// The stored map is re-verified before any transcript is fetched.
pub fn run_build(config: &PipelineConfig) -> Result<BuildOutcome, SimordError> {
    let map = load_map(config)?;
    let origins = verified_origins(config, &map)?;
    let encounters = AciBenchLoader::new(config.aci_bench()).load();
    let consultations =
        PrimockClient::new(config.primock()).prefetch(primock_keys(&map.splits));
    assemble_verified(config, &map, &origins, &consultations, &encounters)
}

fn load_map(config: &PipelineConfig) -> Result<ReallocationMap, SimordError> {
    let map_path = config.map_path();
    if !map_path.exists() {
        return Err(SimordError::Configuration(format!(
            "reallocation map not found at {}; run `simord analyze` first",
            map_path.display()
        )));
    }
    read_json(&map_path)
}

/// Current origin files, provided the stored map still matches them.
fn verified_origins(
    config: &PipelineConfig,
    map: &ReallocationMap,
) -> Result<Vec<OriginSet>, SimordError> {
    let origins = load_origins(&config.original_dir())?;
    verify(&origins, &map.splits)?;
    Ok(origins)
}

/// Re-verify the stored map, assemble rows and write the split files.
pub fn build_with(
    config: &PipelineConfig,
    map: &ReallocationMap,
    consultations: &dyn ConsultationTranscripts,
    encounters: &dyn EncounterTranscripts,
) -> Result<BuildOutcome, SimordError> {
    let origins = verified_origins(config, map)?;
    assemble_verified(config, map, &origins, consultations, encounters)
}

fn assemble_verified(
    config: &PipelineConfig,
    map: &ReallocationMap,
    origins: &[OriginSet],
    consultations: &dyn ConsultationTranscripts,
    encounters: &dyn EncounterTranscripts,
) -> Result<BuildOutcome, SimordError> {
    let orders = OrdersIndex::from_origins(origins);
    info!("[simord:build] loaded orders for {} entries", orders.len());
    info!(
        "[simord:build] assembling with {} and {}",
        consultations.id(),
        encounters.id()
    );

    let (assembled, stats) = assemble(&map.splits, &orders, consultations, encounters);
    println!("Build statistics:");
    print!("{}", render_stats(&stats));

    let validation = validate_counts(&map.splits, &assembled);
    println!();
    println!("Validation:");
    print!("{}", render_count_validation(&validation));

    let written = write_splits(&config.new_dir(), &assembled)?;
    for path in &written {
        println!("Saved {}", path.display());
    }

    println!();
    println!("Changes summary:");
    print!("{}", render_delta_table(&map.counts_before, &assembled));

    Ok(BuildOutcome {
        stats,
        validation,
        written,
    })
}

/// Fetch one PriMock57 transcript and print its beginning.
pub fn run_transcript(config: &PipelineConfig, id: &str) -> Result<String, SimordError> {
    let key = parse_primock_id(id).ok_or_else(|| {
        SimordError::Configuration(format!(
            "'{id}' is not a PriMock57 id (expected primock57_<day>_<consultation>)"
        ))
    })?;
    let client = PrimockClient::new(config.primock());
    let transcript = client
        .transcript(key)
        .ok_or_else(|| SimordError::SourceUnavailable {
            source_id: SOURCE_ID.to_string(),
            reason: format!("no transcript available for {id}"),
        })?;

    println!("=== {} ({} chars) ===", key.row_id(), transcript.chars().count());
    println!("{}", truncate_chars(&transcript, PREVIEW_CHARS));
    Ok(transcript)
}
