use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use species_data_sync::app::{App, ProgressSink};
use species_data_sync::archive::{ArchiveClient, ArchiveHttpClient, SearchResponse};
use species_data_sync::cache::AssessmentIdCache;
use species_data_sync::config::{ConfigLoader, Credentials, ResolvedConfig, load_species_list};
use species_data_sync::error::SyncError;
use species_data_sync::error_log::ErrorLog;
use species_data_sync::normalize::asset_name;
use species_data_sync::output::{ConsoleOutput, JsonOutput, OutputMode, print_summary};
use species_data_sync::registry::{
    AssessmentPayload, RegistryClient, RegistryHttpClient, TaxonResponse,
};

#[derive(Parser)]
#[command(name = "species-sync")]
#[command(about = "Synchronize species conservation data, distribution maps and sound recordings")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the full synchronization for every species in the list")]
    Run(RunArgs),
    #[command(about = "Rebuild the completeness report from the existing dataset")]
    Report(ReportArgs),
    #[command(about = "Print the normalized asset name for a display name")]
    AssetName { name: String },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    species_list: Option<Utf8PathBuf>,

    #[arg(long)]
    pacing_ms: Option<u64>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingCredential(_)
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_)
        | SyncError::SpeciesListRead(_)
        | SyncError::SpeciesListParse(_)
        | SyncError::DatasetRead(_)
        | SyncError::DatasetParse(_) => 2,
        SyncError::RegistryHttp(_)
        | SyncError::RegistryStatus { .. }
        | SyncError::ArchiveHttp(_)
        | SyncError::ArchiveStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_sync(args),
        Command::Report(args) => run_report(args),
        Command::AssetName { name } => {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "{}", asset_name(Some(&name))).into_diagnostic()?;
            Ok(())
        }
    }
}

fn run_sync(args: RunArgs) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(path) = args.species_list {
        config.species_list = path;
    }
    if let Some(pacing_ms) = args.pacing_ms {
        config.pacing = Duration::from_millis(pacing_ms);
    }

    // Everything that can stop the run happens before the first request.
    let credentials = Credentials::from_env()?;
    let species = load_species_list(&config.species_list)?;
    let mut cache = load_cache(&config);

    let registry = RegistryHttpClient::new(
        &credentials.registry_token,
        &config.registry_base_url,
        &config.map_base_url,
        config.timeout,
    )?;
    let archive = ArchiveHttpClient::new(
        &credentials.archive_token,
        &config.archive_base_url,
        config.timeout,
    )?;
    let app = App::new(&config, registry, archive);

    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &ConsoleOutput,
    };

    let result = app.run(&species, &mut cache, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
        OutputMode::Human => print_summary(&result.report).into_diagnostic()?,
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let app = App::new(&config, NopRegistry, NopArchive);
    let report = app.report()?;
    if args.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        print_summary(&report).into_diagnostic()?;
    }
    Ok(())
}

/// A corrupt cache only costs re-downloads, so it never stops the run.
fn load_cache(config: &ResolvedConfig) -> AssessmentIdCache {
    let errors = ErrorLog::new(config.error_log.clone());
    let cache = AssessmentIdCache::load_or_empty(config.assessment_cache.clone(), &errors);
    tracing::info!(entries = cache.len(), "assessment cache loaded");
    cache
}

struct NopRegistry;
struct NopArchive;

impl RegistryClient for NopRegistry {
    fn taxon_by_name(&self, _genus: &str, _species: &str) -> Result<TaxonResponse, SyncError> {
        Err(SyncError::RegistryHttp(
            "registry client not configured".to_string(),
        ))
    }

    fn assessment(&self, _assessment_id: u64) -> Result<AssessmentPayload, SyncError> {
        Err(SyncError::RegistryHttp(
            "registry client not configured".to_string(),
        ))
    }

    fn download_map(
        &self,
        _assessment_id: u64,
        _sink: &mut dyn std::io::Write,
    ) -> Result<u64, SyncError> {
        Err(SyncError::RegistryHttp(
            "registry client not configured".to_string(),
        ))
    }
}

impl ArchiveClient for NopArchive {
    fn search(&self, _query: &str) -> Result<SearchResponse, SyncError> {
        Err(SyncError::ArchiveHttp(
            "archive client not configured".to_string(),
        ))
    }

    fn download(&self, _url: &str, _sink: &mut dyn std::io::Write) -> Result<u64, SyncError> {
        Err(SyncError::ArchiveHttp(
            "archive client not configured".to_string(),
        ))
    }
}
