use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{EnvFilter, fmt};
use ytnotes_core::{
    Collaborators, FileTranscriptSource, Orchestrator, RunConfig, Settings, SettingsStore,
    StdinTranscriptSource, SummaryMode, TranscriptSource,
};

use crate::sink::{SpinnerSink, create_spinner, format_duration};

mod sink;

/// CLI wrapper for SummaryMode (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Detailed,
    Chunked,
}

impl From<CliMode> for SummaryMode {
    fn from(cli: CliMode) -> Self {
        match cli {
            CliMode::Detailed => SummaryMode::Detailed,
            CliMode::Chunked => SummaryMode::Chunked,
        }
    }
}

#[derive(Parser)]
#[command(name = "ytnotes", version)]
#[command(about = "Summarize video transcripts with Gemini and append the notes to Google Docs")]
struct Cli {
    /// Settings file (defaults to <config dir>/ytnotes/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a transcript and append the notes to a Google Doc
    Generate(GenerateArgs),
    /// Show or update the stored settings
    Settings(SettingsArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Transcript file (JSON or plain text), or "-" to read standard input
    transcript: String,

    /// Video title. Defaults to the title in the transcript or the file name.
    #[arg(short, long)]
    title: Option<String>,

    /// Append to this Google Doc instead of creating a new one
    #[arg(short, long)]
    document_id: Option<String>,

    /// Summary mode
    #[arg(short, long)]
    mode: Option<CliMode>,

    /// Find illustrative images and insert them after the notes
    #[arg(short, long)]
    images: bool,

    /// Do not save found images under the downloads folder
    #[arg(long)]
    no_save_images: bool,

    /// Print the run outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SettingsArgs {
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    search_engine_id: Option<String>,

    /// Default Google Doc to append to. Pass an empty string to clear it.
    #[arg(long)]
    document_id: Option<String>,

    #[arg(long)]
    mode: Option<CliMode>,

    /// Turn image discovery on or off by default
    #[arg(long)]
    images: Option<bool>,

    /// Docs API bearer token. Without one, `gcloud auth print-access-token` is used.
    #[arg(long)]
    access_token: Option<String>,

    /// Print the effective settings with secrets masked
    #[arg(long)]
    show: bool,
}

impl SettingsArgs {
    fn has_changes(&self) -> bool {
        self.api_key.is_some()
            || self.search_engine_id.is_some()
            || self.document_id.is_some()
            || self.mode.is_some()
            || self.images.is_some()
            || self.access_token.is_some()
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(api_key) = self.api_key {
            settings.api_key = Some(api_key);
        }
        if let Some(engine) = self.search_engine_id {
            settings.search_engine_id = Some(engine);
        }
        if let Some(document_id) = self.document_id {
            settings.document_id = Some(document_id).filter(|id| !id.trim().is_empty());
        }
        if let Some(mode) = self.mode {
            settings.summary_mode = mode.into();
        }
        if let Some(images) = self.images {
            settings.download_images = images;
        }
        if let Some(token) = self.access_token {
            settings.access_token = Some(token);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .ok();
}

fn mask(secret: &Option<String>) -> Option<String> {
    secret.as_ref().map(|s| {
        let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("****{tail}")
    })
}

async fn generate(store: SettingsStore, args: GenerateArgs) -> Result<()> {
    let mut settings = store.load()?;
    if let Some(document_id) = args.document_id {
        settings.document_id = Some(document_id);
    }
    if let Some(mode) = args.mode {
        settings.summary_mode = mode.into();
    }
    if args.images {
        settings.download_images = true;
    }
    if args.no_save_images {
        settings.save_images_locally = false;
    }

    let config = RunConfig::from_settings(&settings)?;
    let parts = Collaborators::google(&config, settings.credentials())?;

    let source: Box<dyn TranscriptSource> = if args.transcript == "-" {
        Box::new(StdinTranscriptSource::new(args.title))
    } else {
        Box::new(FileTranscriptSource::new(&args.transcript, args.title))
    };

    println!(
        "\n{}  {}\n",
        style("ytnotes").cyan().bold(),
        style("Video Notes").dim()
    );

    let spinner = create_spinner("Reading transcript...");
    let Some(transcript) = source.fetch().await? else {
        spinner.finish_and_clear();
        bail!("Could not find a transcript in {}", args.transcript);
    };
    spinner.finish_with_message(format!(
        "{} Transcript: {} {}",
        style("✓").green().bold(),
        style(&transcript.title).yellow(),
        style(format!("({} chars)", transcript.text.chars().count())).dim()
    ));

    let total_start = Instant::now();
    let mut orchestrator = Orchestrator::new(config, parts);
    orchestrator.subscribe(SpinnerSink::new());
    let outcome = match orchestrator.run(&transcript).await {
        Ok(outcome) => outcome,
        // The sink has already printed the failure.
        Err(_) => std::process::exit(1),
    };

    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!("{} {}", style("Document:").dim(), style(&outcome.document_url).cyan());
    for path in &outcome.saved_images {
        println!("{} {}", style("Saved:").dim(), style(path.display()).cyan());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}

async fn settings(store: SettingsStore, args: SettingsArgs) -> Result<()> {
    let show = args.show;
    let changed = args.has_changes();
    if changed {
        let mut stored = store
            .load_stored()
            .with_context(|| format!("reading {}", store.path().display()))?;
        args.apply(&mut stored);
        store.save(&stored).await?;
        println!(
            "{} Settings saved to {}",
            style("✓").green().bold(),
            style(store.path().display()).dim()
        );
    }

    if show || !changed {
        let mut effective = store.load()?;
        effective.api_key = mask(&effective.api_key);
        effective.access_token = mask(&effective.access_token);
        println!("{} {}", style("Settings file:").dim(), store.path().display());
        println!("{}", serde_json::to_string_pretty(&effective)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::at_default_location(),
    };

    let result = match cli.command {
        Command::Generate(args) => generate(store, args).await,
        Command::Settings(args) => settings(store, args).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_keep_only_their_tail() {
        assert_eq!(mask(&Some("AIzaSyExample1234".into())).as_deref(), Some("****1234"));
        assert_eq!(mask(&Some("ab".into())).as_deref(), Some("****ab"));
        assert_eq!(mask(&None), None);
    }

    #[test]
    fn settings_flags_override_stored_values() {
        let cli = Cli::parse_from([
            "ytnotes",
            "settings",
            "--api-key",
            "k",
            "--mode",
            "detailed",
            "--images",
            "true",
            "--document-id",
            "",
        ]);
        let Command::Settings(args) = cli.command else {
            panic!("expected settings command");
        };
        assert!(args.has_changes());

        let mut settings = Settings {
            document_id: Some("old".into()),
            ..Settings::default()
        };
        args.apply(&mut settings);
        assert_eq!(settings.api_key.as_deref(), Some("k"));
        assert_eq!(settings.summary_mode, SummaryMode::Detailed);
        assert!(settings.download_images);
        assert_eq!(settings.document_id, None);
    }

    #[test]
    fn generate_reads_stdin_with_dash() {
        let cli = Cli::parse_from(["ytnotes", "generate", "-", "--images", "--mode", "chunked"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.transcript, "-");
        assert!(args.images);
        assert!(matches!(args.mode, Some(CliMode::Chunked)));
    }
}
