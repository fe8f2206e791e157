use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bilinote_core::{
    ConfigStore, ConfigUpdate, Extraction, Extractor, NoteGenerator, NoteOrigin, NoteSettings,
    Provider, Settings, format_diagnosis, format_extraction_summary, notes::Note,
};

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Qwen,
    Kimi,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Qwen => Provider::Qwen,
            CliProvider::Kimi => Provider::Kimi,
        }
    }
}

#[derive(Parser)]
#[command(name = "bilinote", version)]
#[command(about = "Extract Bilibili subtitles and turn them into Markdown study notes")]
struct Cli {
    /// Show extraction details (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract subtitles and generate a study note
    Note {
        /// Bilibili video URL or BV id
        url: String,

        /// Write the note to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// AI provider, defaults to the configured one
        #[arg(short, long)]
        provider: Option<CliProvider>,

        /// Skip the AI call and produce the plain note
        #[arg(long)]
        no_ai: bool,
    },
    /// Extract and print the validated transcript
    Extract {
        /// Bilibili video URL or BV id
        url: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare both subtitle listings and score every track, without retries
    Debug {
        /// Bilibili video URL or BV id
        url: String,
    },
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print current settings with secrets masked
    Show,
    /// Update stored settings
    Set {
        #[arg(long)]
        provider: Option<CliProvider>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Bilibili cookie (SESSDATA=...)
        #[arg(long)]
        cookie: Option<String>,
    },
}

/// Directives used when RUST_LOG is unset. Both crates are named since targets use `_`.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "bilinote=debug,bilinote_core=debug"
    } else {
        "bilinote=warn,bilinote_core=warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Cancel the token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received, cancelling");
            cancel.cancel();
        }
    });
    token
}

async fn extract(settings: &Settings, url: &str) -> Result<Extraction> {
    let extractor = Extractor::new(settings.extractor_config())?;
    let cancel = cancel_on_ctrl_c();

    let spinner = create_spinner("Fetching subtitles...");
    match extractor.extract_with_cancel(url, cancel).await {
        Ok(extraction) => {
            spinner.finish_with_message(format!(
                "{} {}",
                style("✓").green().bold(),
                style(format_extraction_summary(&extraction)).dim()
            ));
            Ok(extraction)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e.into())
        }
    }
}

async fn write_output(output: Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} Saved to {}", style("✓").green().bold(), path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

async fn run_note(
    settings: &Settings,
    url: &str,
    output: Option<PathBuf>,
    provider: Option<Provider>,
    no_ai: bool,
) -> Result<()> {
    let extraction = extract(settings, url).await?;

    let note = if no_ai {
        Note::fallback(&extraction.title, &extraction.transcript)
    } else {
        let generator = NoteGenerator::new(NoteSettings::from_settings(settings, provider))?;
        let spinner = create_spinner(&format!(
            "Generating note with {}...",
            generator.provider().name()
        ));
        let note = generator
            .generate_or_fallback(&extraction.title, &extraction.transcript)
            .await;
        let origin = match note.origin {
            NoteOrigin::Ai => style(generator.provider().name()).yellow(),
            NoteOrigin::Fallback => style("plain fallback").dim(),
        };
        spinner.finish_with_message(format!("{} Note generated ({})", style("✓").green().bold(), origin));
        note
    };

    write_output(output, &note.markdown).await
}

async fn run_debug(settings: &Settings, url: &str) -> Result<()> {
    let extractor = Extractor::new(settings.extractor_config())?;

    let spinner = create_spinner("Checking subtitle listings...");
    let diagnosis = extractor.diagnose(url).await;
    spinner.finish_and_clear();
    let diagnosis = diagnosis?;

    print!("{}", format_diagnosis(&diagnosis));
    if diagnosis.selected.is_none() {
        eprintln!("{} No usable subtitle track", style("✗").red().bold());
    } else if !diagnosis.cross_check.is_consistent() {
        eprintln!(
            "{} Listings disagree; see cross-check above",
            style("!").yellow().bold()
        );
    }
    Ok(())
}

fn print_settings(settings: &Settings, store: &ConfigStore) {
    let shown = settings.redacted();
    let missing = || style("(not set)").dim().to_string();

    println!("{} {}", style("config:").bold(), store.path().display());
    println!("{} {}", style("provider:").bold(), style(shown.provider).yellow());
    for provider in [Provider::Qwen, Provider::Kimi] {
        let entry = shown.provider_settings(provider);
        println!(
            "{} key={} model={}",
            style(format!("{}:", provider.id())).bold(),
            entry.api_key.clone().unwrap_or_else(missing),
            shown.model(provider)
        );
    }
    println!(
        "{} {}",
        style("cookie:").bold(),
        shown.bilibili_cookie.clone().unwrap_or_else(missing)
    );
    println!("{} {}", style("max_tokens:").bold(), shown.max_tokens);
}

async fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::default_location()?;

    match cli.command {
        Command::Note {
            url,
            output,
            provider,
            no_ai,
        } => {
            let settings = store.load_with_env().await?;
            run_note(&settings, &url, output, provider.map(Into::into), no_ai).await
        }
        Command::Extract { url, output } => {
            let settings = store.load_with_env().await?;
            let extraction = extract(&settings, &url).await?;
            write_output(output, &extraction.transcript).await
        }
        Command::Debug { url } => {
            let settings = store.load_with_env().await?;
            run_debug(&settings, &url).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let settings = store.load_with_env().await?;
                print_settings(&settings, &store);
                Ok(())
            }
            ConfigAction::Set {
                provider,
                api_key,
                model,
                cookie,
            } => {
                let settings = store
                    .update(ConfigUpdate {
                        provider: provider.map(Into::into),
                        api_key,
                        model,
                        bilibili_cookie: cookie,
                    })
                    .await?;
                println!("{} Settings saved", style("✓").green().bold());
                print_settings(&settings, &store);
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_both_crates() {
        assert!(default_filter(true).contains("bilinote_core=debug"));
        assert!(default_filter(true).contains("bilinote=debug"));
        assert!(default_filter(false).contains("bilinote_core=warn"));

        for verbose in [true, false] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
    }

    #[test]
    fn debug_subcommand_parses() {
        let cli = Cli::try_parse_from(["bilinote", "-v", "debug", "BV1GJ411x7h7"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Debug { ref url } if url == "BV1GJ411x7h7"));
    }
}
