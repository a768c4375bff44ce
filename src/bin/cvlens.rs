//! CLI binary for cvlens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, wires up the directory-backed stores, and prints the
//! feedback.

use anyhow::{Context, Result};
use clap::Parser;
use cvlens::store::fs::{FsKeyValueStore, FsObjectStore};
use cvlens::{
    analyze_file, AnalysisConfig, AnalysisOutput, AnalysisProgressCallback, CategoryFeedback,
    Collaborators, JobContext, Stage, TipKind, VisionFeedbackProvider,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Colour a 0–100 score by band.
fn score(n: u8) -> String {
    let text = format!("{n:>3}/100");
    if n >= 75 {
        green(&text)
    } else if n >= 50 {
        cyan(&text)
    } else {
        red(&text)
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal status display: a single spinner whose message tracks the
/// pipeline's stage labels.
struct SpinnerCallback {
    spinner: ProgressBar,
}

impl SpinnerCallback {
    fn new() -> Arc<Self> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { spinner })
    }
}

impl AnalysisProgressCallback for SpinnerCallback {
    fn on_stage_start(&self, _stage: Stage, status: &str) {
        self.spinner.set_message(status.to_string());
    }

    fn on_stage_failed(&self, _stage: Stage, _error: &str) {
        // the error line is printed by main after the spinner clears
        self.spinner.finish_and_clear();
    }

    fn on_completed(&self, _record_id: &str) {
        self.spinner.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic analysis
  cvlens resume.pdf --job-title "Backend Engineer"

  # With full job context
  cvlens resume.pdf -t "Data Engineer" -c Initech --job-description-file posting.txt

  # From a URL, specific model
  cvlens https://example.com/cv.pdf -t "SRE" --provider openai -m gpt-4.1

  # Machine-readable output
  cvlens resume.pdf -t "QA Lead" --json > record.json

ENVIRONMENT:
  OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
                         provider auto-detection, first available wins
  CVLENS_LLM_PROVIDER    provider to use when no --provider flag is given
  CVLENS_MODEL           model to use when no --model flag is given
  PDFIUM_DYNAMIC_LIB_PATH
                         explicit path to the pdfium shared library"#;

#[derive(Parser, Debug)]
#[command(
    name = "cvlens",
    version,
    about = "Analyse a résumé PDF with a Vision Language Model and get structured, scored feedback",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Résumé PDF: local path or HTTP/HTTPS URL
    input: String,

    /// Job title the résumé targets
    #[arg(short = 't', long)]
    job_title: String,

    /// Company name
    #[arg(short = 'c', long)]
    company: Option<String>,

    /// Job description text
    #[arg(short = 'd', long)]
    job_description: Option<String>,

    /// Read the job description from a file
    #[arg(long, conflicts_with = "job_description")]
    job_description_file: Option<PathBuf>,

    /// Directory for stored objects and analysis records
    #[arg(long, default_value = "./cvlens-data")]
    data_dir: PathBuf,

    /// LLM provider name (openai, anthropic, ollama, …)
    #[arg(long, env = "CVLENS_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier, e.g. gpt-4.1-nano
    #[arg(short = 'm', long, env = "CVLENS_MODEL")]
    model: Option<String>,

    /// Raster magnification for the page-1 preview (0.5–4.0)
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Download timeout for URL inputs, in seconds
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Print the full persisted record as JSON instead of the summary
    #[arg(long)]
    json: bool,

    /// Suppress the progress spinner
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let job_description = match (&cli.job_description, &cli.job_description_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading job description from {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let mut builder = AnalysisConfig::builder().scale(cli.scale);
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if !cli.quiet {
        builder = builder.progress_callback(SpinnerCallback::new());
    }
    let config = builder.build()?;

    let files = Arc::new(FsObjectStore::new(&cli.data_dir));
    let collab = Collaborators::new(
        files.clone(),
        Arc::new(FsKeyValueStore::new(&cli.data_dir)),
        Arc::new(
            VisionFeedbackProvider::from_config(files, &config)
                .context("configuring the inference provider")?,
        ),
    );

    let job = JobContext {
        job_title: cli.job_title.clone(),
        company_name: cli.company.clone(),
        job_description,
    };

    match analyze_file(&cli.input, job, &collab, &config, cli.download_timeout).await {
        Ok(output) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output.record)?);
            } else {
                print_summary(&output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "cvlens=info",
        _ => "cvlens=debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(output: &AnalysisOutput) {
    let record = &output.record;
    // analyze() only returns once feedback is attached
    let Some(feedback) = record.feedback.as_ref() else {
        return;
    };

    eprintln!(
        "{} {}  {}",
        green("✔"),
        bold("Analysis complete"),
        dim(&format!(
            "record {} · {:.1}s",
            record.id,
            output.stats.total_ms as f64 / 1000.0
        ))
    );
    println!();
    println!("  {}  {}", bold("Overall       "), score(feedback.overall_score));
    print_category("ATS           ", &feedback.ats);
    print_category("Tone & style  ", &feedback.tone_and_style);
    print_category("Content       ", &feedback.content);
    print_category("Structure     ", &feedback.structure);
    print_category("Skills        ", &feedback.skills);
    if let Some(ref relevance) = feedback.relevance {
        print_category("Relevance     ", relevance);
    }

    println!();
    print_tips("ATS", &feedback.ats);
    print_tips("Tone & style", &feedback.tone_and_style);
    print_tips("Content", &feedback.content);
    print_tips("Structure", &feedback.structure);
    print_tips("Skills", &feedback.skills);
    if let Some(ref relevance) = feedback.relevance {
        print_tips("Relevance", relevance);
    }
}

fn print_category(label: &str, category: &CategoryFeedback) {
    println!("  {}  {}", label, score(category.score));
}

fn print_tips(label: &str, category: &CategoryFeedback) {
    if category.tips.is_empty() {
        return;
    }
    println!("{}", bold(label));
    for tip in &category.tips {
        match tip.kind {
            TipKind::Good => println!("  {} {}", green("✓"), tip.tip),
            TipKind::Improve => println!("  {} {}", cyan("→"), tip.tip),
        }
        if let Some(ref explanation) = tip.explanation {
            println!("    {}", dim(explanation));
        }
        if let Some(ref example) = tip.example {
            println!("    {} {}", red("−"), dim(&example.bad));
            println!("    {} {}", green("+"), dim(&example.better));
        }
    }
    println!();
}
