//! CLI binary for edgequake-pdf2tex.
//!
//! A thin shim over the library crate: each subcommand maps its flags onto
//! a config struct, calls one library entry point and prints the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2tex::cache::{EntryKind, PurgeReport};
use edgequake_pdf2tex::prompts::STRICT_SYSTEM_PROMPT;
use edgequake_pdf2tex::{
    hub, purge_all, purge_model, rasterize_to_dir, resolve_cache_root, transcribe_to_file,
    ErrorPolicy, MatchMode, ModelId, PdfiumRasterizer, ProgressCallback, PurgeOptions,
    RasterConfig, TranscriptionConfig, TranscriptionProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_transcription_start
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Transcribing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl TranscriptionProgressCallback for CliProgressCallback {
    fn on_transcription_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Transcribing {total_pages} page images…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_transcription_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages transcribed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages transcribed  ({} skipped)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # 1. Render every page of a PDF into images/1.png, 2.png, …
  pdf2tex rasterize paper.pdf

  # 2. Transcribe the page images into output.txt
  pdf2tex transcribe --images images -o output.txt

  # Served hub model through an OpenAI-compatible endpoint (vLLM, Ollama, …)
  pdf2tex transcribe --provider ollama --model llava --page-markers

  # Stop at the first failed page instead of skipping it
  pdf2tex transcribe --on-error abort

  # Find LaTeX-capable vision models on the hub
  pdf2tex hub list --task image-to-text --limit 20

  # See what a purge would remove, then remove it
  pdf2tex cache purge prithivMLmods/LatexMind-2B-Codec --dry-run
  pdf2tex cache purge prithivMLmods/LatexMind-2B-Codec

  # Empty the whole model cache
  pdf2tex cache purge-all

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  HF_HUB_CACHE            Model cache directory
  HF_HOME                 Hub home; the cache is $HF_HOME/hub
  HF_ENDPOINT             Hub base URL (default https://huggingface.co)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2tex",
    version,
    about = "Turn PDF pages into LaTeX with vision models and manage the local model cache",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Model cache directory. Default: $HF_HUB_CACHE, $HF_HOME/hub or
    /// ~/.cache/huggingface/hub.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Emit machine-readable JSON reports on stdout.
    #[arg(long, global = true, env = "PDF2TEX_JSON")]
    json: bool,

    #[arg(short, long, global = true, env = "PDF2TEX_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "PDF2TEX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page of a PDF as <page>.png.
    Rasterize(RasterizeArgs),
    /// Transcribe a directory of page images into one LaTeX file.
    Transcribe(TranscribeArgs),
    /// Inspect or purge the local model cache.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Query the model hub.
    #[command(subcommand)]
    Hub(HubCommand),
}

#[derive(Args, Debug)]
struct RasterizeArgs {
    /// PDF to render. Asked for on stdin when omitted.
    pdf: Option<PathBuf>,

    #[arg(long, env = "PDF2TEX_IMAGES_DIR", default_value = "images")]
    out_dir: PathBuf,

    #[arg(long, env = "PDF2TEX_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    #[arg(long, env = "PDF2TEX_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct TranscribeArgs {
    #[arg(long, env = "PDF2TEX_IMAGES_DIR", default_value = "images")]
    images: PathBuf,

    #[arg(short, long, env = "PDF2TEX_OUTPUT", default_value = "output.txt")]
    output: PathBuf,

    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Instruction sent with every page image.
    #[arg(long, env = "PDF2TEX_PROMPT")]
    prompt: Option<String>,

    /// Send a strict "LaTeX only" system prompt (for general chat models).
    #[arg(long)]
    strict: bool,

    /// Prefix each page with "--- Output from page N ---".
    #[arg(long, env = "PDF2TEX_PAGE_MARKERS")]
    page_markers: bool,

    #[arg(long, env = "PDF2TEX_ON_ERROR", value_enum, default_value = "skip")]
    on_error: OnErrorArg,

    #[arg(long, env = "PDF2TEX_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    #[arg(long, env = "PDF2TEX_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    #[arg(long, env = "PDF2TEX_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long, env = "PDF2TEX_API_TIMEOUT", default_value_t = 0)]
    api_timeout: u64,

    /// Keep model replies exactly as returned (no fence stripping or cleanup).
    #[arg(long)]
    raw: bool,

    #[arg(long, env = "PDF2TEX_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Print the resolved cache directory.
    Path,
    /// Delete every entry in the cache directory.
    PurgeAll {
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete every cache entry whose name matches a model id.
    Purge {
        /// Model id, e.g. "prithivMLmods/LatexMind-2B-Codec".
        model_id: String,
        /// Match whole entry names only (models--Org--Name), not substrings.
        #[arg(long)]
        exact: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HubCommand {
    /// List models tagged with a pipeline task.
    List {
        #[arg(long)]
        task: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, env = "PDF2TEX_HUB_TIMEOUT", default_value_t = 30)]
        timeout: u64,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OnErrorArg {
    Skip,
    Abort,
}

impl From<OnErrorArg> for ErrorPolicy {
    fn from(v: OnErrorArg) -> Self {
        match v {
            OnErrorArg::Skip => ErrorPolicy::Skip,
            OnErrorArg::Abort => ErrorPolicy::Abort,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The transcription progress bar replaces INFO-level library logs.
    let show_progress = match &cli.command {
        Command::Transcribe(args) => !cli.quiet && !args.no_progress && !cli.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Rasterize(args) => run_rasterize(&cli, args).await,
        Command::Transcribe(args) => run_transcribe(&cli, args, show_progress).await,
        Command::Cache(cmd) => run_cache(&cli, cmd),
        Command::Hub(cmd) => run_hub(&cli, cmd).await,
    }
}

// ── rasterize ────────────────────────────────────────────────────────────────

async fn run_rasterize(cli: &Cli, args: &RasterizeArgs) -> Result<()> {
    let pdf = match args.pdf {
        Some(ref p) => p.clone(),
        None => prompt_pdf_path().context("Failed to read PDF file name")?,
    };

    let mut builder = RasterConfig::builder().dpi(args.dpi);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid rasterisation settings")?;

    let pages = rasterize_to_dir(&pdf, &args.out_dir, &config, Arc::new(PdfiumRasterizer))
        .await
        .context("Error during conversion")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&pages).context("Failed to serialise page list")?
        );
    } else if !cli.quiet {
        for page in &pages {
            println!("Saved page {} as {}", page.page_num, page.path.display());
        }
        println!(
            "All pages have been saved in the '{}' folder.",
            args.out_dir.display()
        );
    }
    Ok(())
}

fn prompt_pdf_path() -> Result<PathBuf> {
    print!("Enter the name of your PDF file: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

// ── transcribe ───────────────────────────────────────────────────────────────

async fn run_transcribe(cli: &Cli, args: &TranscribeArgs, show_progress: bool) -> Result<()> {
    let mut builder = TranscriptionConfig::builder()
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .error_policy(args.on_error.into())
        .page_markers(args.page_markers)
        .clean_output(!args.raw);

    if let Some(ref prompt) = args.prompt {
        builder = builder.prompt(prompt.clone());
    }
    if args.strict {
        builder = builder.system_prompt(STRICT_SYSTEM_PROMPT);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid transcription settings")?;

    let stats = transcribe_to_file(&args.images, &args.output, &config)
        .await
        .context("Transcription failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }
    Ok(())
}

// ── cache ────────────────────────────────────────────────────────────────────

fn run_cache(cli: &Cli, cmd: &CacheCommand) -> Result<()> {
    let root = resolve_cache_root(cli.cache_dir.as_deref())
        .context("Cannot determine the model cache directory")?;

    match cmd {
        CacheCommand::Path => {
            println!("{}", root.display());
            Ok(())
        }
        CacheCommand::PurgeAll { dry_run } => {
            let options = PurgeOptions {
                dry_run: *dry_run,
                ..PurgeOptions::default()
            };
            let report = purge_all(&root, options);
            print_purge_report(cli, &report, None)
        }
        CacheCommand::Purge {
            model_id,
            exact,
            dry_run,
        } => {
            let model = ModelId::parse(model_id).context("Invalid model id")?;
            let options = PurgeOptions {
                match_mode: if *exact {
                    MatchMode::Exact
                } else {
                    MatchMode::Substring
                },
                dry_run: *dry_run,
            };
            let report = purge_model(&root, &model, options);
            print_purge_report(cli, &report, Some(&model))
        }
    }
}

fn print_purge_report(cli: &Cli, report: &PurgeReport, model: Option<&ModelId>) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise purge report")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    if !report.root_exists {
        println!("Cache directory not found: {}", report.root.display());
        return Ok(());
    }
    if let Some(ref err) = report.listing_error {
        println!(
            "{} {}: {}",
            red("Cannot list cache directory"),
            report.root.display(),
            err
        );
        return Ok(());
    }

    let verb = if report.dry_run { "Would delete" } else { "Deleted" };
    for entry in &report.removed {
        println!("{} {}: {}", verb, kind_label(entry.kind), entry.path.display());
    }
    for failure in &report.failures {
        println!(
            "{} {} {}: {}",
            red("Error deleting"),
            kind_label(failure.kind),
            failure.path.display(),
            failure.error
        );
    }

    if !report.removed_any() {
        match model {
            Some(m) => println!(
                "No cached files or directories found for model '{}' in {}",
                m,
                report.root.display()
            ),
            None => println!(
                "No cached files or directories found in {}",
                report.root.display()
            ),
        }
    }
    Ok(())
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "directory",
        EntryKind::File => "file",
    }
}

// ── hub ──────────────────────────────────────────────────────────────────────

async fn run_hub(cli: &Cli, cmd: &HubCommand) -> Result<()> {
    match cmd {
        HubCommand::List {
            task,
            limit,
            timeout,
        } => {
            if task.trim().is_empty() {
                bail!("--task must not be empty");
            }
            let models = hub::list_models(task, *limit, *timeout)
                .await
                .with_context(|| format!("Failed to list models for task '{task}'"))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&models).context("Failed to serialise models")?
                );
            } else {
                for model in &models {
                    println!("{}", model.id);
                }
            }
            Ok(())
        }
    }
}
