//! CLI binary for ocr-translate-pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnnotateConfig`, writes the annotated PDF and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr_translate_pdf::pipeline::assemble::write_pdf_atomically;
use ocr_translate_pdf::{
    annotate, AnnotateConfig, AnnotateProgressCallback, AnnotationStats, FontSource, PageResult,
    PageSelection, ProgressCallback, TranslatorBackend,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page and per failed block.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    failed_blocks: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            failed_blocks: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn page_elapsed_ms(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl AnnotateProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Annotating {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, blocks: usize) {
        let elapsed_ms = self.page_elapsed_ms(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{blocks:>4} blocks")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_block_error(&self, page_num: usize, block: usize, error: &str) {
        self.failed_blocks.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3} block {:<3} {}",
            red("✗"),
            page_num,
            block,
            red(&msg)
        ));
    }

    fn on_run_complete(&self, total_pages: usize, failed_blocks: usize) {
        self.bar.finish_and_clear();
        if failed_blocks == 0 {
            eprintln!("{} {} pages annotated", green("✔"), bold(&total_pages.to_string()));
        } else {
            eprintln!(
                "{} {} pages annotated  ({} blocks failed to translate)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                red(&failed_blocks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Japanese scan → English overlay (Google, no API key)
  pdf-translate scan.pdf -o scan.en.pdf

  # Selected pages, higher resolution for small print
  pdf-translate --pages 2-4 --dpi 250 scan.pdf -o part.pdf

  # Chinese → English through an LLM provider
  pdf-translate --ocr-lang chi_sim --source-lang zh --backend llm \
      --provider openai --model gpt-4.1-mini scan.pdf

  # Fail when any block cannot be translated; JSON report on stdout
  pdf-translate --strict --json scan.pdf -o out.pdf > report.json

REQUIREMENTS:
  tesseract with the OCR language pack   (apt install tesseract-ocr-jpn)
  libpdfium                              (https://github.com/bblanchon/pdfium-binaries)

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium
  FONT_AUTO_PATH          Existing overlay font; skips the download
  FONT_AUTO_CACHE_DIR     Override the font cache directory
  OPENAI_API_KEY          (and other provider keys) for --backend llm
  EDGEQUAKE_LLM_PROVIDER  Provider for --backend llm when --provider is unset
  EDGEQUAKE_MODEL         Model for --backend llm when --model is unset
"#;

/// Box and translate foreign-language text in scanned PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Box and translate foreign-language text in scanned PDFs",
    long_about = "Render each page of a PDF, find text blocks with tesseract OCR, translate \
every block and write a new PDF with each block outlined and its translation drawn above it.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output PDF path. Default: <input stem>.translated.pdf in the current directory.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF_TRANSLATE_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Pages processed at once. Output order is always page order.
    #[arg(short, long, env = "PDF_TRANSLATE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_TRANSLATE_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_TRANSLATE_PASSWORD")]
    password: Option<String>,

    /// Language code of the scanned text.
    #[arg(long, env = "PDF_TRANSLATE_SOURCE_LANG", default_value = "ja")]
    source_lang: String,

    /// Language code to translate into.
    #[arg(long, env = "PDF_TRANSLATE_TARGET_LANG", default_value = "en")]
    target_lang: String,

    /// Tesseract language pack(s), e.g. jpn or jpn+eng.
    #[arg(long, env = "PDF_TRANSLATE_OCR_LANG", default_value = "jpn")]
    ocr_lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PDF_TRANSLATE_PSM", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract: String,

    /// Translation backend.
    #[arg(long, env = "PDF_TRANSLATE_BACKEND", value_enum, default_value = "google")]
    backend: BackendArg,

    /// LLM provider for --backend llm (openai, anthropic, gemini, ollama, …).
    #[arg(long, env = "PDF_TRANSLATE_PROVIDER")]
    provider: Option<String>,

    /// LLM model for --backend llm.
    #[arg(long, env = "PDF_TRANSLATE_MODEL")]
    model: Option<String>,

    /// TrueType/OpenType font for the translated text. Default: cached Noto Sans CJK JP.
    #[arg(long, env = "PDF_TRANSLATE_FONT")]
    font: Option<PathBuf>,

    /// Download URL for the overlay font when --font is not given.
    #[arg(long, env = "PDF_TRANSLATE_FONT_URL")]
    font_url: Option<String>,

    /// Fail instead of drawing boxes only when the font cannot be downloaded.
    #[arg(long, env = "PDF_TRANSLATE_REQUIRE_FONT")]
    require_font: bool,

    /// Overlay text height in pixels.
    #[arg(long, env = "PDF_TRANSLATE_FONT_SIZE", default_value_t = 20.0)]
    font_size: f32,

    /// Exit with an error when any block fails to translate. No PDF is written.
    #[arg(long, env = "PDF_TRANSLATE_STRICT")]
    strict: bool,

    /// Print a JSON report (stats and per-page blocks) on stdout.
    #[arg(long, env = "PDF_TRANSLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_TRANSLATE_QUIET")]
    quiet: bool,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "PDF_TRANSLATE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call translation timeout in seconds.
    #[arg(long, env = "PDF_TRANSLATE_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Google,
    Llm,
}

/// `--json` report.
#[derive(Serialize)]
struct Report<'a> {
    output: &'a Path,
    stats: &'a AnnotationStats,
    pages: &'a [PageResult],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Fetch the overlay font up front so the download gets its own bar ──
    let font_source = match cli.font_url {
        Some(ref url) => FontSource::new(url.clone(), font_filename_from_url(url)),
        None => FontSource::default(),
    };
    if cli.font.is_none() && !cli.quiet && !font_auto::is_font_cached(&font_source) {
        prefetch_font(&font_source, cli.require_font)?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn AnnotateProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, font_source, progress_cb)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    // ── Run ──────────────────────────────────────────────────────────────
    let mut output = annotate(&cli.input, &config)
        .await
        .context("Annotation failed")?;
    if cli.strict {
        output = output
            .into_result()
            .context("Some text blocks could not be translated")?;
    }

    write_pdf_atomically(&output_path, &output.pdf)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let stats = &output.stats;
    if cli.json {
        let report = Report {
            output: &output_path,
            stats,
            pages: &output.pages,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }

    if !cli.quiet {
        if !stats.font_available {
            eprintln!(
                "{} overlay font unavailable: boxes drawn without translated text",
                cyan("⚠")
            );
        }
        eprintln!(
            "{}  {} pages  {}/{} blocks translated  {}ms  →  {}",
            if stats.failed_blocks == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_pages,
            stats.translated_blocks,
            stats.total_blocks,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if stats.failed_blocks > 0 {
            eprintln!("   {}", dim(&format!("{} blocks failed to translate", stats.failed_blocks)));
        }
    }

    Ok(())
}

/// Download the font with a byte-level progress bar.
///
/// A failure is only fatal with `--require-font`; otherwise the library
/// falls back to drawing boxes without text.
fn prefetch_font(source: &FontSource, require_font: bool) -> Result<()> {
    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("Overlay font");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    let result = tokio::task::block_in_place(|| {
        font_auto::ensure_font(
            source,
            Some(&|downloaded, total| {
                if let Some(t) = total {
                    if bar.length().unwrap_or(0) != t {
                        bar.set_length(t);
                    }
                }
                bar.set_position(downloaded);
            }),
        )
    });

    match result {
        Ok(_) => {
            dl_bar.finish_with_message("ready ✓");
            Ok(())
        }
        Err(e) if require_font => {
            dl_bar.abandon();
            Err(e).context("Failed to download the overlay font")
        }
        Err(e) => {
            dl_bar.abandon_with_message("unavailable");
            eprintln!("{} {}", cyan("⚠"), e);
            Ok(())
        }
    }
}

/// Map CLI args to `AnnotateConfig`.
fn build_config(
    cli: &Cli,
    font_source: FontSource,
    progress: Option<ProgressCallback>,
) -> Result<AnnotateConfig> {
    let pages = parse_pages(&cli.pages)?;
    let backend = match cli.backend {
        BackendArg::Google => TranslatorBackend::Google,
        BackendArg::Llm => TranslatorBackend::Llm {
            provider: cli.provider.clone(),
            model: cli.model.clone(),
        },
    };

    let mut builder = AnnotateConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .pages(pages)
        .languages(&cli.source_lang, &cli.target_lang)
        .ocr_language(&cli.ocr_lang)
        .ocr_psm(cli.psm)
        .tesseract_cmd(&cli.tesseract)
        .backend(backend)
        .font_source(font_source)
        .require_font(cli.require_font)
        .font_size(cli.font_size)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<stem>.translated.pdf` in the current directory, for paths and URLs alike.
fn default_output_path(input: &str) -> PathBuf {
    let last = input
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");
    let last = last.split(['?', '#']).next().unwrap_or("");
    let stem = Path::new(last)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    PathBuf::from(format!("{stem}.translated.pdf"))
}

/// Cache file name for a custom font URL.
fn font_filename_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "overlay-font.ttf".to_string())
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5)));
        assert!(matches!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15)));
        match parse_pages("1,3,5").unwrap() {
            PageSelection::Set(v) => assert_eq!(v, vec![1, 3, 5]),
            other => panic!("unexpected selection: {other:?}"),
        }
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("1,x").is_err());
        assert!(parse_pages("0,2").is_err());
    }

    #[test]
    fn default_output_names() {
        assert_eq!(default_output_path("scans/menu.pdf"), PathBuf::from("menu.translated.pdf"));
        assert_eq!(
            default_output_path("https://example.org/docs/flyer.pdf?dl=1"),
            PathBuf::from("flyer.translated.pdf")
        );
        assert_eq!(default_output_path("https://example.org/"), PathBuf::from("example.translated.pdf"));
    }

    #[test]
    fn font_filename_from_custom_url() {
        assert_eq!(
            font_filename_from_url("https://fonts.example/a/Some-Font.otf?raw=true"),
            "Some-Font.otf"
        );
        assert_eq!(font_filename_from_url("https://fonts.example/"), "overlay-font.ttf");
    }

    #[test]
    fn cli_defaults_build_a_valid_config() {
        let cli = Cli::parse_from(["pdf-translate", "scan.pdf"]);
        let config = build_config(&cli, FontSource::default(), None).unwrap();
        assert_eq!(config.dpi, 150);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.source_lang, "ja");
        assert_eq!(config.target_lang, "en");
        assert_eq!(config.backend, TranslatorBackend::Google);
    }
}
