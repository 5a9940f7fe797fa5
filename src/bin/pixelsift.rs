//! CLI binary for pixelsift.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionOptions` and writes results to disk.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pixelsift::{
    convert_images, pdf_page_count, write_converted, BatchProgressCallback, ConversionOptions,
    InputFile, OutputFormat, PageSelection, ProgressCallback,
};
use std::collections::HashMap;
use std::io;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: renders a live progress bar and per-item log
/// lines using [indicatif]. The item count is not known until the batch is
/// classified (a PDF input turns into one item per page), so the bar starts
/// as a spinner and grows into a full bar in `on_batch_start`.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-item wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of items that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_batch_start` (called before any items are processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual item count.
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total} items…"))
        ));
    }

    fn on_item_start(&self, item: usize, _total: usize) {
        self.start_times.lock().unwrap().insert(item, Instant::now());
        self.bar.set_message(format!("item {item}"));
    }

    fn on_item_complete(&self, item: usize, total: usize, bytes: u64) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&item)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            item,
            total,
            dim(&format!("{:>6.1} KiB", bytes as f64 / 1024.0)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, item: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&item)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = truncate_message(error, 80);

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            red("✗"),
            item,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} items converted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} items converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Re-encode images as WebP at quality 80
  pixelsift -f webp -Q 80 photo.png scan.tiff

  # Resize to a width, keep aspect ratio
  pixelsift -f jpeg -W 1200 holiday/*.png -o out/

  # Extract pages 1-5 of a PDF as PNGs
  pixelsift -f png -p 1-5 report.pdf -o pages/

  # Compose images into a single PDF
  pixelsift -f pdf cover.png page1.jpg page2.jpg -o out/

  # Page count only, no conversion
  pixelsift --inspect report.pdf

  # Machine-readable summary
  pixelsift --json -f avif *.png > summary.json

SUPPORTED FORMATS:
  Output     Backend    Notes
  ─────────  ─────────  ─────────────────────────────────────
  jpeg (jpg) mozjpeg    progressive, optimised coding
  png        image      lossless; quality flag ignored
  webp       webp       lossy
  avif       ravif      slowest encode, smallest files
  pdf        printpdf   one document from the whole input set

  A single PDF input is always extracted to images (one per page),
  regardless of the requested output format.

ENVIRONMENT VARIABLES:
  PIXELSIFT_FORMAT        Default output format
  PIXELSIFT_QUALITY       Default quality (1-100)
  PIXELSIFT_OUTPUT_DIR    Default output directory
  PIXELSIFT_PAGES         Default page selection for PDF inputs
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

SETUP:
  No setup for image work. For PDF inputs, PDFium (~30 MB) is downloaded
  automatically on first run and cached in ~/.cache/pixelsift/. To use an
  existing copy: PDFIUM_LIB_PATH=/path/to/libpdfium pixelsift ...
"#;

/// Convert images and PDFs between formats.
#[derive(Parser, Debug)]
#[command(
    name = "pixelsift",
    version,
    about = "Convert images and PDFs between formats, in batches",
    long_about = "Batch-convert images between JPEG, PNG, WebP and AVIF, extract PDF pages \
as images, or compose an image set into a single PDF. Each input fails independently; \
one corrupt file never aborts the rest of the batch.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files (images, or a single PDF for page extraction).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format: jpeg, png, webp, avif, or pdf.
    #[arg(short, long, env = "PIXELSIFT_FORMAT", default_value = "jpeg")]
    format: String,

    /// Encode quality (1-100). Ignored by PNG.
    #[arg(short = 'Q', long, env = "PIXELSIFT_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: u32,

    /// Target width in pixels. With no height, aspect ratio is preserved.
    #[arg(short = 'W', long, env = "PIXELSIFT_WIDTH")]
    width: Option<u32>,

    /// Target height in pixels. With no width, aspect ratio is preserved.
    #[arg(short = 'H', long, env = "PIXELSIFT_HEIGHT")]
    height: Option<u32>,

    /// Page selection for PDF inputs: all, 5, 3-15, or 1,3,5,7.
    #[arg(short, long, env = "PIXELSIFT_PAGES", default_value = "all")]
    pages: String,

    /// Directory the converted files are written to.
    #[arg(short, long, env = "PIXELSIFT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print input metadata (PDF page counts) only, no conversion.
    #[arg(long)]
    inspect: bool,

    /// Output a structured JSON summary instead of human-readable text.
    #[arg(long, env = "PIXELSIFT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PIXELSIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PIXELSIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PIXELSIFT_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Load inputs ──────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let file = InputFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read input {}", path.display()))?;
        files.push(file);
    }

    // ── Ensure PDFium engine when PDF work is ahead ──────────────────────
    // On the very first PDF run, pixelsift downloads the library (~30 MB)
    // from bblanchon/pdfium-binaries to ~/.cache/pixelsift/pdfium-{VERSION}/.
    // Subsequent startups skip this block entirely (instant path check only).
    let needs_pdfium = files.iter().any(InputFile::is_pdf);
    if needs_pdfium && !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.set_message("Connecting…");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            // block_in_place keeps the reference lifetime valid (no 'static
            // requirement) while still offloading the blocking download from
            // the async executor's hot path.
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                            bar.set_prefix("PDF engine");
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            // Quiet mode — download silently; errors still propagate.
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect {
        return inspect_inputs(&cli, &files).await;
    }

    // ── Build options ────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let options = build_options(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let outcome = convert_images(&files, &options)
        .await
        .context("Conversion failed")?;

    let mut written = Vec::with_capacity(outcome.results.len());
    for record in &outcome.results {
        let path = write_converted(record, &cli.output_dir)
            .await
            .context("Failed to write output")?;
        written.push(path);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else if !cli.quiet {
        for path in &written {
            eprintln!("  {} {}", green("→"), bold(&path.display().to_string()));
        }
        for warning in &outcome.warnings {
            eprintln!("  {} {}", yellow("⚠"), warning);
        }
        for error in &outcome.errors {
            eprintln!("  {} {}", red("✗"), error);
        }
        if !show_progress {
            eprintln!(
                "Converted {}/{} in {}ms",
                outcome.stats.converted, outcome.stats.total_files, outcome.stats.duration_ms
            );
        }
    }

    if !outcome.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print per-input metadata: size, MIME, and PDF page counts.
async fn inspect_inputs(cli: &Cli, files: &[InputFile]) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Inspection {
        name: String,
        mime: String,
        size: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pages: Option<usize>,
    }

    let mut report = Vec::with_capacity(files.len());
    for file in files {
        let pages = if file.is_pdf() {
            Some(
                pdf_page_count(file)
                    .await
                    .with_context(|| format!("Failed to inspect {}", file.name))?,
            )
        } else {
            None
        };
        report.push(Inspection {
            name: file.name.clone(),
            mime: file.mime.clone(),
            size: file.size(),
            pages,
        });
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise inspection")?
        );
    } else {
        for entry in &report {
            println!("File:   {}", entry.name);
            println!("Type:   {}", entry.mime);
            println!("Size:   {} bytes", entry.size);
            if let Some(pages) = entry.pages {
                println!("Pages:  {pages}");
            }
            println!();
        }
    }
    Ok(())
}

/// Map CLI args to `ConversionOptions`.
fn build_options(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionOptions> {
    let format = OutputFormat::parse(&cli.format).context("Invalid --format")?;
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionOptions::builder()
        .format(format)
        .quality(cli.quality as f32 / 100.0)
        .pages(pages);

    if let Some(w) = cli.width {
        builder = builder.width(w);
    }
    if let Some(h) = cli.height {
        builder = builder.height(h);
    }
    if let Some(cb) = progress {
        builder = builder.progress(cb);
    }

    builder.build().context("Invalid options")
}

/// Truncate a long message to `max_chars` characters, ellipsis included.
///
/// Counts characters rather than bytes so a multi-byte name (accented
/// file names in error messages, say) never lands the cut inside a
/// character.
fn truncate_message(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
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
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        for &p in &pages {
            if p < 1 {
                anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
            }
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
