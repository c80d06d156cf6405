//! CLI binary for scansplit.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SegmentationConfig`, runs one segmentation per input PDF, and prints
//! per-document results.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use scansplit::{
    inspect, segment, ProgressCallback, SegmentationConfig, SegmentationOutput,
    SegmentationProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps; NO_COLOR honoured) ───────────────────

static COLOR: Lazy<bool> = Lazy::new(|| std::env::var_os("NO_COLOR").is_none());

fn paint(code: &str, s: &str) -> String {
    if *COLOR {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}
fn green(s: &str) -> String {
    paint("32", s)
}
fn red(s: &str) -> String {
    paint("31", s)
}
fn dim(s: &str) -> String {
    paint("2", s)
}
fn bold(s: &str) -> String {
    paint("1", s)
}
fn cyan(s: &str) -> String {
    paint("36", s)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page-count progress bar plus one log line
/// per emitted document. The bar advances by each document's span size (and
/// by the blank count after the filter stage), so position tracks pages
/// placed, not documents.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_run_start` (called once the PDF's page count is known).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Opening");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the full progress-bar style once the page count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Segmenting");
    }
}

impl SegmentationProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Segmenting {total_pages} pages…"))
        ));
    }

    fn on_blank_scan_complete(&self, blank: usize, total: usize) {
        if blank > 0 {
            self.bar
                .println(format!("  {}", dim(&format!("{blank}/{total} pages blank"))));
        }
        self.bar.inc(blank as u64);
        self.bar.set_message("classifying");
    }

    fn on_document_emitted(&self, file_name: &str, first_page: usize, last_page: usize) {
        let span = if first_page == last_page {
            format!("page {}", first_page + 1)
        } else {
            format!("pages {}-{}", first_page + 1, last_page + 1)
        };
        self.bar
            .println(format!("  {} {}  {}", green("✓"), file_name, dim(&span)));
        self.bar.inc((last_page - first_page + 1) as u64);
    }

    fn on_document_failed(&self, file_name: &str, error: &str) {
        // Char-safe truncation: error text quotes Cyrillic file names.
        let msg: String = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), file_name, red(&msg)));
    }

    fn on_run_complete(&self, emitted: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} documents written",
                green("✔"),
                bold(&emitted.to_string())
            );
        } else {
            eprintln!(
                "{} {} documents written, {} failed",
                cyan("⚠"),
                bold(&emitted.to_string()),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split one scanned bundle into out/
  scansplit batch_0312.pdf -o out

  # A whole directory of bundles, one subdirectory per input, four at a time
  scansplit scans/ -o out --concurrency 4

  # Machine-readable report
  scansplit batch_0312.pdf -o out --json > report.json

  # Encrypted scan
  scansplit locked.pdf -o out --password hunter2

  # Page count and metadata only
  scansplit --inspect-only batch_0312.pdf

  # Looser blank detection for dusty scanners
  scansplit batch_0312.pdf -o out --blank-coverage 0.97

OUTPUT NAMING:
  Invoice   <invoice-tag> <number> <yyyy> <mm> <dd>.pdf      ВН 100 2024 03 15.pdf
  Waybill   <waybill-tag> <number> [<referenced invoice date>].pdf
  Other     Other_<n>.pdf, numbered in page order

  With several inputs each bundle writes into <output-dir>/<file stem>/ so
  Other_N names never collide.

ENVIRONMENT VARIABLES:
  PDFIUM_DYNAMIC_LIB_PATH  Directory containing the pdfium shared library
  RUST_LOG                 Log filter override (tracing-subscriber syntax)
  NO_COLOR                 Disable ANSI colours
"#;

/// Split scanned multi-document PDFs into per-document files.
#[derive(Parser, Debug)]
#[command(
    name = "scansplit",
    version,
    about = "Split scanned multi-document PDFs into per-document files",
    long_about = "Split a scanned PDF bundle into one file per business document — expenditure \
invoices (видаткова накладна), multi-page waybills (товарно-транспортна накладна), and \
residual pages — with exact page accounting. Classification reads the embedded text layer; \
no OCR is performed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF files, or directories to scan for *.pdf.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for the per-document PDFs.
    #[arg(short, long, env = "SCANSPLIT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// PDF user password for encrypted scans.
    #[arg(long, env = "SCANSPLIT_PASSWORD")]
    password: Option<String>,

    /// Brightness (0-255) at or above which a sample counts as white.
    #[arg(long, default_value_t = 250)]
    white_level: u8,

    /// Fraction of white samples a page must exceed to be dropped as blank.
    #[arg(long, default_value_t = 0.99)]
    blank_coverage: f64,

    /// Distinct invoice keywords needed for an invoice candidate.
    #[arg(long, default_value_t = 4)]
    invoice_signals: usize,

    /// Distinct cargo keywords needed for a waybill tail.
    #[arg(long, default_value_t = 5)]
    waybill_signals: usize,

    /// How many pages a stray waybill tail may search backward for its title.
    #[arg(long, default_value_t = 50)]
    backward_window: usize,

    /// Render width in pixels for blank-page detection.
    #[arg(long, default_value_t = 800)]
    render_width: u32,

    /// Filename tag for invoices.
    #[arg(long, default_value = "ВН")]
    invoice_tag: String,

    /// Filename tag for waybills.
    #[arg(long, default_value = "ТТН")]
    waybill_tag: String,

    /// Number of PDFs to segment concurrently (multi-input only).
    #[arg(short, long, env = "SCANSPLIT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output the structured report as JSON instead of log lines.
    #[arg(long, env = "SCANSPLIT_JSON")]
    json: bool,

    /// Print page count and metadata only, no segmentation.
    #[arg(long)]
    inspect_only: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SCANSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCANSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCANSPLIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active; the
    // bar and its per-document lines cover the same ground.
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

    let inputs = collect_inputs(&cli.inputs)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        return run_inspect(&cli, &inputs).await;
    }

    if inputs.len() == 1 {
        run_single(&cli, &inputs[0], show_progress).await
    } else {
        run_batch(&cli, &inputs).await
    }
}

/// Expand directory arguments into their PDF files, sorted, keeping explicit
/// file arguments as given.
fn collect_inputs(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(arg)
                .with_context(|| format!("Failed to read directory {}", arg.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
                })
                .collect();
            if found.is_empty() {
                anyhow::bail!("No PDF files in directory {}", arg.display());
            }
            found.sort();
            inputs.extend(found);
        } else {
            inputs.push(arg.clone());
        }
    }
    Ok(inputs)
}

/// Map CLI args to `SegmentationConfig` with the given output directory.
fn build_config(
    cli: &Cli,
    output_dir: PathBuf,
    progress: Option<ProgressCallback>,
) -> Result<SegmentationConfig> {
    let mut builder = SegmentationConfig::builder()
        .output_dir(output_dir)
        .white_level(cli.white_level)
        .blank_coverage(cli.blank_coverage)
        .invoice_signal_threshold(cli.invoice_signals)
        .waybill_signal_threshold(cli.waybill_signals)
        .backward_window(cli.backward_window)
        .render_width(cli.render_width)
        .invoice_tag(&cli.invoice_tag)
        .waybill_tag(&cli.waybill_tag)
        .concurrency(cli.concurrency);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--inspect-only`: print document facts for every input, no segmentation.
async fn run_inspect(cli: &Cli, inputs: &[PathBuf]) -> Result<()> {
    let config = build_config(cli, cli.output_dir.clone(), None)?;

    if cli.json {
        let mut entries = Vec::new();
        for input in inputs {
            let info = inspect(input, &config)
                .await
                .with_context(|| format!("Failed to inspect {}", input.display()))?;
            entries.push(serde_json::json!({
                "file": input.display().to_string(),
                "info": info,
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise metadata")?
        );
        return Ok(());
    }

    for (i, input) in inputs.iter().enumerate() {
        let info = inspect(input, &config)
            .await
            .with_context(|| format!("Failed to inspect {}", input.display()))?;
        if i > 0 {
            println!();
        }
        println!("File:         {}", input.display());
        println!("Pages:        {}", info.page_count);
        println!("PDF Version:  {}", info.pdf_version);
        if let Some(ref t) = info.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = info.author {
            println!("Author:       {}", a);
        }
        println!("Encrypted:    {}", info.encrypted);
    }
    Ok(())
}

/// Breakdown string for summary lines: `3 ВН, 2 ТТН, 1 Other`.
fn breakdown(cli: &Cli, output: &SegmentationOutput) -> String {
    format!(
        "{} {}, {} {}, {} Other",
        output.stats.invoices,
        cli.invoice_tag,
        output.stats.waybills,
        cli.waybill_tag,
        output.stats.others
    )
}

/// Segment one input into the output directory directly.
async fn run_single(cli: &Cli, input: &Path, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn SegmentationProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, cli.output_dir.clone(), progress_cb)?;
    let output = segment(input, &config)
        .await
        .with_context(|| format!("Segmentation failed for {}", input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        if !show_progress {
            // Without the live callback, print what it would have shown.
            for record in &output.documents {
                match &record.error {
                    None => eprintln!("  {} {}", green("✓"), record.file_name),
                    Some(e) => eprintln!("  {} {}  {}", red("✗"), record.file_name, red(&e.to_string())),
                }
            }
        }
        eprintln!(
            "{}  {}  {}  {}",
            if output.stats.documents_failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&format!("{} documents", output.stats.documents_emitted)),
            dim(&breakdown(cli, &output)),
            dim(&format!(
                "{} blank, {}ms → {}",
                output.stats.blank_pages,
                output.stats.total_duration_ms,
                cli.output_dir.display()
            )),
        );
    }

    if !output.stats.integrity_ok {
        anyhow::bail!(
            "Page accounting failed for {}: {}",
            input.display(),
            output
                .stats
                .integrity_detail
                .as_deref()
                .unwrap_or("unknown")
        );
    }
    Ok(())
}

/// Segment several inputs concurrently, each into `<output-dir>/<stem>/`.
async fn run_batch(cli: &Cli, inputs: &[PathBuf]) -> Result<()> {
    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let subdir = input
            .file_stem()
            .map(|stem| cli.output_dir.join(stem))
            .unwrap_or_else(|| cli.output_dir.clone());
        let config = build_config(cli, subdir, None)?;
        jobs.push((input.clone(), config));
    }

    let mut runs = stream::iter(jobs.into_iter().map(|(input, config)| async move {
        let result = segment(&input, &config).await;
        (input, config, result)
    }))
    .buffer_unordered(cli.concurrency.max(1));

    let mut fatal = 0usize;
    let mut broken = 0usize;
    let mut reports = Vec::new();

    while let Some((input, config, result)) = runs.next().await {
        match result {
            Ok(output) => {
                if !output.stats.integrity_ok {
                    broken += 1;
                }
                if !cli.quiet && !cli.json {
                    eprintln!(
                        "{} {}  {}  {}",
                        if output.stats.integrity_ok && output.stats.documents_failed == 0 {
                            green("✔")
                        } else {
                            cyan("⚠")
                        },
                        bold(&input.display().to_string()),
                        dim(&breakdown(cli, &output)),
                        dim(&format!("→ {}", config.output_dir.display())),
                    );
                    if let Some(detail) = output.stats.integrity_detail.as_deref() {
                        eprintln!("   {}", red(detail));
                    }
                }
                reports.push((input, Some(output), None));
            }
            Err(e) => {
                fatal += 1;
                if !cli.quiet && !cli.json {
                    eprintln!("{} {}  {}", red("✘"), bold(&input.display().to_string()), red(&e.to_string()));
                }
                reports.push((input, None, Some(e.to_string())));
            }
        }
    }

    if cli.json {
        let entries: Vec<serde_json::Value> = reports
            .iter()
            .map(|(input, output, error)| {
                serde_json::json!({
                    "file": input.display().to_string(),
                    "output": output,
                    "error": error,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise reports")?
        );
    }

    if fatal > 0 || broken > 0 {
        anyhow::bail!(
            "{} of {} runs failed, {} with broken page accounting",
            fatal,
            reports.len(),
            broken
        );
    }
    Ok(())
}
