//! CLI binary for colpensiones-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colpensiones_extract::{
    extract_file, write_json, ExtractError, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, PageSelection, ProgressCallback, SchemaKind,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback ────────────────────────────────────────────────────

/// Terminal progress callback: one line per page on stderr, plus a line
/// whenever a table is found to end.
struct CliProgressCallback {
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            page_started: Mutex::new(None),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages…"))
        );
    }

    fn on_page_start(&self, _page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn on_page_complete(&self, page_num: usize, total: usize, weeks_added: usize, payments_added: usize) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        let found = if weeks_added + payments_added == 0 {
            dim("-")
        } else {
            format!("{weeks_added:>3} weeks  {payments_added:>3} payments")
        };
        eprintln!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            green("✓"),
            page_num,
            total,
            found,
            dim(&format!("{elapsed_ms}ms")),
        );
    }

    fn on_table_end(&self, schema: SchemaKind, page_num: usize) {
        eprintln!("  {} {} table ends on page {}", cyan("■"), schema, page_num);
    }

    fn on_extraction_complete(&self, weeks: usize, payments: usize) {
        eprintln!(
            "{} {} weeks records, {} payment records",
            green("✔"),
            bold(&weeks.to_string()),
            bold(&payments.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to stdout
  colpensiones-extract report.pages.json

  # Write to a file, including the payment gap report
  colpensiones-extract report.pages.json --gaps -o result.json

  # Only scan pages 3 to 12, with per-page progress
  colpensiones-extract --pages 3-12 --progress report.pages.json

  # Accept payment tables with badly split headers
  colpensiones-extract --payments-threshold 6 report.pages.json

INPUT FORMAT:
  A JSON page document produced by the layout engine, either an array of
  pages or {"pages": [...]}. Each page is
    {"raw_tables": [[[cell, ...], ...], ...], "raw_text": "..."}
  where a cell is a string or null.

OUTPUT:
  {"weeks_data": [...], "summary_values": {...}, "payments_data": [...],
   "diagnostics": [...], "stats": {...}}
  plus "gap_report" when --gaps is given.

ENVIRONMENT VARIABLES:
  RUST_LOG                Override the log filter (e.g. colpensiones_extract=debug)
"#;

/// Extract contribution weeks, payments and totals from Colpensiones reports.
#[derive(Parser, Debug)]
#[command(
    name = "colpensiones-extract",
    version,
    about = "Extract contribution weeks, payments and totals from Colpensiones reports",
    long_about = "Recognise the contribution-weeks and post-1995 payment tables in a Colpensiones \
report (already reduced to table grids and page text by a layout engine), normalise Colombian \
numbers and dates, stitch the tables across pages and mine the reported totals.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON page document produced by the layout engine.
    input: PathBuf,

    /// Write the JSON result to this file instead of stdout.
    #[arg(short, long, env = "COLPENSIONES_OUTPUT")]
    output: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "COLPENSIONES_PAGES", default_value = "all")]
    pages: String,

    /// Add a "gap_report" member listing months without payments.
    #[arg(long)]
    gaps: bool,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,

    /// Weeks header labels that must match (1–9).
    #[arg(long, env = "COLPENSIONES_WEEKS_THRESHOLD", default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(1..=9))]
    weeks_threshold: u8,

    /// Payments header labels that must match (1–13).
    #[arg(long, env = "COLPENSIONES_PAYMENTS_THRESHOLD", default_value_t = 8,
          value_parser = clap::value_parser!(u8).range(1..=13))]
    payments_threshold: u8,

    /// Keep scanning for payments until the last page.
    #[arg(long)]
    no_payments_early_stop: bool,

    /// Print one line per page to stderr.
    #[arg(long, env = "COLPENSIONES_PROGRESS")]
    progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COLPENSIONES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "COLPENSIONES_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Per-page progress lines replace the INFO logs when enabled.
    let show_progress = cli.progress && !cli.quiet;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_file(&cli.input, &config)
        .with_context(|| format!("Extraction failed for {}", cli.input.display()))?;

    let document = render_document(&output, cli.gaps)?;

    if let Some(ref output_path) = cli.output {
        write_json(output_path, &document, !cli.compact).context("Failed to write result")?;
    } else {
        let json = if cli.compact {
            serde_json::to_string(&document)
        } else {
            serde_json::to_string_pretty(&document)
        }
        .context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }

    // ── Summary line ─────────────────────────────────────────────────────
    if !cli.quiet {
        let total = output
            .summary
            .weeks_total_report
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "{}  {} weeks  {} payments  total weeks {}  {}ms{}",
            if output.diagnostics.is_empty() {
                green("✔")
            } else {
                yellow("⚠")
            },
            output.weeks.len(),
            output.payments.len(),
            bold(&total),
            output.stats.duration_ms,
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
        if !output.diagnostics.is_empty() {
            eprintln!(
                "   {} diagnostics (see \"diagnostics\" in the output)",
                yellow(&output.diagnostics.len().to_string())
            );
        }
    }

    Ok(())
}

/// The output JSON, with the gap report attached when requested.
fn render_document(output: &ExtractionOutput, gaps: bool) -> Result<serde_json::Value> {
    let mut document = serde_json::to_value(output).context("Failed to serialise output")?;
    if gaps {
        let report = match output.gap_report() {
            Ok(report) => serde_json::to_value(report).context("Failed to serialise gap report")?,
            Err(ExtractError::NoPeriods) => {
                tracing::warn!("No payment periods found; gap report is null");
                serde_json::Value::Null
            }
            Err(e) => return Err(e).context("Gap analysis failed"),
        };
        if let Some(obj) = document.as_object_mut() {
            obj.insert("gap_report".to_string(), report);
        }
    }
    Ok(document)
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .pages(pages)
        .weeks_match_threshold(cli.weeks_threshold as usize)
        .payments_match_threshold(cli.payments_threshold as usize)
        .payments_early_stop(!cli.no_payments_early_stop);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
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
            bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            bail!("Invalid page range '{}-{}': start must be <= end", start, end);
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
            bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
