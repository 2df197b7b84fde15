//! clinpdf CLI - table and figure-region extraction from clinical-study PDFs

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use clinpdf::{
    AcceptPolicy, Extractor, PageSelection, Rect, RegionDetector, VisionConfig, VisionProvider,
};

#[derive(Parser)]
#[command(name = "clinpdf")]
#[command(version)]
#[command(about = "Extract tables and figure regions from clinical-study PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables with multi-backend fallback
    Tables {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number (1-based); all pages if omitted
        #[arg(short, long)]
        page: Option<usize>,

        /// Restrict to a single extraction method (e.g. "stream", "vision")
        #[arg(short, long)]
        method: Option<String>,

        /// Discard results scoring below this confidence
        #[arg(long)]
        min_confidence: Option<f32>,

        /// Vision API key; enables the vision backend
        #[arg(long, env = "CLINPDF_VISION_API_KEY", hide_env_values = true)]
        vision_key: Option<String>,

        /// Vision inference provider
        #[arg(long, value_enum, default_value = "deepinfra")]
        vision_provider: ProviderArg,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Detect figure regions (geometry only, no rendering)
    Regions {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number (1-based); all pages if omitted
        #[arg(short, long)]
        page: Option<usize>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the registered extraction methods
    Methods,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Deepinfra,
    Parasail,
    Cirrascale,
}

impl From<ProviderArg> for VisionProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Deepinfra => VisionProvider::DeepInfra,
            ProviderArg::Parasail => VisionProvider::Parasail,
            ProviderArg::Cirrascale => VisionProvider::Cirrascale,
        }
    }
}

/// A detected region in the JSON output.
#[derive(Serialize)]
struct RegionRow {
    page: usize,
    bbox: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    method: clinpdf::DetectionMethod,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> clinpdf::Result<()> {
    match cli.command {
        Commands::Tables {
            input,
            page,
            method,
            min_confidence,
            vision_key,
            vision_provider,
            pretty,
        } => {
            let document = clinpdf::load_file(&input)?;

            let mut builder = Extractor::builder();
            if let Some(key) = vision_key {
                builder =
                    builder.with_vision(VisionConfig::new(vision_provider.into(), key));
            }
            if let Some(threshold) = min_confidence {
                builder = builder.with_policy(AcceptPolicy::MinConfidence(threshold));
            }
            let extractor = builder.build()?;

            let report = extractor
                .extract_tables(Arc::new(document), selection(page), method.as_deref())
                .await;

            if report.success {
                eprintln!(
                    "{} {} table(s) via {}",
                    "ok:".green().bold(),
                    report.tables.len(),
                    report.method_used.as_deref().unwrap_or("?")
                );
            } else {
                eprintln!(
                    "{} no tables (tried: {})",
                    "failed:".yellow().bold(),
                    report.methods_tried.join(", ")
                );
            }

            print_json(&report, pretty);
        }

        Commands::Regions { input, page, pretty } => {
            let document = clinpdf::load_file(&input)?;
            let detector = RegionDetector::new();

            let rows: Vec<RegionRow> = document
                .pages
                .iter()
                .filter(|p| selection(page).includes(p.index))
                .flat_map(|p| {
                    detector.detect(p).into_iter().map(|r| RegionRow {
                        page: p.index,
                        bbox: r.bbox,
                        caption: r.caption,
                        method: r.method,
                    })
                })
                .collect();

            eprintln!("{} {} region(s)", "ok:".green().bold(), rows.len());
            print_json(&rows, pretty);
        }

        Commands::Methods => {
            let extractor = Extractor::builder().build()?;
            let registry = extractor.orchestrator().registry();
            let methods = serde_json::json!({
                "table_methods": registry.table_names(),
                "figure_methods": registry.figure_names(),
            });
            print_json(&methods, true);
        }
    }

    Ok(())
}

/// Map a 1-based user-facing page number to the 0-based selection.
fn selection(page: Option<usize>) -> PageSelection {
    match page {
        Some(n) if n > 0 => PageSelection::single(n - 1),
        Some(_) => PageSelection::Pages(vec![]),
        None => PageSelection::All,
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match output {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{} could not serialize output: {e}", "error:".red().bold()),
    }
}
