use anyhow::Context;
use clap::{Parser, Subcommand};
use delivery_merge::config::PipelineConfig;
use delivery_merge::constants::DEFAULT_LOG_DIR;
use delivery_merge::ingestion::{load_delimited, ExtractionMode};
use delivery_merge::join::DuplicateKeyPolicy;
use delivery_merge::logging;
use delivery_merge::observer::TracingObserver;
use delivery_merge::pipeline::MergePipeline;
use delivery_merge::report::{render_overview, render_statistics};
use delivery_merge::stats::DatasetStatistics;
use std::path::PathBuf;
use tracing::error;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "delivery_merge")]
#[command(about = "Merge food-delivery orders, users and restaurants into one dataset")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the three sources, join them and write the merged dataset
    Merge {
        /// Directory holding the inputs; the output is written there too
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// TOML file with pipeline settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file name, relative to the base directory
        #[arg(long)]
        output: Option<String>,
        /// How restaurant INSERT statements are recognized
        #[arg(long, value_enum)]
        extraction: Option<ExtractionMode>,
        /// What joins do with duplicate keys
        #[arg(long, value_enum)]
        duplicate_keys: Option<DuplicateKeyPolicy>,
        /// Also write the run summary as JSON to this path
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Print statistics for an existing merged dataset
    Describe {
        /// Delimited file with a header row
        #[arg(long)]
        input: PathBuf,
        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            base_dir,
            config,
            output,
            extraction,
            duplicate_keys,
            summary_json,
        } => {
            let mut settings = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            settings.apply_env();
            settings.apply_overrides(base_dir, output, extraction, duplicate_keys);
            settings.validate()?;

            let _guard = logging::init_logging(&settings.log_dir);
            println!("🔄 Merging datasets from {}", settings.base_dir.display());

            let observer = TracingObserver;
            let pipeline = MergePipeline::new(settings, &observer);
            let result = match pipeline.run() {
                Ok(result) => result,
                Err(e) => {
                    error!("Merge run failed: {}", e);
                    println!("❌ Merge run failed: {}", e);
                    return Err(e.into());
                }
            };

            println!("{}", render_overview(&result.merged, &result.statistics, PREVIEW_ROWS));
            println!("\n✓ Final dataset saved to: {}", result.output.path.display());
            println!(
                "  File size: {:.2} MB",
                result.output.bytes as f64 / (1024.0 * 1024.0)
            );
            if result.restaurants_skipped > 0 {
                println!(
                    "⚠️  {} restaurant INSERT statements were skipped",
                    result.restaurants_skipped
                );
            }
            println!("\n{}", render_statistics(&result.statistics));

            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing summary to {}", path.display()))?;
                println!("💾 Run summary saved to {}", path.display());
            }
            println!("✅ Data merging complete (run {})", result.run_id);
        }
        Commands::Describe { input, delimiter } => {
            let _guard = logging::init_logging(&PathBuf::from(DEFAULT_LOG_DIR));
            let delimiter = PipelineConfig {
                delimiter,
                ..PipelineConfig::default()
            }
            .delimiter_byte()?;
            let table = load_delimited(&input, delimiter)?;
            let stats = DatasetStatistics::compute(&table);
            println!("{}", render_overview(&table, &stats, PREVIEW_ROWS));
            println!("\n{}", render_statistics(&stats));
        }
    }

    Ok(())
}
