use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use tgstats::aggregate::{aggregate, AggregateConfig, DEFAULT_TOP_N};
use tgstats::archive::RawArchive;
use tgstats::logging;
use tgstats::normalize::{normalize, MediaPolicy, NormalizerConfig, UnknownRecordPolicy};
use tgstats::progress::ScanProgress;
use tgstats::renderer;
use tgstats::report::Report;

#[derive(Parser)]
#[command(name = "tgstats")]
#[command(about = "Message statistics for a Telegram chat export", long_about = None)]
struct Cli {
    /// Path to the exported result.json. Prompted for when omitted.
    archive: Option<PathBuf>,

    /// Number of chats to rank
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Chat name or id to leave out entirely (repeatable)
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Build 30-day activity buckets per chat
    #[arg(long)]
    timebuckets: bool,

    /// How to treat messages carrying media
    #[arg(long, value_enum, default_value_t = MediaArg::Keep)]
    media: MediaArg,

    /// How to treat records that are neither messages nor service events
    #[arg(long, value_enum, default_value_t = UnknownArg::Skip)]
    unknown_records: UnknownArg,

    /// Output formats (comma-separated: md,svg,json)
    #[arg(long, default_value = "svg")]
    render: String,

    /// Output directory (defaults to current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also append logs to <DIR>/tgstats.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MediaArg {
    /// Count media messages, but leave them out of the median length
    Keep,
    /// Drop media messages from every statistic
    Exclude,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnknownArg {
    Skip,
    Keep,
}

impl Cli {
    fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            media: match self.media {
                MediaArg::Keep => MediaPolicy::KeepFlagged,
                MediaArg::Exclude => MediaPolicy::Exclude,
            },
            unknown_records: match self.unknown_records {
                UnknownArg::Skip => UnknownRecordPolicy::Skip,
                UnknownArg::Keep => UnknownRecordPolicy::Keep,
            },
        }
    }

    fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig::default()
            .with_top_n(self.top_n)
            .excluding(self.exclude.iter().cloned())
            .with_timebuckets(self.timebuckets)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let archive_path = match cli.archive {
        Some(ref path) => path.clone(),
        None => PathBuf::from(
            inquire::Text::new("Enter exported json file path:")
                .prompt()
                .context("Failed to read archive path")?
                .trim(),
        ),
    };
    if !archive_path.is_file() {
        anyhow::bail!("Invalid path: {}", archive_path.display());
    }

    logging::init_logging(
        cli.log_dir.as_deref(),
        &archive_path.display().to_string(),
    )?;

    let raw = RawArchive::load_from_file(&archive_path)?;
    let mut progress = ScanProgress::new(raw.chats.list.len());
    let normalized = normalize(&raw, &cli.normalizer_config(), &mut progress)
        .with_context(|| format!("Failed to normalize archive: {}", archive_path.display()))?;
    drop(raw);

    let report = aggregate(&normalized, &cli.aggregate_config());

    // Determine output directory
    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    for format in cli.render.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match format {
            "md" => write_output(&output_dir, &report, "md", renderer::md::render(&report)?)?,
            "svg" => write_output(&output_dir, &report, "svg", renderer::svg::render(&report)?)?,
            "json" => write_output(&output_dir, &report, "json", report.to_json()?)?,
            _ => {
                tracing::warn!("Unknown format '{}', skipping", format);
            }
        }
    }

    Ok(())
}

fn write_output(output_dir: &Path, report: &Report, extension: &str, content: String) -> Result<()> {
    let output_path = output_dir.join(report.default_filename(extension));
    std::fs::write(&output_path, content)
        .with_context(|| format!("Failed to write: {}", output_path.display()))?;
    eprintln!("Report written to: {}", output_path.display());
    Ok(())
}
