use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubesum::cli::{Cli, Commands};
use tubesum::config::Config;
use tubesum::summarize::{summarize_video, HuggingFaceSummarizer, Outcome, SummaryLength};
use tubesum::transcript::{Acquisition, TranscriptPipeline};
use tubesum::{output, utils};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "tubesum=debug" } else { "tubesum=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Summarize {
            url,
            language,
            min_length,
            max_length,
            format,
            output: output_path,
        } => {
            let pipeline = build_pipeline(&config, language)?;
            let length = SummaryLength::new(
                min_length.unwrap_or(config.summarizer.min_length),
                max_length.unwrap_or(config.summarizer.max_length),
            )?;
            let summarizer = HuggingFaceSummarizer::new(&config.summarizer)?;

            tracing::info!("Starting summary for URL: {}", url);
            let started = Instant::now();
            let progress = spinner(cli.quiet)?;
            let outcome = summarize_video(&pipeline, &summarizer, &url, length, &progress).await;
            progress.finish_and_clear();

            match outcome? {
                Outcome::Summary(summary) => {
                    match output_path {
                        Some(path) => {
                            output::save_to_file(&summary, &path, &format).await?;
                            println!("Summary saved to: {}", path.display());
                        }
                        None => output::print_to_console(&summary, &format)?,
                    }
                    tracing::info!(
                        "Finished in {}",
                        utils::format_duration(started.elapsed().as_secs_f64())
                    );
                }
                Outcome::NoTranscript => output::print_no_transcript(),
            }
        }
        Commands::Transcript {
            url,
            language,
            output: output_path,
        } => {
            let pipeline = build_pipeline(&config, language)?;

            let progress = spinner(cli.quiet)?;
            progress.set_message("Fetching transcript...");
            let acquisition = pipeline.acquire(&url).await;
            progress.finish_and_clear();

            match acquisition? {
                Acquisition::Transcript(transcript) => {
                    output::write_transcript(&transcript, output_path.as_deref()).await?;
                    if let Some(path) = output_path {
                        println!("Transcript saved to: {}", path.display());
                    }
                }
                Acquisition::Unavailable => output::print_no_transcript(),
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = config.save(cli.config.as_deref()).await?;
                println!("Configuration written to: {}", path.display());
            }
        }
        Commands::Check => {
            let missing = utils::check_dependencies(&config).await;
            if missing.is_empty() {
                println!("All external tools are available.");
            } else {
                eprintln!("⚠️  Missing dependencies:");
                for dep in missing {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (The captions service still works; only the fallback is affected)");
            }
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config, language: Option<String>) -> Result<TranscriptPipeline> {
    let pipeline = TranscriptPipeline::from_config(config)?;
    Ok(match language {
        Some(language) => pipeline.with_language(language),
        None => pipeline,
    })
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}
