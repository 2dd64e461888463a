use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use page_loader::logging::init_logging;
use page_loader::{HttpFetcher, LoadCommand, PageLoader};

#[tokio::main]
async fn main() -> ExitCode {
    let args = LoadCommand::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: LoadCommand) -> Result<()> {
    let config = args.loader_config();
    let fetcher = HttpFetcher::new(&config).context("failed to build HTTP client")?;

    let progress = if args.verbose == 0 && !args.json {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} assets {pos}/{len} {wide_bar}") {
        progress.set_style(style);
    }

    let loader = PageLoader::new(Arc::new(fetcher), config).with_progress(progress.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = loader
        .download_with_cancel(&args.url, &args.output, cancel)
        .await
        .with_context(|| format!("could not download {}", args.url))?;
    progress.finish_and_clear();

    if report.cancelled {
        eprintln!(
            "{} download interrupted, {} asset(s) left remote",
            "warning:".yellow().bold(),
            report.failed.len()
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.page_path.display());
    }

    Ok(())
}
