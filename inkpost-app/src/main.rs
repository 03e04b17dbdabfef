use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use inkpost_common::observability::{init_logging, LogConfig};
use inkpost_common::InkpostError;
use inkpost_config::{InkpostConfigLoader, PlatformDetails};
use inkpost_driver::{BrowserOptions, WebDriverSession};
use inkpost_engine::pipeline::{BatchPipeline, Pacing, PublishLog};
use inkpost_engine::session::SessionSignal;
use inkpost_engine::TypingMode;
use inkpost_platforms::{csdn, zhihu, FlowOptions, PlatformFlow, PlatformSpec};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod posts;

/// Batch-publish markdown posts through a real browser session.
#[derive(Parser, Debug)]
#[command(name = "inkpost", version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, default_value = "inkpost.yaml")]
    config: PathBuf,

    /// Platform entry id to publish to
    #[arg(long)]
    platform: String,

    /// Override the posts directory from the config
    #[arg(long)]
    posts_dir: Option<PathBuf>,

    /// Run the browser headless (visible by default so logins are possible)
    #[arg(long)]
    headless: bool,

    /// Seconds to wait for an interactive login
    #[arg(long)]
    login_timeout: Option<u64>,

    /// Perform every step except the final publish confirmation
    #[arg(long)]
    dry_run: bool,

    /// WebDriver endpoint override
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Mirror log output to stderr
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("inkpost: {e:#}");
            let precondition = e.downcast_ref::<InkpostError>().is_some_and(|ie| {
                matches!(
                    ie,
                    InkpostError::Precondition(_) | InkpostError::Config(_)
                )
            });
            if precondition {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(LogConfig {
        emit_stderr: cli.verbose,
        ..Default::default()
    })?;

    let cfg = InkpostConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .map_err(|e| InkpostError::config(e.to_string()))?;

    let entry = cfg.platform(&cli.platform).ok_or_else(|| {
        InkpostError::precondition(format!(
            "platform '{}' is not configured or is disabled",
            cli.platform
        ))
    })?;
    let (spec, signals, tags) = select_platform(&entry.details);

    let posts_dir = cli
        .posts_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.batch.posts_dir));
    let items = posts::discover(&posts_dir)?;
    if items.is_empty() {
        return Err(InkpostError::precondition(format!(
            "no markdown posts found in {}",
            posts_dir.display()
        ))
        .into());
    }
    info!(count = items.len(), dir = %posts_dir.display(), "posts discovered");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received; finishing up");
            signal_cancel.cancel();
        }
    });

    // Everything that can fail without a browser goes first; once the
    // session exists, the pipeline owns its release on error paths.
    let log = PublishLog::open(&cfg.batch.publish_log)?;

    let driver = WebDriverSession::connect(&BrowserOptions {
        webdriver_url: cli
            .webdriver_url
            .unwrap_or_else(|| cfg.browser.webdriver_url.clone()),
        headless: cli.headless || cfg.browser.headless,
        user_data_dir: cfg.browser.user_data_dir.clone(),
    })
    .await?;

    let login_timeout = Duration::from_secs(
        cli.login_timeout.unwrap_or(cfg.batch.login_timeout_secs),
    );
    let flow = PlatformFlow::new(
        spec,
        signals,
        FlowOptions {
            tags,
            credentials_dir: PathBuf::from(&cfg.batch.credentials_dir),
            diagnostics_dir: PathBuf::from(&cfg.batch.diagnostics_dir),
            login_timeout,
            dry_run: cli.dry_run,
        },
    );

    let pacing = if cli.dry_run {
        Pacing::none()
    } else {
        Pacing {
            after_success: (
                Duration::from_secs(cfg.batch.pacing.success_min_secs),
                Duration::from_secs(cfg.batch.pacing.success_max_secs),
            ),
            after_failure: (
                Duration::from_secs(cfg.batch.pacing.failure_min_secs),
                Duration::from_secs(cfg.batch.pacing.failure_max_secs),
            ),
        }
    };

    let mut pipeline = BatchPipeline::new(&driver, &flow, log)
        .with_pacing(pacing)
        .with_cancellation(cancel.clone())
        .dry_run(cli.dry_run);
    let summary = pipeline.run(&items).await?;

    let interrupted = cancel.is_cancelled();
    if !interrupted {
        // The pipeline closes the session on interrupt and on error; the
        // clean path is ours.
        let _ = inkpost_engine::Driver::close(&driver).await;
    }

    println!(
        "{} published, {} failed, {} skipped{}",
        summary.succeeded,
        summary.failed,
        summary.skipped,
        if interrupted { " (interrupted)" } else { "" }
    );
    for (id, error) in &summary.failures {
        println!("  {id}: {error}");
    }

    if summary.all_succeeded() && !interrupted {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn select_platform(
    details: &PlatformDetails,
) -> (
    PlatformSpec,
    Vec<Box<dyn SessionSignal<WebDriverSession>>>,
    Vec<String>,
) {
    match details {
        PlatformDetails::Csdn { config } => (csdn::spec(), csdn::signals(), config.tags.clone()),
        PlatformDetails::Zhihu { config } => {
            let mut spec = zhihu::spec();
            if !config.per_char_typing {
                spec.body_typing = TypingMode::Bulk;
            }
            (spec, zhihu::signals(), Vec::new())
        }
    }
}
