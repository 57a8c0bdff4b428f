use clap::Parser;
use deadclick::core::Config;
use deadclick::{ChromeBackend, Backend, DiscoveryEngine, LinkProber, Scheduler};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Discover every clickable element on a page, click each one, and report
/// which clicks are dead.
#[derive(Parser, Debug)]
#[command(name = "deadclick", version, about)]
struct Cli {
    /// URL of the page to test
    url: String,

    /// Number of parallel browser sessions
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Run the browser without a visible window
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Per-operation browser timeout and link-probe timeout, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Write the JSON report to this path instead of the default filename
    #[arg(long)]
    output: Option<PathBuf>,

    /// HEAD-probe every link href and record its HTTP status chain
    #[arg(long)]
    check_links: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    let mut config = Config::default();
    config.browser.headless = cli.headless;
    config.browser.launch_timeout_ms = cli.timeout_secs * 1000;
    config.test.concurrency = cli.concurrency;
    config.discovery.check_links = cli.check_links;

    info!(url = %cli.url, "starting clickability test");

    let mut backend = ChromeBackend::new();
    backend.launch(&config).await?;
    let backend = Arc::new(backend);

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let lead_session = backend.new_session().await?;
    let mut descriptors = match engine.discover(&*backend, &lead_session, &cli.url).await {
        Ok(descriptors) => descriptors,
        Err(err) => {
            error!(error = %err, "element discovery failed");
            return Err(err.into());
        }
    };
    info!(count = descriptors.len(), "discovered clickable elements");

    if config.discovery.check_links {
        let prober = LinkProber::new(Duration::from_secs(cli.timeout_secs))?;
        prober.annotate(&cli.url, &mut descriptors).await;
    }

    backend.close_session(lead_session).await?;

    let total_found = descriptors.len();
    let scheduler = Scheduler::new(Arc::clone(&backend), config);
    let run = scheduler.run(&cli.url, total_found, descriptors).await;

    run.print_report();
    let path = run.save_to_file(cli.output.as_deref())?;
    info!(path = %path.display(), "report written");

    Ok(())
}
