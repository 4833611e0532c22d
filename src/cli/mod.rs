//! Command-line entry point: parses arguments, wires a `Controller`, and
//! renders its event stream with `console`-styled output.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::{CrawlConfigBuilder, DownloadConfig};
use crate::controller::Controller;
use crate::error::CrawlResult;
use crate::events::CrawlEvent;
use crate::model::ResourceCategory;

#[derive(Parser)]
#[command(name = "sitecrawl")]
#[command(about = "Concurrent web resource crawler and downloader")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a seed URL and optionally download everything discovered
    Scrape {
        /// Seed URL to start crawling from
        url: String,
        /// Directory to store the catalog database and downloads under
        #[arg(long, default_value = ".")]
        storage_dir: PathBuf,
        /// Maximum link-following depth from the seed page
        #[arg(long, default_value_t = 3)]
        depth: u8,
        /// Number of crawl workers (clamped to [1, 20])
        #[arg(long)]
        workers: Option<usize>,
        /// Grow worker count under a deep queue backlog
        #[arg(long)]
        adaptive: bool,
        /// SOCKS5 or HTTP proxy URL
        #[arg(long)]
        proxy: Option<String>,
        /// Also download discovered resources after crawling
        #[arg(long)]
        download: bool,
        /// Number of download workers
        #[arg(long, default_value_t = 5)]
        download_workers: usize,
    },
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            url,
            storage_dir,
            depth,
            workers,
            adaptive,
            proxy,
            download,
            download_workers,
        } => run_scrape(url, storage_dir, depth, workers, adaptive, proxy, download, download_workers).await?,
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_scrape(
    url: String,
    storage_dir: PathBuf,
    depth: u8,
    workers: Option<usize>,
    adaptive: bool,
    proxy: Option<String>,
    download: bool,
    download_workers: usize,
) -> CrawlResult<()> {
    let controller = Controller::new(&storage_dir).await?;
    spawn_event_renderer(&controller);

    let mut builder = CrawlConfigBuilder::new(url.clone(), storage_dir.clone())
        .with_max_depth(depth)
        .with_adaptive_concurrency(adaptive);
    if let Some(workers) = workers {
        builder = builder.with_workers(workers);
    }
    if let Some(proxy) = proxy {
        builder = builder.with_proxy(proxy);
    }
    let config = builder.build().map_err(|e| crate::error::CrawlError::InvalidInput(e.to_string()))?;

    println!("{} crawling {url}", style("→").cyan());
    let results = controller.start_crawl(&config).await?;
    println!(
        "{} crawl finished: {} resources ({} images, {} videos, {} audios, {} hls, {} documents)",
        style("✓").green(),
        results.total_count(),
        results.images.len(),
        results.videos.len(),
        results.audios.len(),
        results.hls_playlists.len(),
        results.documents.len(),
    );

    if download {
        let download_config = DownloadConfig::new(storage_dir.join("downloads")).with_workers(download_workers);
        println!("{} downloading resources", style("→").cyan());
        let (success, total) = controller.start_download(&ResourceCategory::ALL, &download_config).await?;
        println!("{} downloaded {success}/{total} resources", style("✓").green());
    }

    Ok(())
}

fn spawn_event_renderer(controller: &Controller) {
    let mut receiver = controller.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                CrawlEvent::Started { seed_url } => log::info!("started crawl of {seed_url}"),
                CrawlEvent::Progress { done, total } => {
                    print!("\r{} {done}/{total}", style("progress").dim());
                    use std::io::Write;
                    let _ = std::io::stdout().flush();
                }
                CrawlEvent::Log { message } => log::debug!("{message}"),
                CrawlEvent::ResultsUpdated { .. } => {}
                CrawlEvent::CrawlFinished { .. } => println!(),
                CrawlEvent::DownloadFinished { .. } => println!(),
                CrawlEvent::Error { message } => eprintln!("{} {message}", style("error").red()),
            }
        }
    });
}
