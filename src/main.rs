//! Command-line entry point: read a saved forum page, decompile its posts to
//! BBCode, resolve referenced assets and print or save the result.

use clap::Parser;
use debb_cache::LinkCache;
use debb_config::Config;
use debb_engine::{Conversion, SiteContext, convert, posts};
use debb_rehost::{Offline, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Decompile rendered forum-post HTML back into BBCode.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Saved page to convert, or `-` to read from standard input.
    input: String,
    /// Write the BBCode here instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// How many posts to take from the page.
    #[arg(short, long, default_value_t = 1)]
    count: usize,
    /// URL the page was saved from. Provides the base for relative links
    /// and selects site-specific quirks.
    #[arg(long)]
    site: Option<String>,
    /// Leave asset URLs where they are.
    #[arg(long)]
    no_rehost: bool,
    /// Link cache file location.
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Configuration file location.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load(args.config.as_deref())?;
    let ctx = match &args.site {
        Some(url) => SiteContext::for_page(url),
        None => config.site.clone().unwrap_or_default(),
    };

    let page = read_input(&args.input).await?;
    let bodies = posts::extract_posts(&page, args.count);
    info!(posts = bodies.len(), "converting");
    let mut conversions: Vec<Conversion> = bodies.iter().map(|body| convert(body, &ctx)).collect();

    if !args.no_rehost {
        let cache_path = args.cache.clone().unwrap_or_else(|| config.cache_file());
        let pipeline = Pipeline::new(
            Arc::new(Offline),
            Arc::new(LinkCache::new(cache_path)),
            config.rehost.clone(),
        )?;
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, unfinished assets keep their original URLs");
                interrupt.cancel();
            }
        });
        let referer = (!ctx.target_root.is_empty()).then_some(ctx.target_root.as_str());
        for conversion in &mut conversions {
            pipeline.resolve_all(&mut conversion.urls, referer, &cancel).await;
        }
    }

    let bbcode = conversions
        .iter()
        .map(Conversion::finish)
        .collect::<Vec<_>>()
        .join("\n\n");
    write_output(args.output.as_deref(), &bbcode).await?;
    Ok(())
}

async fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut page = String::new();
        tokio::io::stdin().read_to_string(&mut page).await?;
        Ok(page)
    } else {
        tokio::fs::read_to_string(input).await
    }
}

async fn write_output(output: Option<&std::path::Path>, bbcode: &str) -> std::io::Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, format!("{bbcode}\n")).await,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bbcode.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        }
    }
}
