mod cli;
mod config;
mod feeds;
mod models;
mod services;
mod symbols;
mod timeframe;

use cli::{CliArgs, CliError, Mode, RunPlan};
use config::{AppConfig, ConfigError};
use feeds::{CoinGeckoClient, CyclesClient};
use services::price_service::{self, PricePublisher, StreamMapping};
use services::rate_limiter::RateLimiter;
use std::future::Future;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use symbols::TargetSymbols;
use tokio::{signal, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("CRYPTOCURRENCY PRICE TO CYCLES APP");

    let args = match CliArgs::parse(std::env::args()) {
        Ok(args) => args,
        Err(CliError::Usage(e)) => e.exit(),
        Err(e @ CliError::InvalidTimeframe(_)) => {
            error!("{}", e);
            error!("Valid examples: --2m, --5m, --15m, --1h, --4h, --1d");
            error!("Minimum interval is 2 minutes (--2m)");
            return ExitCode::FAILURE;
        }
    };

    let plan = match resolve_plan(args).await {
        Ok(plan) => plan,
        Err(e) => {
            error!("Could not read interactive input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if plan.interval != timeframe::IntervalConfig::default() {
        info!("Using custom timeframe: {}", plan.interval);
    }
    if !plan.targets.is_empty() {
        info!("Target symbols: {}", plan.targets);
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(plan, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Fall back to the interactive prompt only when attached to a terminal
async fn resolve_plan(args: CliArgs) -> io::Result<RunPlan> {
    if !args.needs_prompt() || !io::stdin().is_terminal() {
        return Ok(args.into_plan());
    }

    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        args.prompt(&mut input, &mut output)
    })
    .await
    .map_err(io::Error::other)?
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

async fn run(plan: RunPlan, config: AppConfig) -> Result<ExitCode, StartupError> {
    let source = CoinGeckoClient::new(config.markets_url.clone(), config.http_timeout)?;

    match plan.mode {
        Mode::Preview => Ok(run_preview(&source, &plan.targets).await),
        Mode::SingleRun => {
            let publisher = build_publisher(source, &config, plan.targets)?;
            let report = publisher.run_once().await;
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Mode::Continuous => {
            let publisher = build_publisher(source, &config, plan.targets)?;

            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(signal::ctrl_c(), cancel.clone()));

            info!("Press Ctrl+C to stop");
            let mut limiter = RateLimiter::new(Instant::now());
            publisher
                .run_continuous(&plan.interval, &mut limiter, &cancel)
                .await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Cancel once the signal arrives. If the listener fails, keep running.
async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Received Ctrl+C");
            cancel.cancel();
        }
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}

/// Nothing is delivered without a usable key
fn build_publisher(
    source: CoinGeckoClient,
    config: &AppConfig,
    targets: TargetSymbols,
) -> Result<PricePublisher<CoinGeckoClient, CyclesClient>, StartupError> {
    let api_key = config.api_key()?;
    info!("Configuration validated");
    info!("Using Cycles API key: {}", api_key.masked());

    let sink = CyclesClient::new(config.webhook_url.clone(), api_key, config.http_timeout)?;
    Ok(PricePublisher::new(source, sink, targets))
}

async fn run_preview(source: &CoinGeckoClient, targets: &TargetSymbols) -> ExitCode {
    match price_service::preview(source, targets).await {
        Ok(mappings) if mappings.is_empty() => {
            info!("No matching cryptocurrencies found!");
            ExitCode::SUCCESS
        }
        Ok(mappings) => {
            print_mappings(&mappings);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error fetching crypto prices: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_mappings(mappings: &[StreamMapping]) {
    println!("\nWill create the following stream mappings:");
    println!("{}", "-".repeat(60));
    for m in mappings {
        println!(
            "{:<20} ({:<6}) -> {:<15} (${})",
            m.name,
            m.symbol,
            m.stream_id,
            format_usd(m.price)
        );
    }
    println!("{}", "-".repeat(60));
}

/// Two decimals with thousands separators, e.g. `65,000.50`
fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}
