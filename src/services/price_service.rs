use crate::feeds::{DeliveryError, FetchError, PriceSource, StreamSink};
use crate::models::StreamId;
use crate::services::rate_limiter::{RateDecision, RateLimiter};
use crate::symbols::{join, TargetSymbols};
use crate::timeframe::IntervalConfig;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How one fetch -> filter -> deliver pass ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Delivered {
        succeeded: usize,
        attempted: usize,
        failures: Vec<DeliveryError>,
    },
    FetchFailed(FetchError),
    NoMatchingSymbols {
        missing: BTreeSet<String>,
    },
    EmptySnapshot,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered {
                succeeded,
                attempted,
                failures,
            } => write!(
                f,
                "{}/{} delivered, {} failed",
                succeeded,
                attempted,
                failures.len()
            ),
            Self::FetchFailed(e) => write!(f, "fetch failed: {}", e),
            Self::NoMatchingSymbols { missing } => {
                write!(f, "no matching symbols (missing: {})", join(missing))
            }
            Self::EmptySnapshot => write!(f, "empty snapshot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub found: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn from_outcome(outcome: CycleOutcome) -> Self {
        Self {
            found: BTreeSet::new(),
            missing: BTreeSet::new(),
            outcome,
        }
    }

    /// At least one data point reached the sink
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Delivered { succeeded, .. } if succeeded > 0)
    }

    /// Whether the cycle spent a unit of upstream rate budget
    pub fn consumed_request(&self) -> bool {
        match &self.outcome {
            CycleOutcome::FetchFailed(e) => e.reached_api(),
            _ => true,
        }
    }
}

/// Totals for a continuous run, returned once it has stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub successful_cycles: u64,
}

/// A quote as it would be forwarded, for preview output
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMapping {
    pub name: String,
    pub symbol: String,
    pub stream_id: StreamId,
    pub price: f64,
}

/// ISO-8601 local time shared by every point in one cycle
pub fn cycle_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Moves prices from a source to a sink, once or on an interval
pub struct PricePublisher<P, S> {
    source: P,
    sink: S,
    targets: TargetSymbols,
}

impl<P: PriceSource, S: StreamSink> PricePublisher<P, S> {
    pub fn new(source: P, sink: S, targets: TargetSymbols) -> Self {
        Self {
            source,
            sink,
            targets,
        }
    }

    /// Fetch one snapshot, filter it and deliver every retained quote
    pub async fn run_cycle(&self) -> CycleReport {
        info!("Fetching crypto prices...");

        let quotes = match self.source.fetch().await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!("Error fetching crypto prices: {}", e);
                return CycleReport::from_outcome(CycleOutcome::FetchFailed(e));
            }
        };

        if !self.targets.is_empty() {
            info!("Filtering for symbols: {}", self.targets);
        }
        let filtered = self.targets.filter(&quotes);
        if !filtered.missing.is_empty() {
            warn!("Symbols not found in API data: {}", join(&filtered.missing));
        }
        if !filtered.found.is_empty() {
            info!("Found symbols: {}", join(&filtered.found));
        }

        let mut report = CycleReport {
            found: filtered.found,
            missing: filtered.missing,
            outcome: CycleOutcome::EmptySnapshot,
        };

        if filtered.quotes.is_empty() {
            if self.targets.is_empty() {
                warn!("Market data snapshot was empty");
            } else {
                warn!("No matching cryptocurrencies found!");
                report.outcome = CycleOutcome::NoMatchingSymbols {
                    missing: report.missing.clone(),
                };
            }
            return report;
        }

        let timestamp = cycle_timestamp();
        let attempted = filtered.quotes.len();
        let mut succeeded = 0;
        let mut failures = Vec::new();

        info!("Processing {} cryptocurrencies", attempted);

        for quote in &filtered.quotes {
            let stream_id = quote.stream_id();
            info!(
                "Processing {} ({}) -> {}",
                quote.name,
                quote.symbol.to_uppercase(),
                stream_id
            );

            match self.sink.send(&stream_id, quote.price, &timestamp).await {
                Ok(()) => {
                    info!("Sent {}: ${}", stream_id, quote.price);
                    succeeded += 1;
                }
                Err(e) => {
                    error!("{} (asset {})", e, quote.id);
                    failures.push(e);
                }
            }
        }

        info!(
            "Processed {}/{} cryptocurrencies successfully",
            succeeded, attempted
        );

        report.outcome = CycleOutcome::Delivered {
            succeeded,
            attempted,
            failures,
        };
        report
    }

    /// Single-shot mode: one cycle, no sleeping and no rate bookkeeping
    pub async fn run_once(&self) -> CycleReport {
        info!("Running single test...");
        if !self.targets.is_empty() {
            info!("Testing symbols: {}", self.targets);
        }

        let report = self.run_cycle().await;
        if report.is_success() {
            info!("Test completed successfully: {}", report.outcome);
            if !report.found.is_empty() {
                info!("Tested symbols: {}", join(&report.found));
            }
        } else {
            warn!("Test failed: {}", report.outcome);
        }
        report
    }

    /// Run cycles every `interval` until `cancel` fires.
    ///
    /// The token is checked before each step and raced against every
    /// network call and sleep, so an in-flight cycle is abandoned as soon
    /// as cancellation arrives.
    pub async fn run_continuous(
        &self,
        interval: &IntervalConfig,
        limiter: &mut RateLimiter,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        info!("Starting Crypto Price Monitor...");
        if self.targets.is_empty() {
            info!("Monitoring all top cryptocurrencies");
        } else {
            info!("Monitoring specific symbols: {}", self.targets);
        }
        info!("Updating prices every {}", interval);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let RateDecision::Cooling(pause) = limiter.check(Instant::now()) {
                warn!(
                    "Approaching rate limit, pausing for {} seconds...",
                    pause.as_secs()
                );
                if !sleep_unless_cancelled(pause, cancel).await {
                    break;
                }
                limiter.reset(Instant::now());
                continue;
            }

            let report = tokio::select! {
                () = cancel.cancelled() => break,
                report = self.run_cycle() => report,
            };

            summary.cycles += 1;
            if report.is_success() {
                summary.successful_cycles += 1;
            }
            if report.consumed_request() {
                limiter.record_request();
            }

            info!(
                "Waiting {}... (Requests this minute: {}/{})",
                interval,
                limiter.state().request_count,
                limiter.ceiling()
            );
            if !sleep_unless_cancelled(interval.duration(), cancel).await {
                break;
            }
        }

        info!("Stopping Crypto Price Monitor...");
        info!(
            "Shutdown complete ({} cycles, {} successful)",
            summary.cycles, summary.successful_cycles
        );
        summary
    }
}

/// Fetch once and show which streams would be written, without sending anything
pub async fn preview<P: PriceSource>(
    source: &P,
    targets: &TargetSymbols,
) -> Result<Vec<StreamMapping>, FetchError> {
    info!("Previewing stream mappings...");

    let quotes = source.fetch().await?;
    if !targets.is_empty() {
        info!("Filtering for symbols: {}", targets);
    }

    let filtered = targets.filter(&quotes);
    if !filtered.missing.is_empty() {
        warn!("Symbols not found in API data: {}", join(&filtered.missing));
    }

    Ok(filtered
        .quotes
        .into_iter()
        .map(|q| StreamMapping {
            stream_id: q.stream_id(),
            symbol: q.symbol.to_uppercase(),
            name: q.name,
            price: q.price,
        })
        .collect())
}

/// Returns false if cancelled before the duration elapsed
async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = time::sleep(duration) => true,
    }
}
