//! Price Watcher
//!
//! Polls the aggregator for one mint on a fixed interval and streams quotes
//! over a channel. The polling task ends once the receiver is dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::domain::{short_address, PriceQuote};

use super::aggregator::MarketDataAggregator;

/// Shortest poll interval accepted
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

const CHANNEL_CAPACITY: usize = 16;

pub struct PriceWatcher {
    aggregator: Arc<MarketDataAggregator>,
}

impl PriceWatcher {
    pub fn new(aggregator: Arc<MarketDataAggregator>) -> Self {
        Self { aggregator }
    }

    /// Start polling `mint` every `every`; the first quote is sent right away
    pub fn watch(&self, mint: impl Into<String>, every: Duration) -> mpsc::Receiver<PriceQuote> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let aggregator = Arc::clone(&self.aggregator);
        let mint = mint.into();
        let every = every.max(MIN_POLL_INTERVAL);

        tokio::spawn(async move {
            info!("Watching {} every {:?}", short_address(&mint), every);
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }

                let quote = aggregator.get_price(&mint).await;
                if tx.send(quote).await.is_err() {
                    break;
                }
            }
            debug!("Watcher for {} stopped", short_address(&mint));
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, SOL_MINT};
    use crate::ports::ScriptedSource;

    #[tokio::test(start_paused = true)]
    async fn test_streams_quotes() {
        let source = ScriptedSource::new(DataSource::Kraken).with_price(SOL_MINT, 142.0);
        let aggregator = Arc::new(MarketDataAggregator::default().with_source(Arc::new(source)));
        let watcher = PriceWatcher::new(aggregator);

        let mut rx = watcher.watch(SOL_MINT, Duration::from_secs(5));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        assert_eq!(first.source, DataSource::Kraken);
        assert_eq!(second.price_usd, 142.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let source = ScriptedSource::new(DataSource::Kraken).with_price(SOL_MINT, 142.0);
        let aggregator = Arc::new(
            MarketDataAggregator::default().with_source(Arc::new(source.clone())),
        );
        let watcher = PriceWatcher::new(Arc::clone(&aggregator));

        let mut rx = watcher.watch(SOL_MINT, Duration::from_secs(1));
        rx.recv().await.unwrap();
        drop(rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        // Only the test and the watcher still hold the aggregator
        assert_eq!(Arc::strong_count(&aggregator), 2);
    }
}
