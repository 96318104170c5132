//! Property tests for batching and rate limiting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_analytics::RateLimiter;
use folio_analytics::prelude::*;
use proptest::prelude::*;
use tokio::sync::mpsc;

struct ChannelTransport {
    tx: mpsc::UnboundedSender<Vec<TelemetryEvent>>,
}

#[async_trait]
impl AnalyticsTransport for ChannelTransport {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TransportError> {
        self.tx
            .send(batch)
            .map_err(|err| TransportError::Request(err.to_string()))
    }
}

#[derive(Debug, Clone)]
enum Step {
    Enqueue,
    Flush,
    Wait(u64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => Just(Step::Enqueue),
        1 => Just(Step::Flush),
        1 => (1u64..8_000).prop_map(Step::Wait),
    ]
}

/// Runs the steps and returns every delivered batch.
type Delivered = (u64, Vec<Vec<TelemetryEvent>>);

fn run_batcher(batch_size: usize, steps: Vec<Step>) -> Result<Delivered, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| err.to_string())?;

    runtime.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = BatcherConfig::default().with_batch_size(batch_size);
        let batcher = EventBatcher::create(config, Arc::new(ChannelTransport { tx }))
            .map_err(|err| err.to_string())?;

        let mut seq = 0_u64;
        for step in steps {
            match step {
                Step::Enqueue => {
                    batcher.enqueue(TelemetryEvent::new("e", EventPayload::new(), seq));
                    seq += 1;
                }
                Step::Flush => {
                    batcher.flush_now();
                }
                Step::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            }
        }
        batcher.dispose().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let mut batches = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            batches.push(batch);
        }
        Ok((seq, batches))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_every_event_delivered_exactly_once(
        batch_size in 1usize..16,
        steps in prop::collection::vec(step(), 0..80),
    ) {
        let (enqueued, batches) = run_batcher(batch_size, steps).map_err(TestCaseError::fail)?;

        let mut delivered = Vec::new();
        for batch in &batches {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= batch_size);
            let seqs: Vec<u64> = batch.iter().map(TelemetryEvent::enqueued_at_ms).collect();
            prop_assert!(seqs.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
            delivered.extend(seqs);
        }
        delivered.sort_unstable();
        prop_assert_eq!(delivered, (0..enqueued).collect::<Vec<_>>());
    }

    #[test]
    fn test_limiter_never_admits_within_interval(
        interval in 1u64..500,
        gaps in prop::collection::vec(0u64..300, 1..200),
    ) {
        let mut limiter = RateLimiter::new(interval);
        let mut now_ms = 0_u64;
        let mut last_admitted: Option<u64> = None;
        for gap in gaps {
            now_ms += gap;
            if limiter.should_process(now_ms) {
                if let Some(last) = last_admitted {
                    prop_assert!(now_ms - last >= interval);
                }
                last_admitted = Some(now_ms);
            }
        }
    }
}
