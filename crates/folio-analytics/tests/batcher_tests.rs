//! Batcher flush triggers and disposal under tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use folio_analytics::prelude::*;
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Transport forwarding every batch to a channel.
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

/// Transport that always fails and counts calls.
#[derive(Default)]
struct FailingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl AnalyticsTransport for FailingTransport {
    async fn send(&self, _batch: Vec<TelemetryEvent>) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Status { status: 503 })
    }
}

fn channel_batcher(
    config: BatcherConfig,
) -> AnalyticsResult<(EventBatcher, mpsc::UnboundedReceiver<Vec<TelemetryEvent>>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let batcher = EventBatcher::create(config, Arc::new(ChannelTransport { tx }))?;
    Ok((batcher, rx))
}

fn event(seq: u64) -> TelemetryEvent {
    TelemetryEvent::new("interaction", EventPayload::new(), seq)
}

async fn next_batch(
    rx: &mut mpsc::UnboundedReceiver<Vec<TelemetryEvent>>,
) -> Result<Vec<TelemetryEvent>, Box<dyn std::error::Error>> {
    let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await?
        .ok_or("transport channel closed")?;
    Ok(batch)
}

fn nothing_sent(rx: &mut mpsc::UnboundedReceiver<Vec<TelemetryEvent>>) -> bool {
    match rx.try_recv() {
        Ok(_) => false,
        Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => true,
    }
}

fn sequence(batch: &[TelemetryEvent]) -> Vec<u64> {
    batch.iter().map(TelemetryEvent::enqueued_at_ms).collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_batch_flushes_immediately() -> TestResult {
    let (batcher, mut rx) = channel_batcher(BatcherConfig::default())?;
    for seq in 0..10 {
        assert!(batcher.enqueue(event(seq)));
    }
    assert_eq!(batcher.pending_len(), 0);

    let batch = next_batch(&mut rx).await?;
    assert_eq!(sequence(&batch), (0..10).collect::<Vec<_>>());
    assert_eq!(batcher.stats().flushes, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_waits_for_timer() -> TestResult {
    let (batcher, mut rx) = channel_batcher(BatcherConfig::default())?;
    for seq in 0..9 {
        batcher.enqueue(event(seq));
    }

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(nothing_sent(&mut rx));
    assert_eq!(batcher.pending_len(), 9);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let batch = next_batch(&mut rx).await?;
    assert_eq!(batch.len(), 9);
    assert_eq!(batcher.pending_len(), 0);

    tokio::time::sleep(Duration::from_millis(20_000)).await;
    assert!(nothing_sent(&mut rx));
    assert_eq!(batcher.stats().flushes, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timer_is_not_reset_by_size_flush() -> TestResult {
    let config = BatcherConfig::default().with_batch_size(3);
    let (batcher, mut rx) = channel_batcher(config)?;

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    for seq in 0..4 {
        batcher.enqueue(event(seq));
    }
    assert_eq!(next_batch(&mut rx).await?.len(), 3);

    // The leftover event leaves on the original 5 s tick.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let batch = next_batch(&mut rx).await?;
    assert_eq!(sequence(&batch), vec![3]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_flush_now_and_empty_flush() -> TestResult {
    let (batcher, mut rx) = channel_batcher(BatcherConfig::default())?;
    assert_eq!(batcher.flush_now(), 0);

    batcher.enqueue(event(1));
    batcher.enqueue(event(2));
    assert_eq!(batcher.flush_now(), 2);
    assert_eq!(sequence(&next_batch(&mut rx).await?), vec![1, 2]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispose_flushes_and_closes() -> TestResult {
    let (batcher, mut rx) = channel_batcher(BatcherConfig::default())?;
    batcher.enqueue(event(1));
    batcher.enqueue(event(2));

    batcher.dispose().await;
    assert_eq!(sequence(&next_batch(&mut rx).await?), vec![1, 2]);

    assert!(!batcher.enqueue(event(3)));
    assert_eq!(batcher.stats().rejected, 1);
    assert!(batcher.is_disposed());

    tokio::time::sleep(Duration::from_millis(30_000)).await;
    assert!(nothing_sent(&mut rx));

    batcher.dispose().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_is_not_retried() -> TestResult {
    let transport = Arc::new(FailingTransport::default());
    let batcher = EventBatcher::create(
        BatcherConfig::default().with_batch_size(2),
        Arc::clone(&transport) as SharedTransport,
    )?;

    batcher.enqueue(event(1));
    batcher.enqueue(event(2));
    tokio::time::sleep(Duration::from_millis(20_000)).await;

    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    let stats = batcher.stats();
    assert_eq!(stats.batches_failed, 1);
    assert_eq!(stats.batches_sent, 0);
    assert_eq!(batcher.pending_len(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_batcher_stops_timer() -> TestResult {
    let (batcher, mut rx) = channel_batcher(BatcherConfig::default())?;
    batcher.enqueue(event(7));
    drop(batcher);

    let batch = next_batch(&mut rx).await?;
    assert_eq!(sequence(&batch), vec![7]);

    tokio::time::sleep(Duration::from_millis(30_000)).await;
    assert!(nothing_sent(&mut rx));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispose_racing_enqueue_strands_nothing() -> TestResult {
    let config = BatcherConfig::default()
        .with_batch_size(10_000)
        .with_flush_interval_ms(60_000);
    let (batcher, mut rx) = channel_batcher(config)?;
    let batcher = Arc::new(batcher);

    let mut producers = Vec::new();
    for worker in 0..4_u64 {
        let batcher = Arc::clone(&batcher);
        producers.push(tokio::spawn(async move {
            let mut accepted = 0_u64;
            for seq in 0..2_000_u64 {
                if batcher.enqueue(event(worker * 10_000 + seq)) {
                    accepted += 1;
                }
                if seq % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            accepted
        }));
    }

    tokio::task::yield_now().await;
    batcher.dispose().await;

    let mut accepted = 0_u64;
    for producer in producers {
        accepted += producer.await?;
    }

    let mut delivered = 0_u64;
    while let Ok(batch) = rx.try_recv() {
        delivered += batch.len() as u64;
    }

    let stats = batcher.stats();
    assert_eq!(batcher.pending_len(), 0);
    assert_eq!(delivered, accepted);
    assert_eq!(stats.enqueued, accepted);
    assert_eq!(stats.enqueued + stats.rejected, 8_000);
    Ok(())
}
