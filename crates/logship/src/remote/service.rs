//! Actor driving the flush/retry/backoff state machine.
//!
//! The service owns every piece of remote-delivery state — the in-memory
//! buffer, the durable queue, the transport, the fail count, and the timer —
//! and processes commands from cloneable handles one at a time, so none of
//! it needs a lock.
//!
//! ```text
//!    Logger (enqueue)          Caller (flush / drain / shutdown)
//!          │                              │
//!          v                              v
//!    ┌───────────────────────────────────────┐
//!    │            RemoteHandle               │ (Clone)
//!    └───────────────────┬───────────────────┘
//!                        │ commands via channel
//!                        v
//!    ┌───────────────────────────────────────┐
//!    │            RemoteService              │ (select loop)
//!    │  buffer ── take_batch ──> transport   │
//!    │     ^                        │        │
//!    │     │ reinsert (in-memory)   │ fail   │
//!    │     └──── durable queue <────┘        │
//!    └───────────────────────────────────────┘
//! ```
//!
//! # States
//!
//! - **idle**: the recurring ticker is armed; enqueues below the batch-size
//!   threshold just buffer.
//! - **flushing**: one delivery attempt is in flight; the actor awaits it,
//!   so commands arriving meanwhile queue behind it and a flush is never
//!   interleaved with a drain.
//! - **backoff**: after a failure the ticker is disarmed and a deadline is
//!   pending; both timer ticks and threshold-triggered flushes are
//!   suppressed until it elapses, then periodic flushing resumes on a fresh
//!   period.
//!
//! The fail count only ever grows — a successful delivery does not reset
//! it. Restarting the process is the only reset. This keeps a flapping
//! collector from being hammered at the base delay every time it briefly
//! recovers.

use std::future;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::record::EventRecord;
use crate::remote::backoff::{retry_delay, DEFAULT_BASE, DEFAULT_CAP};
use crate::remote::buffer::BatchBuffer;
use crate::remote::queue::DurableQueue;
use crate::remote::transport::Transport;

// How long an explicit flush waits after its delivery attempt before
// rearming the timer and acking the caller.
const FLUSH_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub(crate) enum RemoteCommand {
    Enqueue(EventRecord),
    Flush(oneshot::Sender<()>),
    DrainQueue(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle for submitting records and control operations to the
/// flush service.
///
/// Every method swallows the service-gone case: once the service task has
/// stopped, enqueues drop the record and the async operations return
/// immediately. Nothing here can fail into the logging caller.
#[derive(Clone, Debug)]
pub struct RemoteHandle {
    tx: mpsc::UnboundedSender<RemoteCommand>,
}

impl RemoteHandle {
    /// Queues a record for delivery. Non-blocking; never fails.
    pub fn enqueue(&self, record: EventRecord) {
        if self.tx.send(RemoteCommand::Enqueue(record)).is_err() {
            debug!("remote service has stopped; record dropped");
        }
    }

    /// Forces one flush attempt of any buffered records, waits a short grace
    /// period for the delivery to settle, and rearms the recurring timer.
    pub async fn flush(&self) {
        self.acked(RemoteCommand::Flush).await;
    }

    /// Re-queues up to one batch of persisted records from the durable queue
    /// and triggers an immediate flush. Never invoked automatically — call
    /// it at startup or on your own schedule.
    pub async fn drain_queue(&self) {
        self.acked(RemoteCommand::DrainQueue).await;
    }

    /// Stops the service after one final best-effort flush of the buffer.
    /// Durably queued records stay on disk for a future drain.
    pub async fn shutdown(&self) {
        self.acked(RemoteCommand::Shutdown).await;
    }

    async fn acked(&self, command: impl FnOnce(oneshot::Sender<()>) -> RemoteCommand) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(command(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// The flush-controller actor. Spawn [`RemoteService::run`] on the runtime
/// and keep the [`RemoteHandle`].
pub struct RemoteService {
    rx: mpsc::UnboundedReceiver<RemoteCommand>,
    transport: Transport,
    queue: Option<DurableQueue>,
    buffer: BatchBuffer,
    period: Duration,
    batch_size: usize,
    max_buffer: usize,
    fail_count: u32,
    backoff_until: Option<Instant>,
}

impl RemoteService {
    /// Builds the service and its handle from the remote configuration.
    #[must_use]
    pub fn new(config: RemoteConfig) -> (Self, RemoteHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let transport = Transport::new(&config);
        let queue = config
            .reliable
            .then(|| DurableQueue::new(config.queue_file()));

        let service = RemoteService {
            rx,
            transport,
            queue,
            buffer: BatchBuffer::new(),
            period: config.interval(),
            batch_size: config.batch_size.max(1),
            max_buffer: config.max_buffer,
            fail_count: 0,
            backoff_until: None,
        };

        (service, RemoteHandle { tx })
    }

    /// Processes commands and timer ticks until shutdown.
    pub async fn run(mut self) {
        debug!("remote delivery service started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // discard first tick, which is instantaneous

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(RemoteCommand::Enqueue(record)) => {
                        self.handle_enqueue(record).await;
                    }
                    Some(RemoteCommand::Flush(ack)) => {
                        // An explicit flush overrides a pending backoff; a
                        // failed attempt below re-enters it.
                        self.backoff_until = None;
                        self.flush_batch().await;
                        sleep(FLUSH_GRACE).await;
                        ticker.reset();
                        let _ = ack.send(());
                    }
                    Some(RemoteCommand::DrainQueue(ack)) => {
                        self.merge_persisted();
                        self.flush_batch().await;
                        let _ = ack.send(());
                    }
                    Some(RemoteCommand::Shutdown(ack)) => {
                        self.final_flush().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        // Every handle dropped: flush what's left and stop.
                        self.final_flush().await;
                        break;
                    }
                },
                _ = ticker.tick(), if self.backoff_until.is_none() => {
                    self.flush_batch().await;
                }
                () = wait_for_deadline(self.backoff_until) => {
                    debug!(fail_count = self.fail_count, "backoff elapsed, resuming periodic flushes");
                    self.backoff_until = None;
                    ticker.reset();
                }
            }
        }

        debug!("remote delivery service stopped");
    }

    async fn handle_enqueue(&mut self, record: EventRecord) {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size && self.backoff_until.is_none() {
            self.flush_batch().await;
        }
    }

    /// One delivery attempt over up to `batch_size` buffered records.
    async fn flush_batch(&mut self) {
        if !self.transport.is_configured() || self.buffer.is_empty() {
            return;
        }

        let batch = self.buffer.take_batch(self.batch_size);
        match self.transport.send(&batch).await {
            Ok(()) => {
                debug!(count = batch.len(), "log batch delivered");
            }
            Err(err) => {
                warn!(count = batch.len(), error = %err, "log batch delivery failed");
                self.on_delivery_failure(batch);
            }
        }
    }

    fn on_delivery_failure(&mut self, batch: Vec<EventRecord>) {
        self.fail_count += 1;

        match &self.queue {
            Some(queue) => {
                if let Err(err) = queue.append(&batch) {
                    warn!(error = %err, "failed to persist undelivered batch; records lost");
                }
            }
            None => self.buffer.reinsert_front(batch, self.max_buffer),
        }

        let delay = retry_delay(self.fail_count, DEFAULT_BASE, DEFAULT_CAP);
        debug!(fail_count = self.fail_count, delay_ms = delay.as_millis() as u64, "entering backoff");
        self.backoff_until = Some(Instant::now() + delay);
    }

    /// Moves up to one batch from the durable queue to the front of the
    /// buffer, keeping the persisted records' order ahead of newer ones.
    fn merge_persisted(&mut self) {
        let Some(queue) = &self.queue else {
            return;
        };
        match queue.drain(self.batch_size) {
            Ok(records) if records.is_empty() => {}
            Ok(records) => {
                debug!(count = records.len(), "re-queued persisted records");
                self.buffer.prepend(records);
            }
            Err(err) => {
                warn!(error = %err, "failed to drain durable queue");
            }
        }
    }

    /// Last flush before the service stops: everything still buffered goes
    /// out in one attempt. On failure in durable mode the batch is
    /// persisted; otherwise the process is exiting and the records go down
    /// with it.
    async fn final_flush(&mut self) {
        if !self.transport.is_configured() || self.buffer.is_empty() {
            return;
        }

        let batch = self.buffer.drain_all();
        if let Err(err) = self.transport.send(&batch).await {
            warn!(count = batch.len(), error = %err, "final flush failed");
            if let Some(queue) = &self.queue {
                if let Err(err) = queue.append(&batch) {
                    warn!(error = %err, "failed to persist final batch; records lost");
                }
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::log_level::LogLevel;
    use mockito::Server;
    use std::fs;
    use tokio::time::timeout;

    fn record(message: &str) -> EventRecord {
        EventRecord::new(LogLevel::Info, None, message.to_string(), None)
    }

    /// A URL nothing is listening on, so every connection is refused.
    fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/logs")
    }

    fn base_config(url: &str) -> RemoteConfig {
        RemoteConfig {
            url: url.to_string(),
            batch_size: 2,
            // Keep the periodic timer out of the way; these tests drive
            // flushes explicitly.
            interval_ms: 60_000,
            timeout_ms: 2_000,
            ..RemoteConfig::default()
        }
    }

    async fn wait_until_matched(mock: &mockito::Mock) {
        let poll = async {
            while !mock.matched_async().await {
                sleep(Duration::from_millis(20)).await;
            }
        };
        timeout(Duration::from_secs(5), poll)
            .await
            .expect("mock was never hit");
    }

    #[tokio::test]
    async fn reaching_batch_size_triggers_exactly_one_flush() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .match_header("Content-Type", "application/json")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let (mut service, _handle) =
            RemoteService::new(base_config(&format!("{}/logs", server.url())));

        service.handle_enqueue(record("a")).await;
        assert_eq!(service.buffer.len(), 1);

        service.handle_enqueue(record("b")).await;

        mock.assert_async().await;
        assert!(service.buffer.is_empty());
        assert_eq!(service.fail_count, 0);
        assert!(service.backoff_until.is_none());
    }

    #[tokio::test]
    async fn successful_delivery_leaves_the_durable_queue_untouched() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/logs")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let queue_path = dir.path().join("q.jsonl");
        let config = RemoteConfig {
            reliable: true,
            queue_path: Some(queue_path.clone()),
            ..base_config(&format!("{}/logs", server.url()))
        };
        let (mut service, _handle) = RemoteService::new(config);

        service.handle_enqueue(record("a")).await;
        service.handle_enqueue(record("b")).await;

        assert!(service.buffer.is_empty());
        assert!(!queue_path.exists());
    }

    #[tokio::test]
    async fn durable_failure_persists_the_drained_batch_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue_path = dir.path().join("q.jsonl");
        let config = RemoteConfig {
            reliable: true,
            queue_path: Some(queue_path.clone()),
            ..base_config(&refused_url())
        };
        let (mut service, _handle) = RemoteService::new(config);

        service.handle_enqueue(record("a")).await;
        service.handle_enqueue(record("b")).await; // threshold flush, fails

        assert_eq!(service.fail_count, 1);
        assert!(service.backoff_until.is_some());
        assert!(service.buffer.is_empty());

        let contents = fs::read_to_string(&queue_path).unwrap();
        let lines: Vec<EventRecord> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "a");
        assert_eq!(lines[1].message, "b");

        // While backed off, a further enqueue only buffers.
        service.handle_enqueue(record("c")).await;
        assert_eq!(service.buffer.messages(), vec!["c"]);
        assert_eq!(
            fs::read_to_string(&queue_path).unwrap().lines().count(),
            2
        );
    }

    #[tokio::test]
    async fn in_memory_failure_reinserts_at_the_front() {
        let (mut service, _handle) = RemoteService::new(base_config(&refused_url()));

        service.handle_enqueue(record("a")).await;
        service.handle_enqueue(record("b")).await; // threshold flush, fails

        assert_eq!(service.fail_count, 1);
        assert_eq!(service.buffer.messages(), vec!["a", "b"]);

        // Backed off: C buffers without triggering a flush.
        service.handle_enqueue(record("c")).await;
        assert_eq!(service.buffer.messages(), vec!["a", "b", "c"]);

        // Once the backoff would elapse, the next flush re-attempts the
        // oldest two and C stays pending.
        service.backoff_until = None;
        service.flush_batch().await;

        assert_eq!(service.fail_count, 2);
        assert_eq!(service.buffer.messages(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn reinsertion_respects_the_buffer_cap() {
        let config = RemoteConfig {
            max_buffer: 2,
            ..base_config(&refused_url())
        };
        let (mut service, _handle) = RemoteService::new(config);

        service.handle_enqueue(record("a")).await;
        service.handle_enqueue(record("b")).await; // fails, reinserted

        service.handle_enqueue(record("c")).await; // buffered during backoff
        service.backoff_until = None;
        service.flush_batch().await; // fails again; [a, b, c] capped to 2

        assert_eq!(service.buffer.messages(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unconfigured_transport_makes_flushes_no_ops() {
        let dir = tempfile::tempdir().unwrap();
        let queue_path = dir.path().join("q.jsonl");
        let config = RemoteConfig {
            reliable: true,
            queue_path: Some(queue_path.clone()),
            ..base_config("::not a url")
        };
        let (mut service, _handle) = RemoteService::new(config);

        service.handle_enqueue(record("a")).await;
        service.handle_enqueue(record("b")).await;
        service.flush_batch().await;

        // Nothing drained, nothing persisted, nothing counted as a failure.
        assert_eq!(service.buffer.len(), 2);
        assert_eq!(service.fail_count, 0);
        assert!(service.backoff_until.is_none());
        assert!(!queue_path.exists());
    }

    #[tokio::test]
    async fn merge_persisted_prepends_one_batch_from_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let queue_path = dir.path().join("q.jsonl");
        let queue = DurableQueue::new(queue_path.clone());
        queue
            .append(&[record("p1"), record("p2"), record("p3")])
            .unwrap();

        let config = RemoteConfig {
            reliable: true,
            queue_path: Some(queue_path.clone()),
            ..base_config("::not a url")
        };
        let (mut service, _handle) = RemoteService::new(config);
        service.buffer.push(record("fresh"));

        service.merge_persisted();

        // batch_size (2) persisted records come back ahead of newer ones.
        assert_eq!(service.buffer.messages(), vec!["p1", "p2", "fresh"]);
        assert_eq!(
            fs::read_to_string(&queue_path).unwrap().lines().count(),
            1
        );
    }

    #[tokio::test]
    async fn run_loop_flushes_on_threshold_and_shutdown() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let (service, handle) =
            RemoteService::new(base_config(&format!("{}/logs", server.url())));
        tokio::spawn(service.run());

        // Two records reach the threshold and flush without the timer.
        handle.enqueue(record("a"));
        handle.enqueue(record("b"));
        wait_until_matched(&mock).await;

        // One below-threshold record goes out with the shutdown flush.
        handle.enqueue(record("c"));
        handle.shutdown().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn explicit_flush_delivers_a_partial_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let (service, handle) =
            RemoteService::new(base_config(&format!("{}/logs", server.url())));
        tokio::spawn(service.run());

        handle.enqueue(record("only"));
        handle.flush().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn drain_queue_resubmits_persisted_records() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let queue_path = dir.path().join("q.jsonl");
        DurableQueue::new(queue_path.clone())
            .append(&[record("p1"), record("p2")])
            .unwrap();

        let config = RemoteConfig {
            reliable: true,
            queue_path: Some(queue_path.clone()),
            ..base_config(&format!("{}/logs", server.url()))
        };
        let (service, handle) = RemoteService::new(config);
        tokio::spawn(service.run());

        handle.drain_queue().await;

        mock.assert_async().await;
        assert_eq!(fs::read_to_string(&queue_path).unwrap(), "");
    }
}
