//! Paced delivery of one reply's segments.
//!
//! A [`DispatchQueue`] owns the reply handle of a single inbound event and
//! sends its segments one tick at a time, so a long answer does not hit the
//! platform as a burst. The queue goes `Idle -> Sending -> Idle` once: when
//! the backlog drains the handle is retired and the ticker task ends.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    relay_channels::{DeliveryError, ReplyApi, ReplyHandle, Segment},
    relay_config::{DeliveryMode, OutboundConfig},
    tokio::{
        sync::watch,
        time::{Instant, MissedTickBehavior},
    },
    tracing::{debug, info, warn},
};

/// Pacing and failure policy for a queue.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub interval: Duration,
    pub mode: DeliveryMode,
    pub max_segments_per_call: usize,
    pub max_consecutive_failures: u32,
    pub push_fallback: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&OutboundConfig::default())
    }
}

impl From<&OutboundConfig> for DispatchConfig {
    fn from(config: &OutboundConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.dispatch_interval_ms.max(1)),
            mode: config.delivery_mode,
            max_segments_per_call: config.max_segments_per_call.max(1),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            push_fallback: config.push_fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Sending,
}

/// Which platform endpoint carried a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryVia {
    Reply,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The reply token ran out and no push recipient was available.
    HandleExhausted,
    /// Too many deliveries failed in a row.
    FailureCap,
    /// The ticker stopped before the backlog drained.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered { via: DeliveryVia },
    Failed { error: DeliveryError },
    Dropped { reason: DropReason },
}

/// One entry of a queue's append-only delivery log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    /// Submission order, starting at 0.
    pub seq: u64,
    pub segment: Segment,
    pub outcome: Outcome,
}

/// Destination for one platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Reply(String),
    Push(String),
}

impl Route {
    fn via(&self) -> DeliveryVia {
        match self {
            Self::Reply(_) => DeliveryVia::Reply,
            Self::Push(_) => DeliveryVia::Push,
        }
    }
}

/// Segments taken off the head of the queue for one tick.
#[derive(Debug)]
pub struct Batch {
    pub route: Route,
    entries: Vec<(u64, Segment)>,
}

impl Batch {
    pub fn segments(&self) -> Vec<Segment> {
        self.entries.iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the ticker should do after a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Idle,
}

/// Synchronous queue state machine. Holds no timer; whoever drives it
/// calls [`next_batch`](Self::next_batch) and [`complete`](Self::complete)
/// once per tick.
#[derive(Debug)]
pub struct QueueCore {
    handle: ReplyHandle,
    config: DispatchConfig,
    pending: VecDeque<(u64, Segment)>,
    /// Entries handed out by `next_batch` and not yet completed.
    in_flight: Vec<(u64, Segment)>,
    records: Vec<DeliveryRecord>,
    next_seq: u64,
    state: QueueState,
    retired: bool,
    consecutive_failures: u32,
}

impl QueueCore {
    pub fn new(handle: ReplyHandle, config: DispatchConfig) -> Self {
        Self {
            handle,
            config,
            pending: VecDeque::new(),
            in_flight: Vec::new(),
            records: Vec::new(),
            next_seq: 0,
            state: QueueState::Idle,
            retired: false,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Append `segments` to the tail.
    ///
    /// Returns `Ok(true)` when the queue just left `Idle` and a ticker must
    /// be started.
    pub fn enqueue(&mut self, segments: Vec<Segment>) -> Result<bool, DeliveryError> {
        if self.retired {
            return Err(DeliveryError::HandleExhausted);
        }
        for segment in segments {
            self.pending.push_back((self.next_seq, segment));
            self.next_seq += 1;
        }
        if self.state == QueueState::Idle && !self.pending.is_empty() {
            self.state = QueueState::Sending;
            return Ok(true);
        }
        Ok(false)
    }

    /// Take the next batch off the head, or `None` once there is nothing
    /// left to send (the queue is then `Idle` and retired).
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            self.finish();
            return None;
        }

        let push_to = self
            .handle
            .user_id()
            .filter(|_| self.config.push_fallback)
            .map(str::to_string);
        let route = match (self.handle.acquire().map(str::to_string), push_to) {
            (Ok(token), _) => Route::Reply(token),
            (Err(_), Some(user_id)) => Route::Push(user_id),
            (Err(_), None) => {
                self.drop_pending(DropReason::HandleExhausted);
                self.finish();
                return None;
            },
        };

        let take = match self.config.mode {
            DeliveryMode::Paced => 1,
            DeliveryMode::Batched => self.config.max_segments_per_call,
        };
        let entries: Vec<_> = self
            .pending
            .drain(..take.min(self.pending.len()))
            .collect();
        self.in_flight = entries.clone();
        Some(Batch { route, entries })
    }

    /// Record the result of delivering `batch`.
    pub fn complete(&mut self, batch: Batch, result: Result<(), DeliveryError>) -> Step {
        let via = batch.route.via();
        self.in_flight.clear();
        match result {
            Ok(()) => {
                self.consecutive_failures = 0;
                for (seq, segment) in batch.entries {
                    self.records.push(DeliveryRecord {
                        seq,
                        segment,
                        outcome: Outcome::Delivered { via },
                    });
                }
            },
            Err(error) => {
                self.consecutive_failures += 1;
                if via == DeliveryVia::Reply
                    && error.is_token_failure()
                    && self.config.push_fallback
                    && self.handle.user_id().is_some()
                {
                    debug!(%error, "reply token rejected, switching to push");
                    self.handle.retire();
                }
                for (seq, segment) in batch.entries {
                    self.records.push(DeliveryRecord {
                        seq,
                        segment,
                        outcome: Outcome::Failed {
                            error: error.clone(),
                        },
                    });
                }
                if self.consecutive_failures >= self.config.max_consecutive_failures {
                    self.drop_pending(DropReason::FailureCap);
                }
            },
        }

        if self.pending.is_empty() {
            self.finish();
            Step::Idle
        } else {
            Step::Continue
        }
    }

    /// Stop sending: drop the in-flight batch and the backlog, retire the
    /// handle and go `Idle`.
    pub fn abandon(&mut self, reason: DropReason) {
        self.drop_pending(reason);
        self.finish();
    }

    fn drop_pending(&mut self, reason: DropReason) {
        let in_flight = std::mem::take(&mut self.in_flight);
        for (seq, segment) in in_flight.into_iter().chain(self.pending.drain(..)) {
            self.records.push(DeliveryRecord {
                seq,
                segment,
                outcome: Outcome::Dropped { reason },
            });
        }
    }

    fn finish(&mut self) {
        self.state = QueueState::Idle;
        if !self.retired {
            self.retired = true;
            self.handle.retire();
        }
    }
}

struct Inner {
    core: Mutex<QueueCore>,
    state_tx: watch::Sender<QueueState>,
    api: Arc<dyn ReplyApi>,
    interval: Duration,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: QueueState) {
        self.state_tx.send_replace(state);
    }
}

/// Paced sender bound to one reply handle.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<Inner>,
}

impl DispatchQueue {
    pub fn new(handle: ReplyHandle, api: Arc<dyn ReplyApi>, config: DispatchConfig) -> Self {
        let interval = config.interval;
        let (state_tx, _) = watch::channel(QueueState::Idle);
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(QueueCore::new(handle, config)),
                state_tx,
                api,
                interval,
            }),
        }
    }

    /// Enqueue segments; delivery starts one interval later if the queue
    /// was idle. Never waits on the network. Must be called inside a tokio
    /// runtime.
    pub fn submit(&self, segments: Vec<Segment>) -> Result<(), DeliveryError> {
        let count = segments.len();
        let start = {
            let mut core = self.inner.lock();
            match core.enqueue(segments) {
                Ok(start) => start,
                Err(e) => {
                    info!(segment_count = count, "reply handle already retired, dropping submit");
                    return Err(e);
                },
            }
        };
        debug!(segment_count = count, "segments queued");

        if start {
            self.inner.publish(QueueState::Sending);
            let first_tick = Instant::now() + self.inner.interval;
            tokio::spawn(run_ticker(Arc::clone(&self.inner), first_tick));
        }
        Ok(())
    }

    pub fn state(&self) -> QueueState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.inner.state_tx.subscribe()
    }

    /// Resolves once the queue is idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == QueueState::Idle).await;
    }

    /// Snapshot of the delivery record.
    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.inner.lock().records().to_vec()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending_len()
    }

    /// Whether a ticker is currently driving this queue.
    pub fn is_ticking(&self) -> bool {
        self.inner.lock().state() == QueueState::Sending
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("DispatchQueue")
            .field("state", &core.state())
            .field("pending", &core.pending_len())
            .field("delivered", &core.records().len())
            .finish()
    }
}

/// Returns the queue to `Idle` if the ticker ends early, by panic or by
/// the runtime dropping the task.
struct IdleGuard {
    inner: Arc<Inner>,
}

impl Drop for IdleGuard {
    fn drop(&mut self) {
        let mut core = self.inner.lock();
        if core.state() == QueueState::Sending {
            warn!(
                pending = core.pending_len(),
                panicking = std::thread::panicking(),
                "dispatch ticker stopped early, abandoning backlog"
            );
            core.abandon(DropReason::Abandoned);
            drop(core);
            self.inner.publish(QueueState::Idle);
        }
    }
}

async fn run_ticker(inner: Arc<Inner>, first_tick: Instant) {
    let _guard = IdleGuard {
        inner: Arc::clone(&inner),
    };
    let mut ticker = tokio::time::interval_at(first_tick, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(batch) = inner.lock().next_batch() else {
            break;
        };
        let segments = batch.segments();
        let result = match &batch.route {
            Route::Reply(token) => inner.api.reply(token, &segments).await,
            Route::Push(to) => inner.api.push(to, &segments).await,
        };

        match &result {
            Ok(()) => debug!(
                segment_count = segments.len(),
                via = ?batch.route.via(),
                "segments delivered"
            ),
            Err(error) => warn!(
                segment_count = segments.len(),
                via = ?batch.route.via(),
                %error,
                "segment delivery failed, dropping"
            ),
        }

        if inner.lock().complete(batch, result) == Step::Idle {
            break;
        }
    }

    let core = inner.lock();
    let delivered = core
        .records()
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Delivered { .. }))
        .count();
    info!(
        delivered,
        total = core.records().len(),
        "dispatch queue drained"
    );
    drop(core);
    inner.publish(QueueState::Idle);
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        std::sync::atomic::{AtomicBool, Ordering},
    };

    /// Records every call; fails segments whose text is listed in `fail_on`.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<(Instant, DeliveryVia, Vec<String>)>>,
        fail_on: Vec<&'static str>,
        panic_on: Option<&'static str>,
        panicked: AtomicBool,
        /// Every reply call fails with `InvalidToken`.
        reject_token: bool,
    }

    impl FakeApi {
        fn failing(fail_on: Vec<&'static str>) -> Self {
            Self {
                fail_on,
                ..Default::default()
            }
        }

        fn call(&self, via: DeliveryVia, segments: &[Segment]) -> relay_channels::Result<()> {
            let texts: Vec<String> = segments.iter().map(|s| s.content().to_string()).collect();
            if let Some(p) = self.panic_on
                && texts.iter().any(|t| t == p)
            {
                self.panicked.store(true, Ordering::SeqCst);
                panic!("fake platform panic");
            }
            let fail = texts.iter().any(|t| self.fail_on.contains(&t.as_str()));
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), via, texts));
            if fail {
                Err(DeliveryError::platform(500, "boom"))
            } else {
                Ok(())
            }
        }

        fn delivered_texts(&self) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, texts)| texts.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ReplyApi for FakeApi {
        async fn reply(&self, _token: &str, segments: &[Segment]) -> relay_channels::Result<()> {
            let result = self.call(DeliveryVia::Reply, segments);
            if self.reject_token {
                return Err(DeliveryError::InvalidToken);
            }
            result
        }

        async fn push(&self, _to: &str, segments: &[Segment]) -> relay_channels::Result<()> {
            self.call(DeliveryVia::Push, segments)
        }
    }

    fn segs(texts: &[&str]) -> Vec<Segment> {
        texts.iter().map(|t| Segment::text(*t)).collect()
    }

    fn queue(api: &Arc<FakeApi>, config: DispatchConfig, max_uses: usize) -> DispatchQueue {
        let handle = ReplyHandle::new("token", max_uses).with_user_id("U1");
        DispatchQueue::new(handle, Arc::clone(api) as Arc<dyn ReplyApi>, config)
    }

    fn outcomes(queue: &DispatchQueue) -> Vec<(u64, Outcome)> {
        queue
            .records()
            .into_iter()
            .map(|r| (r.seq, r.outcome))
            .collect()
    }

    const REPLIED: Outcome = Outcome::Delivered {
        via: DeliveryVia::Reply,
    };

    #[tokio::test(start_paused = true)]
    async fn paces_one_segment_per_interval() {
        let api = Arc::new(FakeApi::default());
        let q = queue(&api, DispatchConfig::default(), 5);
        let t0 = Instant::now();

        q.submit(segs(&["one", "two", "three"])).unwrap();
        assert_eq!(q.state(), QueueState::Sending);

        tokio::time::sleep_until(t0 + Duration::from_millis(250)).await;
        assert_eq!(api.delivered_texts().len(), 2);
        assert_eq!(q.state(), QueueState::Sending);
        assert!(q.is_ticking());

        tokio::time::sleep_until(t0 + Duration::from_millis(350)).await;
        assert_eq!(api.delivered_texts(), vec![vec!["one"], vec!["two"], vec!["three"]]);
        assert_eq!(q.state(), QueueState::Idle);
        assert!(!q.is_ticking());

        let times: Vec<Duration> = api
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(at, ..)| *at - t0)
            .collect();
        assert_eq!(times, vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_segment_is_dropped_not_retried() {
        let api = Arc::new(FakeApi::failing(vec!["two"]));
        let q = queue(&api, DispatchConfig::default(), 5);

        q.submit(segs(&["one", "two", "three"])).unwrap();
        q.wait_idle().await;

        assert_eq!(api.delivered_texts(), vec![vec!["one"], vec!["two"], vec!["three"]]);
        assert_eq!(outcomes(&q), vec![
            (0, REPLIED),
            (1, Outcome::Failed {
                error: DeliveryError::platform(500, "boom")
            }),
            (2, REPLIED),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_cap_drops_the_rest() {
        let api = Arc::new(FakeApi::failing(vec!["a", "b"]));
        let config = DispatchConfig {
            max_consecutive_failures: 2,
            ..Default::default()
        };
        let q = queue(&api, config, 5);

        q.submit(segs(&["a", "b", "c", "d"])).unwrap();
        q.wait_idle().await;

        assert_eq!(api.delivered_texts().len(), 2);
        let out = outcomes(&q);
        assert_eq!(out[2], (2, Outcome::Dropped {
            reason: DropReason::FailureCap
        }));
        assert_eq!(out[3], (3, Outcome::Dropped {
            reason: DropReason::FailureCap
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn batched_mode_groups_up_to_the_call_limit() {
        let api = Arc::new(FakeApi::default());
        let config = DispatchConfig {
            mode: DeliveryMode::Batched,
            max_segments_per_call: 2,
            ..Default::default()
        };
        let q = queue(&api, config, 5);

        q.submit(segs(&["1", "2", "3", "4", "5"])).unwrap();
        q.wait_idle().await;

        assert_eq!(api.delivered_texts(), vec![
            vec!["1", "2"],
            vec!["3", "4"],
            vec!["5"]
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_token_without_fallback_drops_backlog() {
        let api = Arc::new(FakeApi::default());
        let q = queue(&api, DispatchConfig::default(), 2);

        q.submit(segs(&["1", "2", "3", "4"])).unwrap();
        q.wait_idle().await;

        assert_eq!(api.delivered_texts(), vec![vec!["1"], vec!["2"]]);
        let out = outcomes(&q);
        assert_eq!(out[2].1, Outcome::Dropped {
            reason: DropReason::HandleExhausted
        });
        assert_eq!(out.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn push_fallback_takes_over_when_token_is_spent() {
        let api = Arc::new(FakeApi::default());
        let config = DispatchConfig {
            push_fallback: true,
            ..Default::default()
        };
        let q = queue(&api, config, 1);

        q.submit(segs(&["1", "2", "3"])).unwrap();
        q.wait_idle().await;

        let vias: Vec<DeliveryVia> = api.calls.lock().unwrap().iter().map(|c| c.1).collect();
        assert_eq!(vias, vec![
            DeliveryVia::Reply,
            DeliveryVia::Push,
            DeliveryVia::Push
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_token_switches_to_push() {
        let api = Arc::new(FakeApi {
            reject_token: true,
            ..Default::default()
        });
        let config = DispatchConfig {
            push_fallback: true,
            ..Default::default()
        };
        let q = queue(&api, config, 5);

        q.submit(segs(&["1", "2", "3", "4"])).unwrap();
        q.wait_idle().await;

        let vias: Vec<DeliveryVia> = api.calls.lock().unwrap().iter().map(|c| c.1).collect();
        assert_eq!(vias, vec![
            DeliveryVia::Reply,
            DeliveryVia::Push,
            DeliveryVia::Push,
            DeliveryVia::Push
        ]);
        let pushed = Outcome::Delivered {
            via: DeliveryVia::Push,
        };
        assert_eq!(outcomes(&q), vec![
            (0, Outcome::Failed {
                error: DeliveryError::InvalidToken
            }),
            (1, pushed.clone()),
            (2, pushed.clone()),
            (3, pushed),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_token_without_fallback_keeps_replying() {
        let api = Arc::new(FakeApi {
            reject_token: true,
            ..Default::default()
        });
        let q = queue(&api, DispatchConfig::default(), 5);

        q.submit(segs(&["1", "2", "3", "4"])).unwrap();
        q.wait_idle().await;

        let vias: Vec<DeliveryVia> = api.calls.lock().unwrap().iter().map(|c| c.1).collect();
        assert_eq!(vias, vec![DeliveryVia::Reply; 3]);
        assert_eq!(outcomes(&q).last(), Some(&(3, Outcome::Dropped {
            reason: DropReason::FailureCap
        })));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_while_sending_appends_to_tail() {
        let api = Arc::new(FakeApi::default());
        let q = queue(&api, DispatchConfig::default(), 5);

        q.submit(segs(&["1", "2"])).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        q.submit(segs(&["3"])).unwrap();
        q.wait_idle().await;

        assert_eq!(api.delivered_texts(), vec![vec!["1"], vec!["2"], vec!["3"]]);
        let seqs: Vec<u64> = q.records().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn drained_queue_rejects_new_segments() {
        let api = Arc::new(FakeApi::default());
        let q = queue(&api, DispatchConfig::default(), 5);

        q.submit(segs(&["1"])).unwrap();
        q.wait_idle().await;

        assert_eq!(
            q.submit(segs(&["late"])),
            Err(DeliveryError::HandleExhausted)
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(api.delivered_texts(), vec![vec!["1"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_submit_stays_idle() {
        let api = Arc::new(FakeApi::default());
        let q = queue(&api, DispatchConfig::default(), 5);
        q.submit(Vec::new()).unwrap();
        assert_eq!(q.state(), QueueState::Idle);
        q.wait_idle().await;
        assert!(q.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn independent_queues_keep_their_own_order() {
        let api_a = Arc::new(FakeApi::default());
        let api_b = Arc::new(FakeApi::default());
        let qa = queue(&api_a, DispatchConfig::default(), 5);
        let qb = queue(&api_b, DispatchConfig::default(), 5);

        qa.submit(segs(&["a1", "a2", "a3"])).unwrap();
        qb.submit(segs(&["b1", "b2"])).unwrap();
        tokio::join!(qa.wait_idle(), qb.wait_idle());

        assert_eq!(api_a.delivered_texts(), vec![vec!["a1"], vec!["a2"], vec!["a3"]]);
        assert_eq!(api_b.delivered_texts(), vec![vec!["b1"], vec!["b2"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_ticker_returns_queue_to_idle() {
        let api = Arc::new(FakeApi {
            panic_on: Some("boom"),
            ..Default::default()
        });
        let q = queue(&api, DispatchConfig::default(), 5);

        q.submit(segs(&["ok", "boom", "never"])).unwrap();
        q.wait_idle().await;

        assert!(api.panicked.load(Ordering::SeqCst));
        assert!(!q.is_ticking());
        let out = outcomes(&q);
        assert_eq!(out[0], (0, REPLIED));
        assert_eq!(out[1], (1, Outcome::Dropped {
            reason: DropReason::Abandoned
        }));
        assert_eq!(q.submit(segs(&["x"])), Err(DeliveryError::HandleExhausted));
    }

    #[test]
    fn core_state_machine_without_a_timer() {
        let mut core = QueueCore::new(ReplyHandle::new("t", 5), DispatchConfig::default());
        assert_eq!(core.enqueue(segs(&["x", "y"])), Ok(true));
        assert_eq!(core.enqueue(segs(&["z"])), Ok(false));
        assert_eq!(core.state(), QueueState::Sending);

        let batch = core.next_batch().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.route, Route::Reply("t".into()));
        assert_eq!(core.complete(batch, Ok(())), Step::Continue);

        let batch = core.next_batch().unwrap();
        assert_eq!(core.complete(batch, Ok(())), Step::Continue);
        let batch = core.next_batch().unwrap();
        assert_eq!(core.complete(batch, Ok(())), Step::Idle);

        assert_eq!(core.state(), QueueState::Idle);
        assert!(core.is_retired());
        assert!(core.next_batch().is_none());
        assert_eq!(core.enqueue(segs(&["w"])), Err(DeliveryError::HandleExhausted));
    }
}
