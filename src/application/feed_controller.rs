// Feed controller - Decides which producer owns the rolling buffer
use crate::application::feed_transport::{FeedError, FeedTarget, FeedTransport, MessageStream};
use crate::application::target_store::TargetStore;
use crate::domain::buffer::{DEFAULT_CAPACITY, RollingBuffer};
use crate::domain::synthetic::SyntheticGenerator;
use crate::domain::telemetry::{ConnectionMode, TelemetrySample};
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_BACKFILL: usize = 30;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(800);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub capacity: usize,
    /// Samples seeded into the buffer when demo mode starts.
    pub backfill: usize,
    /// Synthetic emission interval, also the backfill spacing.
    pub tick: Duration,
    /// Wait between losing the live feed and starting demo mode.
    pub fallback_delay: Duration,
    /// Longest wait for the live handshake before it counts as a failure.
    pub connect_timeout: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            backfill: DEFAULT_BACKFILL,
            tick: DEFAULT_TICK,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Everything the dashboard needs to render tiles and the chart.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub mode: ConnectionMode,
    pub latest: Option<TelemetrySample>,
    pub samples: Vec<TelemetrySample>,
    /// Window length the chart should reserve.
    pub capacity: usize,
    pub target: Option<String>,
    pub discarded: u64,
}

struct ActiveProducer {
    generation: u64,
    cancel: CancellationToken,
}

struct FeedState {
    mode: ConnectionMode,
    buffer: RollingBuffer,
    generator: SyntheticGenerator,
    target: Option<String>,
    /// Bumped on every start and stop; producers compare it before mutating.
    generation: u64,
    active: Option<ActiveProducer>,
    discarded: u64,
}

struct Inner {
    options: FeedOptions,
    transport: Arc<dyn FeedTransport>,
    store: Arc<dyn TargetStore>,
    state: Mutex<FeedState>,
    mode_tx: watch::Sender<ConnectionMode>,
}

/// Owns the connection mode and guarantees at most one producer writes to
/// the buffer at a time.
///
/// Producers run as tokio tasks, so `connect` and `start_demo` must be called
/// from within a runtime. Dropping the controller stops the active producer.
pub struct FeedController {
    inner: Arc<Inner>,
}

impl FeedController {
    pub fn new(
        mut options: FeedOptions,
        transport: Arc<dyn FeedTransport>,
        store: Arc<dyn TargetStore>,
        generator: SyntheticGenerator,
    ) -> Self {
        options.tick = options.tick.max(Duration::from_millis(1));
        options.connect_timeout = options.connect_timeout.max(Duration::from_millis(1));

        let (mode_tx, _) = watch::channel(ConnectionMode::Disconnected);
        let state = FeedState {
            mode: ConnectionMode::Disconnected,
            buffer: RollingBuffer::new(options.capacity),
            generator,
            target: None,
            generation: 0,
            active: None,
            discarded: 0,
        };

        Self {
            inner: Arc::new(Inner {
                options,
                transport,
                store,
                state: Mutex::new(state),
                mode_tx,
            }),
        }
    }

    /// Set the desired live endpoint without starting anything. Empty clears it.
    pub fn configure_target(&self, url: &str) {
        let url = url.trim();
        self.inner.state.lock().target = (!url.is_empty()).then(|| url.to_string());
    }

    pub fn target(&self) -> Option<String> {
        self.inner.state.lock().target.clone()
    }

    /// A URL entered by the user: connect, and remember it for the next
    /// session if it is a usable feed address.
    pub fn enter_target(&self, url: &str) {
        self.configure_target(url);
        let url = url.trim();
        if let Ok(target) = FeedTarget::parse(url) {
            if let Err(e) = self.inner.store.save(target.as_str()) {
                warn!(url, error = %e, "failed to persist feed target");
            }
        }
        self.connect(url);
    }

    /// Replace the active producer with a live connection to `url`, or with
    /// the synthetic producer when `url` is empty.
    pub fn connect(&self, url: &str) {
        let mut state = self.inner.state.lock();
        self.inner.connect_locked(&mut state, url);
    }

    pub fn start_demo(&self) {
        let mut state = self.inner.state.lock();
        self.inner.start_demo_locked(&mut state);
    }

    /// Stop whichever producer is active. Leaves the mode as it is.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        Inner::stop_locked(&mut state);
    }

    pub fn dispose(&self) {
        self.stop();
        debug!("feed controller disposed");
    }

    pub fn mode(&self) -> ConnectionMode {
        self.inner.state.lock().mode
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionMode> {
        self.inner.mode_tx.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.inner.state.lock();
        FeedSnapshot {
            mode: state.mode,
            latest: state.buffer.latest().cloned(),
            samples: state.buffer.to_vec(),
            capacity: state.buffer.capacity(),
            target: state.target.clone(),
            discarded: state.discarded,
        }
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn set_mode(&self, state: &mut FeedState, mode: ConnectionMode) {
        if state.mode != mode {
            info!(from = %state.mode, to = %mode, generation = state.generation, "feed mode changed");
            state.mode = mode;
            self.mode_tx.send_replace(mode);
        }
    }

    fn stop_locked(state: &mut FeedState) {
        state.generation += 1;
        if let Some(active) = state.active.take() {
            debug!(generation = active.generation, "stopping producer");
            active.cancel.cancel();
        }
    }

    fn begin_producer(state: &mut FeedState) -> (u64, CancellationToken) {
        Self::stop_locked(state);
        let cancel = CancellationToken::new();
        state.active = Some(ActiveProducer {
            generation: state.generation,
            cancel: cancel.clone(),
        });
        (state.generation, cancel)
    }

    fn connect_locked(self: &Arc<Self>, state: &mut FeedState, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            self.start_demo_locked(state);
            return;
        }

        let (generation, cancel) = Self::begin_producer(state);
        self.set_mode(state, ConnectionMode::Connecting);

        match FeedTarget::parse(url) {
            Ok(target) => {
                info!(%target, generation, "opening live feed");
                tokio::spawn(Arc::clone(self).run_live(target, generation, cancel));
            }
            Err(e) => {
                warn!(error = %e, generation, "live feed could not be opened");
                self.fall_back(state, generation, cancel, Duration::ZERO);
            }
        }
    }

    fn start_demo_locked(self: &Arc<Self>, state: &mut FeedState) {
        let (generation, cancel) = Self::begin_producer(state);
        self.set_mode(state, ConnectionMode::Demo);

        let spacing_ms = self.options.tick.as_millis() as i64;
        let now = Utc::now().timestamp_millis();
        let backfill = state.generator.backfill(now, self.options.backfill, spacing_ms);
        state.buffer.clear();
        state.buffer.extend(backfill);

        tokio::spawn(Arc::clone(self).run_demo(generation, cancel));
    }

    /// Hand the buffer to the synthetic producer, now or after `delay`.
    ///
    /// The pending switch is tied to the failed producer's cancel token, so
    /// stopping during the delay cancels it.
    fn fall_back(
        self: &Arc<Self>,
        state: &mut FeedState,
        generation: u64,
        cancel: CancellationToken,
        delay: Duration,
    ) {
        if state.generation != generation {
            return;
        }
        self.set_mode(state, ConnectionMode::Disconnected);

        if delay.is_zero() {
            self.start_demo_locked(state);
            return;
        }

        warn!(generation, delay_ms = delay.as_millis() as u64, "falling back to synthetic feed");
        let deadline = Instant::now() + delay;
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!(generation, "fallback cancelled"),
                _ = tokio::time::sleep_until(deadline) => inner.fallback_due(generation),
            }
        });
    }

    fn fallback_due(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            self.start_demo_locked(&mut state);
        }
    }

    fn fail(self: &Arc<Self>, generation: u64, cancel: CancellationToken) {
        let mut state = self.state.lock();
        self.fall_back(&mut state, generation, cancel, self.options.fallback_delay);
    }

    async fn run_live(self: Arc<Self>, target: FeedTarget, generation: u64, cancel: CancellationToken) {
        let timeout = self.options.connect_timeout;
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = tokio::time::timeout(timeout, self.transport.open(&target)) => {
                opened.unwrap_or_else(|_| {
                    Err(FeedError::Transport(format!(
                        "handshake timed out after {} ms",
                        timeout.as_millis()
                    )))
                })
            }
        };

        let failure = match opened {
            Ok(stream) => {
                if !self.mark_connected(generation) {
                    return;
                }
                match self.pump(stream, generation, &cancel).await {
                    Some(e) => e,
                    None => return,
                }
            }
            Err(e) => e,
        };

        warn!(%target, error = %failure, generation, "live feed lost");
        self.fail(generation, cancel);
    }

    /// Feed messages into the buffer until the stream fails or this producer
    /// is superseded. Returns `None` when superseded.
    async fn pump(
        &self,
        mut stream: MessageStream,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Option<FeedError> {
        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return None,
                item = stream.next() => item,
            };

            match item {
                Some(Ok(text)) => {
                    if !self.ingest(generation, &text) {
                        return None;
                    }
                }
                Some(Err(e)) => return Some(e),
                None => return Some(FeedError::Closed),
            }
        }
    }

    fn mark_connected(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        self.set_mode(&mut state, ConnectionMode::Connected);
        true
    }

    fn ingest(&self, generation: u64, text: &str) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }

        match TelemetrySample::from_message(text) {
            Some(sample) => state.buffer.append(sample),
            None => {
                state.discarded += 1;
                debug!(generation, discarded = state.discarded, "discarded feed message without timestamp");
            }
        }
        true
    }

    async fn run_demo(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        let tick = self.options.tick;
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.emit_synthetic(generation) {
                        break;
                    }
                }
            }
        }
        debug!(generation, "synthetic producer stopped");
    }

    fn emit_synthetic(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        let sample = state.generator.sample_at(Utc::now().timestamp_millis());
        state.buffer.append(sample);
        true
    }
}
