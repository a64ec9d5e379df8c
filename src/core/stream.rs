// Live sample stream: backfill, periodic ticks and frame publication

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::format::*;
use crate::core::source::{source_for, FeedSender, SampleSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOrigin {
    Timer,
    Caller,
}

struct SignalSlot {
    threshold: f64,
    source: Box<dyn SampleSource>,
}

struct Engine {
    slots: Vec<SignalSlot>,
    rng: StdRng,
}

struct Shared {
    id: Uuid,
    options: StreamOptions,
    backfill_step: TimeDelta,
    // Held for the whole of a tick; serializes ticks against each other and
    // against pause and teardown.
    engine: Mutex<Engine>,
    frames: watch::Sender<Arc<StreamFrame>>,
    run: watch::Sender<RunState>,
    feeds: HashMap<String, FeedSender>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn backfill(&self, now: DateTime<Utc>) {
        let mut engine = lock(&self.engine);
        let Engine { slots, rng } = &mut *engine;

        let capacity = self.options.capacity;
        let mut windows = self.frames.borrow().windows.clone();

        for i in 0..capacity {
            let back = (capacity - 1 - i) as i32;
            let at = now - self.backfill_step * back;
            for (slot, window) in slots.iter_mut().zip(windows.iter_mut()) {
                let value = slot.source.next_value(rng);
                window.samples.push(Sample::new(at, value, slot.threshold));
            }
        }

        self.frames.send_replace(Arc::new(StreamFrame {
            seq: 0,
            at: now,
            windows,
        }));
    }

    fn apply_tick(&self, at: DateTime<Utc>, origin: TickOrigin) -> bool {
        let mut engine = lock(&self.engine);
        match (*self.run.borrow(), origin) {
            (RunState::Stopped, _) => {
                debug!("stream {}: tick after teardown ignored", self.id);
                return false;
            }
            // The deadline fired but pause won the lock.
            (RunState::Paused, TickOrigin::Timer) => {
                debug!("stream {}: timer tick while paused ignored", self.id);
                return false;
            }
            _ => {}
        }
        let Engine { slots, rng } = &mut *engine;

        let prev = self.frames.borrow().clone();
        // Never step behind samples already in the windows.
        let at = at.max(prev.at);

        let mut windows = prev.windows.clone();
        for (slot, window) in slots.iter_mut().zip(windows.iter_mut()) {
            let value = slot.source.next_value(rng);
            window.samples.push(Sample::new(at, value, slot.threshold));
        }

        let seq = prev.seq + 1;
        self.frames.send_replace(Arc::new(StreamFrame { seq, at, windows }));
        debug!("stream {}: tick {} at {}", self.id, seq, at);
        true
    }
}

/// A set of signals waiting to be started.
///
/// [`SampleStream::start`] backfills every window and spawns the periodic
/// ticker on the current tokio runtime; [`SampleStream::start_manual`]
/// backfills only and leaves ticking to the caller.
pub struct SampleStream {
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl SampleStream {
    /// Fails with [`StreamError::InvalidConfig`] or
    /// [`StreamError::DuplicateSignal`] when `signals` or `options` do not
    /// validate.
    ///
    /// [`StreamError::InvalidConfig`]: crate::StreamError::InvalidConfig
    /// [`StreamError::DuplicateSignal`]: crate::StreamError::DuplicateSignal
    pub fn new(signals: Vec<SignalConfig>, options: StreamOptions) -> Result<Self> {
        validate_signals(&signals)?;
        options.validate()?;
        let backfill_step = options.backfill_step()?;

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut slots = Vec::with_capacity(signals.len());
        let mut windows = Vec::with_capacity(signals.len());
        let mut feeds = HashMap::new();
        for config in &signals {
            let (source, feed) = source_for(config.distribution);
            if let Some(feed) = feed {
                feeds.insert(config.id.clone(), feed);
            }
            slots.push(SignalSlot {
                threshold: config.threshold,
                source,
            });
            windows.push(SignalWindow::new(config, options.capacity));
        }

        let (frames, _) = watch::channel(Arc::new(StreamFrame {
            seq: 0,
            at: Utc::now(),
            windows,
        }));
        let (run, _) = watch::channel(RunState::Running);

        Ok(Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                options,
                backfill_step,
                engine: Mutex::new(Engine { slots, rng }),
                frames,
                run,
                feeds,
            }),
            started: AtomicBool::new(false),
        })
    }

    /// The three dashboard signals with default options.
    pub fn with_presets() -> Result<Self> {
        Self::new(SignalConfig::presets(), StreamOptions::default())
    }

    /// Feed for a signal configured with [`Distribution::External`].
    /// Values pushed before start are used by the backfill.
    pub fn feed(&self, signal_id: &str) -> Option<FeedSender> {
        self.shared.feeds.get(signal_id).cloned()
    }

    /// Backfills and spawns the ticker. Must be called within a tokio runtime.
    ///
    /// # Panics
    ///
    /// If this stream was already started.
    pub fn start(&self) -> StreamHandle {
        let handle = self.start_manual();
        let run = handle.shared.run.subscribe();
        let task = tokio::spawn(run_ticker(handle.shared.clone(), run));
        *lock(&handle.ticker) = Some(task);
        handle
    }

    /// Backfills without spawning a ticker; the caller drives
    /// [`StreamHandle::tick`].
    ///
    /// # Panics
    ///
    /// If this stream was already started.
    pub fn start_manual(&self) -> StreamHandle {
        assert!(
            !self.started.swap(true, Ordering::SeqCst),
            "sample stream already started"
        );

        self.shared.backfill(Utc::now());
        info!(
            "stream {} started: {} signals, capacity {}, period {:?}",
            self.shared.id,
            self.shared.frames.borrow().windows.len(),
            self.shared.options.capacity,
            self.shared.options.tick_period
        );

        StreamHandle {
            shared: self.shared.clone(),
            ticker: Mutex::new(None),
        }
    }
}

async fn run_ticker(shared: Arc<Shared>, mut run: watch::Receiver<RunState>) {
    let period = shared.options.tick_period;
    let Some(first) = Instant::now().checked_add(period) else {
        warn!("stream {}: tick period {:?} out of range, not ticking", shared.id, period);
        return;
    };
    let mut ticker = time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let state = *run.borrow_and_update();
        match state {
            RunState::Stopped => break,
            RunState::Paused => {
                if run.changed().await.is_err() {
                    break;
                }
                if *run.borrow() == RunState::Running {
                    // Next tick one full period after resume.
                    ticker.reset();
                }
            }
            RunState::Running => {
                tokio::select! {
                    _ = ticker.tick() => {
                        shared.apply_tick(Utc::now(), TickOrigin::Timer);
                    }
                    changed = run.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    debug!("stream {}: ticker finished", shared.id);
}

/// A started stream. Dropping the handle tears the stream down.
pub struct StreamHandle {
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamHandle {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn options(&self) -> &StreamOptions {
        &self.shared.options
    }

    /// Applies one tick at the current wall-clock time. No-op after teardown.
    /// Manual ticks are applied while paused; pausing only stops the timer.
    pub fn tick(&self) -> bool {
        self.tick_at(Utc::now())
    }

    /// Applies one tick at `at`, clamped so windows stay in time order.
    pub fn tick_at(&self, at: DateTime<Utc>) -> bool {
        self.shared.apply_tick(at, TickOrigin::Caller)
    }

    /// Once this returns, no timer tick is applied until [`resume`](Self::resume).
    pub fn pause(&self) {
        let _engine = lock(&self.shared.engine);
        let changed = self.shared.run.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            info!("stream {} paused", self.shared.id);
        }
    }

    pub fn resume(&self) {
        let _engine = lock(&self.shared.engine);
        let changed = self.shared.run.send_if_modified(|state| {
            if *state == RunState::Paused {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            info!("stream {} resumed", self.shared.id);
        }
    }

    pub fn run_state(&self) -> RunState {
        *self.shared.run.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.run_state() == RunState::Paused
    }

    pub fn is_torn_down(&self) -> bool {
        self.run_state() == RunState::Stopped
    }

    /// Stops the ticker for good. Windows stay readable in their final state.
    pub fn teardown(&self) {
        {
            let _engine = lock(&self.shared.engine);
            if *self.shared.run.borrow() == RunState::Stopped {
                return;
            }
            self.shared.run.send_replace(RunState::Stopped);
        }
        if let Some(task) = lock(&self.ticker).take() {
            task.abort();
        }
        info!("stream {} torn down", self.shared.id);
    }

    /// All windows as of the last applied tick.
    pub fn snapshot(&self) -> Arc<StreamFrame> {
        self.shared.frames.borrow().clone()
    }

    /// Samples of one signal, oldest first. `None` for an unknown id.
    pub fn current_window(&self, signal_id: &str) -> Option<Vec<Sample>> {
        self.snapshot()
            .window(signal_id)
            .map(|w| w.samples.to_vec())
    }

    pub fn feed(&self, signal_id: &str) -> Option<FeedSender> {
        self.shared.feeds.get(signal_id).cloned()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            frames: self.shared.frames.subscribe(),
            run: self.shared.run.subscribe(),
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Update notifications for a rendering surface.
pub struct Subscription {
    frames: watch::Receiver<Arc<StreamFrame>>,
    run: watch::Receiver<RunState>,
}

impl Subscription {
    /// Latest frame, marking it seen.
    pub fn current(&mut self) -> Arc<StreamFrame> {
        self.frames.borrow_and_update().clone()
    }

    /// Waits for the next published frame. Frames published faster than the
    /// subscriber reads are coalesced into the latest one. `None` once the
    /// stream is torn down.
    pub async fn next(&mut self) -> Option<Arc<StreamFrame>> {
        loop {
            if self.frames.has_changed().unwrap_or(false) {
                return Some(self.frames.borrow_and_update().clone());
            }
            if *self.run.borrow_and_update() == RunState::Stopped {
                return None;
            }
            let woke = tokio::select! {
                changed = self.frames.changed() => changed.map(|_| true),
                changed = self.run.changed() => changed.map(|_| false),
            };
            match woke {
                Ok(true) => return Some(self.frames.borrow_and_update().clone()),
                Ok(false) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::*;
    use std::time::Duration;

    fn options(capacity: usize) -> StreamOptions {
        StreamOptions {
            capacity,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn assert_ordered(samples: &[Sample]) {
        assert!(samples
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn backfill_is_spaced_one_second_ending_now() {
        let stream = SampleStream::new(SignalConfig::presets(), options(10)).unwrap();
        let handle = stream.start_manual();
        let frame = handle.snapshot();
        assert_eq!(frame.seq, 0);

        for window in &frame.windows {
            let samples = window.samples.to_vec();
            assert_eq!(samples.len(), 10);
            assert_eq!(samples[9].timestamp, frame.at);
            for pair in samples.windows(2) {
                assert_eq!(pair[1].timestamp - pair[0].timestamp, TimeDelta::seconds(1));
            }
        }

        let vibration = handle.current_window(VIBRATION).unwrap();
        assert!(vibration.iter().all(|s| (2.5..4.0).contains(&s.value)));
        let fan = handle.current_window(FAN_SPEED).unwrap();
        assert!(fan.iter().all(|s| (1200.0..1600.0).contains(&s.value)));
    }

    #[test]
    fn backfill_uses_configured_spacing() {
        let options = StreamOptions {
            backfill_spacing: Duration::from_millis(250),
            ..options(4)
        };
        let handle = SampleStream::new(vec![SignalConfig::vibration()], options)
            .unwrap()
            .start_manual();
        let window = handle.current_window(VIBRATION).unwrap();
        assert_eq!(
            window[3].timestamp - window[0].timestamp,
            TimeDelta::milliseconds(750)
        );
    }

    #[test]
    fn construction_rejects_unusable_config() {
        let wide = SignalConfig::uniform("x", "X", "", -1e308, 1e308, 0.0);
        assert!(SampleStream::new(vec![wide], options(4)).is_err());

        let far_back = StreamOptions {
            backfill_spacing: Duration::from_millis(1_000_000_000_000_000),
            ..options(20)
        };
        assert!(SampleStream::new(SignalConfig::presets(), far_back).is_err());

        let endless = StreamOptions {
            tick_period: Duration::MAX,
            ..options(4)
        };
        assert!(SampleStream::new(SignalConfig::presets(), endless).is_err());

        let twice = vec![SignalConfig::vibration(), SignalConfig::vibration()];
        assert!(SampleStream::new(twice, options(4)).is_err());
    }

    #[test]
    fn window_stays_full_ordered_and_fifo() {
        let stream = SampleStream::new(SignalConfig::presets(), options(10)).unwrap();
        let handle = stream.start_manual();

        for _ in 0..30 {
            let before = handle.current_window(TEMPERATURE).unwrap();
            assert!(handle.tick());
            let after = handle.current_window(TEMPERATURE).unwrap();

            assert_eq!(after.len(), 10);
            assert_ordered(&after);
            // Oldest dropped, everything else shifted by one.
            assert_eq!(&after[..9], &before[1..]);
            assert!(after.iter().all(|s| s.threshold == 75.0));
        }
        assert_eq!(handle.snapshot().seq, 30);
    }

    #[test]
    fn one_tick_shares_one_timestamp() {
        let stream = SampleStream::new(SignalConfig::presets(), options(5)).unwrap();
        let handle = stream.start_manual();
        handle.tick();

        let frame = handle.snapshot();
        let latest: Vec<_> = frame
            .windows
            .iter()
            .map(|w| w.samples.latest().unwrap().timestamp)
            .collect();
        assert!(latest.iter().all(|t| *t == frame.at));
    }

    #[test]
    fn clock_stepping_back_keeps_order() {
        let stream = SampleStream::new(vec![SignalConfig::vibration()], options(5)).unwrap();
        let handle = stream.start_manual();
        let before = handle.snapshot().at;

        handle.tick_at(before - TimeDelta::hours(1));
        let window = handle.current_window(VIBRATION).unwrap();
        assert_ordered(&window);
        assert_eq!(window[4].timestamp, before);
    }

    #[test]
    fn tick_after_teardown_is_noop() {
        let stream = SampleStream::new(SignalConfig::presets(), options(10)).unwrap();
        let handle = stream.start_manual();
        handle.tick();
        handle.teardown();
        assert!(handle.is_torn_down());

        let frozen = handle.current_window(VIBRATION).unwrap();
        assert!(!handle.tick());
        assert_eq!(handle.current_window(VIBRATION).unwrap(), frozen);
        assert_eq!(handle.snapshot().seq, 1);

        handle.teardown();
        assert!(handle.is_torn_down());
    }

    #[test]
    #[should_panic(expected = "already started")]
    fn starting_twice_panics() {
        let stream = SampleStream::with_presets().unwrap();
        let _first = stream.start_manual();
        let _second = stream.start_manual();
    }

    #[test]
    fn seeded_streams_are_reproducible() {
        let a = SampleStream::new(SignalConfig::presets(), options(8)).unwrap().start_manual();
        let b = SampleStream::new(SignalConfig::presets(), options(8)).unwrap().start_manual();
        let at = Utc::now();
        a.tick_at(at);
        b.tick_at(at);

        let values = |h: &StreamHandle| -> Vec<f64> {
            h.current_window(TEMPERATURE)
                .unwrap()
                .iter()
                .map(|s| s.value)
                .collect()
        };
        assert_eq!(values(&a), values(&b));
    }

    #[test]
    fn external_feed_drives_values() {
        let signals = vec![
            SignalConfig::external("pressure", "Pressure", "bar", 9.0),
            SignalConfig::vibration(),
        ];
        let stream = SampleStream::new(signals, options(3)).unwrap();
        let feed = stream.feed("pressure").unwrap();
        assert!(stream.feed(VIBRATION).is_none());
        for v in [1.0, 2.0, 3.0] {
            feed.push(v);
        }

        let handle = stream.start_manual();
        let values = |h: &StreamHandle| -> Vec<f64> {
            h.current_window("pressure")
                .unwrap()
                .iter()
                .map(|s| s.value)
                .collect()
        };
        assert_eq!(values(&handle), vec![1.0, 2.0, 3.0]);

        handle.feed("pressure").unwrap().push(7.5);
        handle.tick();
        handle.tick();
        assert_eq!(values(&handle), vec![3.0, 7.5, 7.5]);
    }

    #[test]
    fn unknown_signal_has_no_window() {
        let handle = SampleStream::with_presets().unwrap().start_manual();
        assert!(handle.current_window("pressure").is_none());
        assert_eq!(handle.current_window(VIBRATION).unwrap().len(), WINDOW_CAPACITY);
    }

    #[test]
    fn pause_is_idempotent() {
        let handle = SampleStream::with_presets().unwrap().start_manual();
        handle.pause();
        let once = handle.run_state();
        handle.pause();
        assert_eq!(handle.run_state(), once);
        assert!(handle.is_paused());

        handle.resume();
        handle.resume();
        assert_eq!(handle.run_state(), RunState::Running);
    }

    #[test]
    fn timer_tick_is_refused_once_paused() {
        let handle = SampleStream::with_presets().unwrap().start_manual();
        handle.pause();
        assert!(!handle.shared.apply_tick(Utc::now(), TickOrigin::Timer));
        assert_eq!(handle.snapshot().seq, 0);

        // Caller-driven ticks still apply while paused.
        assert!(handle.tick());
        handle.resume();
        assert!(handle.shared.apply_tick(Utc::now(), TickOrigin::Timer));
        assert_eq!(handle.snapshot().seq, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_ticks_trim_oldest_then_teardown_freezes() {
        let stream = SampleStream::new(SignalConfig::presets(), options(10)).unwrap();
        let handle = stream.start();

        let original = handle.current_window(VIBRATION).unwrap();
        assert_eq!(original.len(), 10);
        assert_ordered(&original);

        // Ticks land at 2, 4, 6, 8 and 10 seconds.
        time::sleep(Duration::from_millis(10_500)).await;

        let window = handle.current_window(VIBRATION).unwrap();
        assert_eq!(handle.snapshot().seq, 5);
        assert_eq!(window.len(), 10);
        assert_ordered(&window);
        for old in &original[..5] {
            assert!(!window.contains(old));
        }
        assert_eq!(&window[..5], &original[5..]);

        handle.teardown();
        let frozen = handle.snapshot();
        time::sleep(Duration::from_secs(10)).await;
        handle.tick();
        assert_eq!(handle.snapshot().seq, frozen.seq);
        assert_eq!(handle.current_window(VIBRATION).unwrap(), window);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_interval_produces_no_samples() {
        let stream = SampleStream::new(SignalConfig::presets(), options(10)).unwrap();
        let handle = stream.start();
        handle.pause();
        handle.pause();

        let before = handle.current_window(TEMPERATURE).unwrap();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().seq, 0);
        assert_eq!(handle.current_window(TEMPERATURE).unwrap(), before);

        handle.resume();
        // No catch-up burst: the first tick comes one period after resume.
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.snapshot().seq, 0);
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().seq, 1);
        assert_eq!(handle.current_window(TEMPERATURE).unwrap().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn no_timed_tick_lands_after_pause_returns() {
        for round in 0..50 {
            let handle = SampleStream::new(SignalConfig::presets(), options(10))
                .unwrap()
                .start();
            // Wake on the first tick deadline, racing the ticker for it.
            time::sleep(TICK_PERIOD).await;
            handle.pause();
            let seq = handle.snapshot().seq;
            assert!(seq <= 1, "round {round}: seq {seq}");

            time::sleep(TICK_PERIOD * 3).await;
            assert_eq!(handle.snapshot().seq, seq, "round {round}");
        }
    }

    #[tokio::test]
    async fn subscription_sees_ticks_until_teardown() {
        let handle = SampleStream::new(SignalConfig::presets(), options(4)).unwrap().start_manual();
        let mut sub = handle.subscribe();
        assert_eq!(sub.current().seq, 0);

        handle.tick();
        let frame = sub.next().await.unwrap();
        assert_eq!(frame.seq, 1);
        assert_eq!(frame.windows.len(), 3);

        handle.teardown();
        assert!(sub.next().await.is_none());
    }
}
