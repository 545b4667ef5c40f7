//! Fixed-rate tick driver for hosts without an engine loop.
//!
//! Everything in drift-online advances on `tick(dt)`: completions are
//! drained, poll timers count down, and notifications fire. Inside a game
//! engine the frame loop provides those ticks. A headless host (dedicated
//! server tooling, a bot, a test) uses this crate instead.
//!
//! # dt is measured, not fixed
//!
//! The online layer uses `dt` to count down real-time delays (the match
//! queue poll interval, for example), so [`TickInfo::dt`] is the time that
//! actually passed since the previous tick, clamped to
//! [`TickConfig::max_dt`]. A scheduler that wakes up late reports a larger
//! `dt` rather than pretending nothing happened.
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = TickScheduler::with_rate(30);
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown => break,
//!         info = scheduler.wait_for_tick() => subsystem.tick(info.dt),
//!     }
//! }
//! ```
//!
//! [`drive`] wraps exactly that loop for any [`Tickable`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Schedule the next tick from now. Missed ticks are counted, not run.
    #[default]
    Skip,
    /// Keep the original cadence. The next tick may fire immediately.
    Drop,
}

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz, 1 to [`Self::MAX_TICK_RATE_HZ`].
    pub tick_rate_hz: u32,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Random jitter (0 to max µs) added to the first tick so several
    /// hosts started together don't poll the backend in lockstep.
    pub initial_jitter_us: u64,
    /// Upper bound on the `dt` reported for a single tick.
    pub max_dt: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            policy: TickPolicy::default(),
            initial_jitter_us: 2_000,
            max_dt: Duration::from_secs(1),
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Create a config for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]:
    /// - `tick_rate_hz` is clamped to `1..=MAX_TICK_RATE_HZ`.
    /// - `max_dt` is raised to at least one tick.
    pub fn validated(mut self) -> Self {
        let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped, "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        let tick = self.tick_duration();
        if self.max_dt < tick {
            self.max_dt = tick;
        }
        self
    }

    /// Duration of a single tick.
    ///
    /// A rate of 0 is treated as 1 Hz; [`validated`](Self::validated)
    /// clamps it the same way.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Time since the previous tick, clamped to `max_dt`. The first tick
    /// (and the first after a resume) reports exactly one tick duration.
    pub dt: Duration,
    /// `true` if this tick fired more than 10% late.
    pub overrun: bool,
    /// Whole ticks that were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-rate tick scheduler.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: Instant,
    /// When the previous tick fired. `None` before the first tick and
    /// after a resume.
    last_tick: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first tick is scheduled one tick duration from now, plus jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            policy = ?config.policy,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            next_tick: Instant::now() + tick_duration + jitter,
            config,
            tick_duration,
            tick_count: 0,
            last_tick: None,
            paused: false,
        }
    }

    /// Create a scheduler for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Wait until the next tick is due.
    ///
    /// While paused this future pends forever; `tokio::select!` still
    /// processes its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            return std::future::pending::<TickInfo>().await;
        }

        let next = self.next_tick;
        let tick_dur = self.tick_duration;
        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > tick_dur / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / tick_dur.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + tick_dur
            }
            TickPolicy::Drop => next + tick_dur,
        };

        let dt = self
            .last_tick
            .map_or(tick_dur, |last| now.saturating_duration_since(last))
            .min(self.config.max_dt);
        self.last_tick = Some(now);

        trace!(tick = self.tick_count, dt_ms = dt.as_secs_f64() * 1000.0, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt,
            overrun,
            ticks_skipped,
        }
    }

    /// Pause ticking. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resume ticking after a pause.
    ///
    /// The next tick fires one tick duration from now and reports a single
    /// tick's `dt`, so time spent paused isn't fed to the subsystem.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.tick_duration;
            self.last_tick = None;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

// ---------------------------------------------------------------------------
// Driving a tickable target
// ---------------------------------------------------------------------------

/// Something that advances on a tick.
pub trait Tickable {
    fn tick(&mut self, dt: Duration);
}

/// Ticks `target` until `shutdown` resolves. Returns the number of ticks run.
pub async fn drive<T, F>(scheduler: &mut TickScheduler, target: &mut T, shutdown: F) -> u64
where
    T: Tickable + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ran = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!(ticks = ran, "tick driver stopping");
                return ran;
            }
            info = scheduler.wait_for_tick() => {
                target.tick(info.dt);
                ran += 1;
            }
        }
    }
}
