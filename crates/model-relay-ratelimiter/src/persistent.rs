use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use model_relay_core::RelayError;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
#[cfg(feature = "metrics")]
use metrics::counter;

/// Length of the rolling minute window, in seconds.
pub const MINUTE_WINDOW_SECS: u64 = 60;
/// Length of the rolling day window, in seconds.
pub const DAY_WINDOW_SECS: u64 = 86_400;

/// The on-disk quota record, one per provider identity.
///
/// Timestamps are unix seconds so the record stays meaningful across
/// process restarts. The file is private to the rate limiter; nothing
/// else reads or writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Unix second at which the current minute window started.
    pub minute_window_start: u64,
    /// Requests admitted since the minute window started.
    pub minute_request_count: u32,
    /// Unix second at which the current day window started.
    pub day_window_start: u64,
    /// Requests admitted since the day window started.
    pub day_request_count: u32,
}

impl QuotaState {
    fn fresh(now: u64) -> Self {
        Self {
            minute_window_start: now,
            minute_request_count: 0,
            day_window_start: now,
            day_request_count: 0,
        }
    }

    /// Advances any window whose length has elapsed, resetting its counter.
    fn roll(&mut self, now: u64) {
        if now >= self.minute_window_start + MINUTE_WINDOW_SECS {
            self.minute_window_start = now;
            self.minute_request_count = 0;
        }
        if now >= self.day_window_start + DAY_WINDOW_SECS {
            self.day_window_start = now;
            self.day_request_count = 0;
        }
    }
}

enum Admission {
    Admit,
    Wait(Duration),
}

/// Disk-backed rolling-window rate limiter.
///
/// Counts admissions inside independent minute and day windows instead of
/// refilling continuously, which keeps the accounting auditable: the state
/// file says exactly how much of each window's allowance is spent. Both
/// ceilings must admit before a request passes.
///
/// Every admission rewrites the state file through a temp-file-plus-rename
/// so a crash mid-write cannot corrupt it. The file is loaded verbatim at
/// construction; a missing file starts fresh and an unreadable one is
/// replaced with a warning rather than an error, because quota accounting
/// must never take a provider down on its own.
///
/// Concurrent *processes* sharing one state file are not coordinated: this
/// limiter assumes it is the single writer. Run one relay per state
/// directory.
pub struct PersistentRateLimiter {
    config: RateLimiterConfig,
    path: PathBuf,
    state: Mutex<QuotaState>,
}

impl PersistentRateLimiter {
    /// Opens (or creates) the state file for this provider under
    /// `state_dir` and loads any persisted counters.
    ///
    /// # Errors
    ///
    /// Returns an error when the state directory cannot be created or the
    /// initial state file cannot be written. Runtime persistence failures
    /// after construction are logged and swallowed instead.
    pub fn open(config: RateLimiterConfig, state_dir: impl AsRef<Path>) -> io::Result<Self> {
        let state_dir = state_dir.as_ref();
        fs::create_dir_all(state_dir)?;
        let path = state_dir.join(format!("{}.json", config.name));

        let now = unix_now();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<QuotaState>(&contents) {
                Ok(state) => state,
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        limiter = %config.name,
                        path = %path.display(),
                        error = %_err,
                        "quota state file unreadable, starting fresh"
                    );
                    QuotaState::fresh(now)
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => QuotaState::fresh(now),
            Err(err) => return Err(err),
        };

        let limiter = Self {
            config,
            path,
            state: Mutex::new(state.clone()),
        };
        // Make sure a record exists on disk from the start, so a crash
        // before the first admission still leaves a loadable file.
        limiter.write_state(&state)?;
        Ok(limiter)
    }

    /// The provider identity this limiter gates.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Path of the state file backing this limiter.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the persisted counters as last written.
    pub fn state(&self) -> QuotaState {
        self.state.lock().unwrap().clone()
    }

    /// Requests still admissible in the current minute window.
    pub fn remaining_minute(&self) -> u32 {
        let mut rolled = self.state();
        rolled.roll(unix_now());
        self.config
            .requests_per_minute
            .saturating_sub(rolled.minute_request_count)
    }

    /// Requests still admissible in the current day window, if a day
    /// ceiling is configured.
    pub fn remaining_day(&self) -> Option<u32> {
        let rpd = self.config.requests_per_day?;
        let mut rolled = self.state();
        rolled.roll(unix_now());
        Some(rpd.saturating_sub(rolled.day_request_count))
    }

    fn check_and_admit(&self) -> Admission {
        let mut state = self.state.lock().unwrap();
        let now = unix_now();
        state.roll(now);

        let minute_open = state.minute_request_count < self.config.requests_per_minute;
        let day_open = self
            .config
            .requests_per_day
            .map_or(true, |rpd| state.day_request_count < rpd);

        if minute_open && day_open {
            state.minute_request_count += 1;
            state.day_request_count += 1;
            let snapshot = state.clone();
            drop(state);
            self.persist(&snapshot);
            return Admission::Admit;
        }

        // Wait until every exhausted window has rolled over.
        let mut wait_secs = 0u64;
        if !minute_open {
            wait_secs =
                wait_secs.max((state.minute_window_start + MINUTE_WINDOW_SECS).saturating_sub(now));
        }
        if !day_open {
            wait_secs =
                wait_secs.max((state.day_window_start + DAY_WINDOW_SECS).saturating_sub(now));
        }
        Admission::Wait(Duration::from_secs(wait_secs.max(1)))
    }

    /// Admits one request, suspending until both windows allow it.
    ///
    /// The state file is rewritten before this returns.
    pub async fn acquire(&self) -> Duration {
        let started = tokio::time::Instant::now();
        loop {
            match self.check_and_admit() {
                Admission::Admit => {
                    let waited = started.elapsed();
                    self.emit_acquired(waited);
                    return waited;
                }
                Admission::Wait(required) => {
                    self.emit_waiting(required);
                    sleep(required).await;
                }
            }
        }
    }

    /// Admits one request, suspending no later than `deadline`.
    ///
    /// Gives up with [`RelayError::QuotaExhausted`] when the exhausted
    /// window will not roll over in time.
    pub async fn acquire_before(
        &self,
        deadline: tokio::time::Instant,
    ) -> Result<Duration, RelayError> {
        let started = tokio::time::Instant::now();
        loop {
            match self.check_and_admit() {
                Admission::Admit => {
                    let waited = started.elapsed();
                    self.emit_acquired(waited);
                    return Ok(waited);
                }
                Admission::Wait(required) => {
                    if tokio::time::Instant::now() + required > deadline {
                        self.emit_exhausted(Some(required));
                        return Err(RelayError::QuotaExhausted {
                            provider: self.config.name.clone(),
                            retry_after: Some(required),
                        });
                    }
                    self.emit_waiting(required);
                    sleep(required).await;
                }
            }
        }
    }

    fn persist(&self, state: &QuotaState) {
        if let Err(_err) = self.write_state(state) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                limiter = %self.config.name,
                path = %self.path.display(),
                error = %_err,
                "failed to persist quota state"
            );
        }
    }

    /// Atomic write: serialize to a sibling temp file, then rename over
    /// the real path, so a crash mid-write leaves the previous record
    /// intact.
    fn write_state(&self, state: &QuotaState) -> io::Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&tmp, &self.path)
    }

    fn emit_acquired(&self, waited: Duration) {
        self.config.event_listeners.emit(&RateLimiterEvent::Acquired {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            waited,
        });

        #[cfg(feature = "metrics")]
        counter!("relay_limiter_admissions_total", "limiter" => self.config.name.clone())
            .increment(1);
    }

    fn emit_waiting(&self, required: Duration) {
        self.config.event_listeners.emit(&RateLimiterEvent::Waiting {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            required,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            limiter = %self.config.name,
            required_secs = required.as_secs(),
            "quota window exhausted, waiting for rollover"
        );
    }

    fn emit_exhausted(&self, retry_after: Option<Duration>) {
        self.config.event_listeners.emit(&RateLimiterEvent::Exhausted {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            retry_after,
        });

        #[cfg(feature = "metrics")]
        counter!("relay_limiter_exhaustions_total", "limiter" => self.config.name.clone())
            .increment(1);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
