use std::time::Duration;

use model_relay_core::{EventListeners, FnListener};

use crate::events::RateLimiterEvent;

/// Configuration shared by both limiter variants.
pub struct RateLimiterConfig {
    pub(crate) requests_per_minute: u32,
    pub(crate) requests_per_day: Option<u32>,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// The provider identity this limiter gates.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests-per-minute ceiling.
    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Requests-per-day ceiling, if configured.
    pub fn requests_per_day(&self) -> Option<u32> {
        self.requests_per_day
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    requests_per_minute: u32,
    requests_per_day: Option<u32>,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - requests_per_minute: 60
    /// - requests_per_day: none
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_day: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the requests-per-minute ceiling.
    ///
    /// For the token bucket this is also the bucket capacity; for the
    /// persistent variant it is the minute-window ceiling.
    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = rpm;
        self
    }

    /// Sets the requests-per-day ceiling.
    ///
    /// Only enforced by the persistent variant; the in-memory bucket has
    /// no day accounting.
    pub fn requests_per_day(mut self, rpd: u32) -> Self {
        self.requests_per_day = Some(rpd);
        self
    }

    /// Sets the name for this limiter instance (used in events and as the
    /// persistent state filename).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a request is admitted.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - how long the request waited for admission; close to
    /// zero when quota was immediately available.
    pub fn on_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::Acquired { waited, .. } = event {
                    f(*waited);
                }
            }));
        self
    }

    /// Registers a callback when admission is abandoned because the wait
    /// would exceed the caller's deadline.
    ///
    /// # Callback Signature
    /// `Fn(Option<Duration>)` - the wait that would have been required, if
    /// known.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Duration>) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::Exhausted { retry_after, .. } = event {
                    f(*retry_after);
                }
            }));
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if `requests_per_minute` is zero, or `requests_per_day` is
    /// configured below `requests_per_minute` (a single minute could never
    /// fill, which is almost certainly a typo).
    pub fn build(self) -> RateLimiterConfig {
        if self.requests_per_minute == 0 {
            panic!("requests_per_minute must be at least 1");
        }
        if let Some(rpd) = self.requests_per_day {
            if rpd < self.requests_per_minute {
                panic!("requests_per_day must be at least requests_per_minute");
            }
        }

        RateLimiterConfig {
            requests_per_minute: self.requests_per_minute,
            requests_per_day: self.requests_per_day,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
