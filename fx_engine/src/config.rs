//! Engine configuration.
//!
//! Everything the engine needs is carried in an explicit [`EngineConfig`] value; nothing is read from the environment
//! after start-up. [`EngineConfig::from_env_or_default`] builds one from `FX_*` environment variables, logging and
//! falling back to the default for any value that is missing or malformed.
use std::{env, fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use fx_common::helpers::parse_code_list;
use log::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/fx_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ORDER_ID_PREFIX: &str = "FX";
const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
const DEFAULT_CANCELLATION_THRESHOLD: u32 = 3;
const DEFAULT_CANCELLATION_WINDOW_HOURS: i64 = 24;
const DEFAULT_RESTRICTION_COOLDOWN_HOURS: i64 = 24;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Prefix of generated order ids, e.g. `FX` in `FX-2026-000042`
    pub order_id_prefix: String,
    /// How many times a unit of work that lost a lock race is retried before the conflict is surfaced
    pub max_conflict_retries: u32,
    pub restriction_policy: RestrictionPolicy,
    /// Capacity of the change-notifier buffer. Subscribers that fall further behind than this lose events.
    pub event_buffer_size: usize,
    /// Send methods (currency codes) for which the customer must supply a phone number
    pub phone_required_methods: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            restriction_policy: RestrictionPolicy::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            phone_required_methods: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("FX_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ FX_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env("FX_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let order_id_prefix = env::var("FX_ORDER_ID_PREFIX")
            .ok()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ORDER_ID_PREFIX.to_string());
        let max_conflict_retries = parse_env("FX_MAX_CONFLICT_RETRIES", DEFAULT_MAX_CONFLICT_RETRIES);
        let threshold = parse_env("FX_CANCELLATION_THRESHOLD", DEFAULT_CANCELLATION_THRESHOLD);
        let window = parse_env("FX_CANCELLATION_WINDOW_HOURS", DEFAULT_CANCELLATION_WINDOW_HOURS);
        let cooldown = parse_env("FX_RESTRICTION_COOLDOWN_HOURS", DEFAULT_RESTRICTION_COOLDOWN_HOURS);
        let restriction_policy = RestrictionPolicy::new(threshold, Duration::hours(window), Duration::hours(cooldown));
        let event_buffer_size = parse_env("FX_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        let phone_required_methods = parse_code_list(env::var("FX_PHONE_REQUIRED_METHODS").ok());
        Self {
            database_url,
            max_connections,
            order_id_prefix,
            max_conflict_retries,
            restriction_policy,
            event_buffer_size,
            phone_required_methods,
        }
    }

    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database_url = url.to_string();
        self
    }

    pub fn with_restriction_policy(mut self, policy: RestrictionPolicy) -> Self {
        self.restriction_policy = policy;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn requires_phone(&self, send_method: &str) -> bool {
        self.phone_required_methods.iter().any(|m| m.eq_ignore_ascii_case(send_method.trim()))
    }
}

fn parse_env<T>(var: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match env::var(var) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

//--------------------------------------   RestrictionPolicy   ---------------------------------------------------------
/// Anti-abuse policy for customers who repeatedly cancel orders.
///
/// A customer whose cancellations within the trailing `window` reach `threshold` is barred from creating new orders
/// for `cooldown`, measured from the cancellation that tripped the threshold. A threshold of zero disables the policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestrictionPolicy {
    pub threshold: u32,
    pub window: Duration,
    pub cooldown: Duration,
}

impl Default for RestrictionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CANCELLATION_THRESHOLD,
            window: Duration::hours(DEFAULT_CANCELLATION_WINDOW_HOURS),
            cooldown: Duration::hours(DEFAULT_RESTRICTION_COOLDOWN_HOURS),
        }
    }
}

impl RestrictionPolicy {
    pub fn new(threshold: u32, window: Duration, cooldown: Duration) -> Self {
        Self { threshold, window, cooldown }
    }

    /// The number of cancellations that fall inside the trailing window ending at `now`.
    pub fn count_recent(&self, cancellations: &[DateTime<Utc>], now: DateTime<Utc>) -> u32 {
        let start = now - self.window;
        let n = cancellations.iter().filter(|t| **t >= start && **t <= now).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// The restriction end time produced by `recent` cancellations at `now`, if any.
    pub fn restriction_for(&self, recent: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.threshold > 0 && recent >= self.threshold).then(|| now + self.cooldown)
    }
}
