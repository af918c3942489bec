use std::fmt::Debug;

use fx_common::{Amount, Rate};
use log::*;

use crate::{
    db_types::{CurrencyLimit, CurrencyPair, ExchangeRate, ExchangeRateHistory, DEFAULT_MAX_AMOUNT, DEFAULT_MIN_AMOUNT},
    events::{ChangeNotifier, EventType, ExchangeRateEvent},
    fx_api::{
        errors::OrderRejection,
        quote_objects::{EffectiveLimits, PairQuote},
    },
    traits::{ExchangeRates, WalletLedger},
};

/// Rate and limit resolution, plus the administrative calls that maintain rates and limits.
pub struct ExchangeRateApi<B> {
    db: B,
    notifier: ChangeNotifier,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B> {
    pub fn new(db: B, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates + WalletLedger
{
    /// The rate and configured limits for `from -> to`. Fails closed: a pair without a configured rate is
    /// [`OrderRejection::UntradablePair`].
    pub async fn resolve(&self, from: &str, to: &str) -> Result<PairQuote, OrderRejection> {
        resolve_pair(&self.db, &CurrencyPair::new(from, to)).await
    }

    /// The send-amount bounds in force right now, taking the receive-currency reserve into account.
    pub async fn effective_limits(&self, from: &str, to: &str) -> Result<EffectiveLimits, OrderRejection> {
        let quote = self.resolve(from, to).await?;
        let reserve = self.db.fetch_balance(&quote.pair.to).await?;
        Ok(EffectiveLimits::derive(&quote, reserve)?)
    }

    pub async fn rates(&self) -> Result<Vec<ExchangeRate>, OrderRejection> {
        Ok(self.db.fetch_exchange_rates().await?)
    }

    pub async fn rate_history(&self, from: &str, to: &str) -> Result<Vec<ExchangeRateHistory>, OrderRejection> {
        Ok(self.db.fetch_rate_history(&CurrencyPair::new(from, to)).await?)
    }

    /// Set the rate for `from -> to`. Existing orders keep the rate they were created with.
    pub async fn set_exchange_rate(
        &self,
        from: &str,
        to: &str,
        rate: Rate,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<ExchangeRate, OrderRejection> {
        let actor = require_actor(actor)?;
        let pair = CurrencyPair::new(from, to);
        if pair.from.is_empty() || pair.to.is_empty() {
            return Err(OrderRejection::Validation("Both currencies are required".into()));
        }
        if pair.is_same_currency() {
            return Err(OrderRejection::Validation(format!("Cannot set a rate from {} to itself", pair.from)));
        }
        if !rate.is_positive() {
            return Err(OrderRejection::Validation(format!("Exchange rates must be positive, got {rate}")));
        }
        let change = self.db.set_exchange_rate(&pair, rate, actor, reason).await?;
        let old_rate = change.history.old_rate.map(|r| r.to_string());
        info!("🔄️💱️ Rate for {pair} changed from {old_rate:?} to {rate} by {actor}");
        let event = ExchangeRateEvent {
            from_currency: pair.from.clone(),
            to_currency: pair.to.clone(),
            old_rate: change.history.old_rate,
            new_rate: change.history.new_rate,
            changed_by: actor.to_string(),
            reason: change.history.reason.clone(),
        };
        self.notifier.broadcast(EventType::ExchangeRateUpdate, &event);
        Ok(change.rate)
    }

    /// Set the send-amount limits for `from -> to`. Requires `0 < min <= max`.
    pub async fn set_currency_limit(
        &self,
        from: &str,
        to: &str,
        min: Amount,
        max: Amount,
        actor: &str,
    ) -> Result<CurrencyLimit, OrderRejection> {
        let actor = require_actor(actor)?;
        let pair = CurrencyPair::new(from, to);
        if pair.from.is_empty() || pair.to.is_empty() {
            return Err(OrderRejection::Validation("Both currencies are required".into()));
        }
        if !min.is_positive() || max < min {
            return Err(OrderRejection::Validation(format!(
                "Limits must satisfy 0 < min <= max. Got min {min}, max {max}"
            )));
        }
        let limit = self.db.set_currency_limit(&pair, min, max, actor).await?;
        info!("🔄️💱️ Limits for {pair} set to [{min}, {max}] by {actor}");
        self.notifier.broadcast(EventType::CurrencyLimitUpdate, &limit);
        Ok(limit)
    }
}

/// Looks up the rate and limits for `pair`, falling back to the default limits when none are configured.
pub(crate) async fn resolve_pair<B: ExchangeRates>(db: &B, pair: &CurrencyPair) -> Result<PairQuote, OrderRejection> {
    let untradable = || OrderRejection::UntradablePair { from: pair.from.clone(), to: pair.to.clone() };
    if pair.is_same_currency() || pair.from.is_empty() || pair.to.is_empty() {
        return Err(untradable());
    }
    let rate = db.fetch_exchange_rate(pair).await?.ok_or_else(untradable)?;
    let (min_amount, max_amount) = match db.fetch_currency_limit(pair).await? {
        Some(limit) => (limit.min_amount, limit.max_amount),
        None => (DEFAULT_MIN_AMOUNT, DEFAULT_MAX_AMOUNT),
    };
    trace!("🔄️💱️ {pair} resolved at {} with limits [{min_amount}, {max_amount}]", rate.rate);
    Ok(PairQuote { pair: pair.clone(), rate: rate.rate, min_amount, max_amount })
}

pub(crate) fn require_actor(actor: &str) -> Result<&str, OrderRejection> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(OrderRejection::Validation("An actor identity is required".into()));
    }
    Ok(actor)
}
