use fx_common::{Amount, Rate};

use crate::{
    db_types::{CurrencyLimit, CurrencyPair, ExchangeRate, ExchangeRateHistory},
    traits::{EngineError, RateChange},
};

#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// Fetch the current rate for the ordered pair, or `None` if the pair has never been configured.
    async fn fetch_exchange_rate(&self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>, EngineError>;

    /// All configured rates, ordered by pair.
    async fn fetch_exchange_rates(&self) -> Result<Vec<ExchangeRate>, EngineError>;

    /// Set the rate for the ordered pair. The previous rate (if any) and the new rate are recorded in the rate
    /// history in the same unit of work.
    async fn set_exchange_rate(
        &self,
        pair: &CurrencyPair,
        rate: Rate,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<RateChange, EngineError>;

    /// The full change history for the pair, oldest first.
    async fn fetch_rate_history(&self, pair: &CurrencyPair) -> Result<Vec<ExchangeRateHistory>, EngineError>;

    /// The explicitly configured limits for the pair, or `None` if the defaults apply.
    async fn fetch_currency_limit(&self, pair: &CurrencyPair) -> Result<Option<CurrencyLimit>, EngineError>;

    /// Create or replace the limits for the pair. The caller is responsible for validating `min` and `max`.
    async fn set_currency_limit(
        &self,
        pair: &CurrencyPair,
        min: Amount,
        max: Amount,
        actor: &str,
    ) -> Result<CurrencyLimit, EngineError>;
}
