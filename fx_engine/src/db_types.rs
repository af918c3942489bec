use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fx_common::{helpers::normalize_currency_code, Amount, Rate};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::customer_identifiers;

#[derive(Debug, Clone, Error)]
#[error("Invalid {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
/// Human-readable order reference in the form `PREFIX-YYYY-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate(prefix: &str, year: i32, sequence: i64) -> Self {
        Self(format!("{prefix}-{year:04}-{sequence:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("order id: empty string".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been accepted and the receive amount is held against the reserve.
    Pending,
    /// The customer's payment on the send rail has been confirmed.
    Paid,
    /// The payout on the receive rail is under way.
    Processing,
    /// The payout has been made. Terminal.
    Completed,
    /// The order was withdrawn and its hold released. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the forward step `self -> target` is legal. Cancellation is handled by [`Self::can_cancel`].
    pub fn can_advance_to(&self, target: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, target), (Pending, Paid) | (Pending, Processing) | (Paid, Processing) | (Processing, Completed))
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        match target {
            OrderStatusType::Cancelled => self.can_cancel(),
            _ => self.can_advance_to(target),
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ConversionError(format!("order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Normalized identifier used for restriction tracking
    pub customer_id: String,
    pub send_method: String,
    pub receive_method: String,
    pub send_amount: Amount,
    pub receive_amount: Amount,
    /// The rate in force when the order was created. Never recomputed.
    pub exchange_rate: Rate,
    pub status: OrderStatusType,
    pub payment_wallet: String,
    /// Reserve currently earmarked for this order, in the receive currency
    pub hold_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Order {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.send_method, &self.receive_method)
    }

    /// Every normalized identifier the customer gave on this order, `customer_id` first.
    pub fn customer_identifiers(&self) -> Vec<String> {
        let mut ids = vec![self.customer_id.clone()];
        for id in customer_identifiers(self.customer_phone.as_deref(), self.customer_email.as_deref()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be persisted together with its hold.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_id: String,
    pub send_method: String,
    pub receive_method: String,
    pub send_amount: Amount,
    pub receive_amount: Amount,
    pub exchange_rate: Rate,
    pub payment_wallet: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// The hold placed at creation always equals the frozen receive amount.
    pub fn hold_amount(&self) -> Amount {
        self.receive_amount
    }
}

//--------------------------------------  OrderStatusChange    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub id: i64,
    pub order_id: OrderId,
    pub old_status: Option<OrderStatusType>,
    pub new_status: OrderStatusType,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

//--------------------------------------   TransactionType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Hold,
    Release,
    Payout,
    Adjustment,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Hold => write!(f, "HOLD"),
            TransactionType::Release => write!(f, "RELEASE"),
            TransactionType::Payout => write!(f, "PAYOUT"),
            TransactionType::Adjustment => write!(f, "ADJUSTMENT"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOLD" => Ok(Self::Hold),
            "RELEASE" => Ok(Self::Release),
            "PAYOUT" => Ok(Self::Payout),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            _ => Err(ConversionError(format!("transaction type: {s}"))),
        }
    }
}

//--------------------------------------    WalletEndpoint     ---------------------------------------------------------
/// Symbolic source / destination of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WalletEndpoint {
    ExchangeReserve,
    Customer,
    Operator,
}

impl Display for WalletEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletEndpoint::ExchangeReserve => write!(f, "exchange_reserve"),
            WalletEndpoint::Customer => write!(f, "customer"),
            WalletEndpoint::Operator => write!(f, "operator"),
        }
    }
}

//--------------------------------------     LedgerEntry       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub order_id: Option<OrderId>,
    pub entry_type: TransactionType,
    pub currency: String,
    /// Always positive. The direction is given by the wallet endpoints.
    pub amount: Amount,
    pub from_wallet: WalletEndpoint,
    pub to_wallet: WalletEndpoint,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The effect of this entry on the currency's reserve balance.
    pub fn signed_amount(&self) -> Amount {
        signed_delta(self.amount, self.from_wallet, self.to_wallet)
    }
}

fn signed_delta(amount: Amount, from: WalletEndpoint, to: WalletEndpoint) -> Amount {
    match (from, to) {
        (WalletEndpoint::ExchangeReserve, WalletEndpoint::ExchangeReserve) => Amount::ZERO,
        (WalletEndpoint::ExchangeReserve, _) => -amount,
        (_, WalletEndpoint::ExchangeReserve) => amount,
        _ => Amount::ZERO,
    }
}

//--------------------------------------    NewLedgerEntry     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub order_id: Option<OrderId>,
    pub entry_type: TransactionType,
    pub currency: String,
    pub amount: Amount,
    pub from_wallet: WalletEndpoint,
    pub to_wallet: WalletEndpoint,
    pub description: String,
    pub created_by: String,
}

impl NewLedgerEntry {
    /// Earmark reserve for an accepted order. Debits the reserve.
    pub fn hold(order_id: &OrderId, currency: &str, amount: Amount, actor: &str) -> Self {
        Self {
            order_id: Some(order_id.clone()),
            entry_type: TransactionType::Hold,
            currency: normalize_currency_code(currency),
            amount,
            from_wallet: WalletEndpoint::ExchangeReserve,
            to_wallet: WalletEndpoint::Customer,
            description: format!("Reserve held for order {order_id}"),
            created_by: actor.to_string(),
        }
    }

    /// Return a hold to the reserve. Credits the reserve.
    pub fn release(order_id: &OrderId, currency: &str, amount: Amount, actor: &str) -> Self {
        Self {
            order_id: Some(order_id.clone()),
            entry_type: TransactionType::Release,
            currency: normalize_currency_code(currency),
            amount,
            from_wallet: WalletEndpoint::Customer,
            to_wallet: WalletEndpoint::ExchangeReserve,
            description: format!("Hold released for order {order_id}"),
            created_by: actor.to_string(),
        }
    }

    /// Final settlement of a completed order. Debits the reserve.
    pub fn payout(order_id: &OrderId, currency: &str, amount: Amount, actor: &str) -> Self {
        Self {
            order_id: Some(order_id.clone()),
            entry_type: TransactionType::Payout,
            currency: normalize_currency_code(currency),
            amount,
            from_wallet: WalletEndpoint::ExchangeReserve,
            to_wallet: WalletEndpoint::Customer,
            description: format!("Payout for order {order_id}"),
            created_by: actor.to_string(),
        }
    }

    /// An administrative correction. A positive `delta` tops the reserve up; a negative one withdraws from it.
    pub fn adjustment(currency: &str, delta: Amount, actor: &str, description: &str) -> Self {
        let (from_wallet, to_wallet) = if delta.value() < 0 {
            (WalletEndpoint::ExchangeReserve, WalletEndpoint::Operator)
        } else {
            (WalletEndpoint::Operator, WalletEndpoint::ExchangeReserve)
        };
        let amount = if delta.value() < 0 { -delta } else { delta };
        Self {
            order_id: None,
            entry_type: TransactionType::Adjustment,
            currency: normalize_currency_code(currency),
            amount,
            from_wallet,
            to_wallet,
            description: description.to_string(),
            created_by: actor.to_string(),
        }
    }

    pub fn delta(&self) -> Amount {
        signed_delta(self.amount, self.from_wallet, self.to_wallet)
    }

    pub fn is_debit(&self) -> bool {
        self.delta().value() < 0
    }
}

//--------------------------------------       Balance         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub amount: Amount,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     CurrencyPair      ---------------------------------------------------------
/// An ordered (send, receive) currency pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    pub fn new(from: &str, to: &str) -> Self {
        Self { from: normalize_currency_code(from), to: normalize_currency_code(to) }
    }

    pub fn is_same_currency(&self) -> bool {
        self.from == self.to
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

//--------------------------------------     ExchangeRate      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Rate,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ExchangeRateHistory {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    /// `None` for the first rate configured for a pair
    pub old_rate: Option<Rate>,
    pub new_rate: Rate,
    pub changed_by: String,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

//--------------------------------------     CurrencyLimit     ---------------------------------------------------------
pub const DEFAULT_MIN_AMOUNT: Amount = Amount::from_units(5);
pub const DEFAULT_MAX_AMOUNT: Amount = Amount::from_units(10_000);

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CurrencyLimit {
    pub from_currency: String,
    pub to_currency: String,
    pub min_amount: Amount,
    pub max_amount: Amount,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

//--------------------------------------  CustomerRestriction  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CustomerRestriction {
    pub customer_id: String,
    pub cancellation_count: i64,
    pub last_cancellation_at: Option<DateTime<Utc>>,
    pub restricted_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRestriction {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.restricted_until.map(|until| until > now).unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use OrderStatusType::*;

    #[test]
    fn forward_transitions() {
        assert!(Pending.can_advance_to(Paid));
        assert!(Pending.can_advance_to(Processing));
        assert!(Paid.can_advance_to(Processing));
        assert!(Processing.can_advance_to(Completed));
        assert!(!Pending.can_advance_to(Completed));
        assert!(!Paid.can_advance_to(Completed));
        assert!(!Paid.can_advance_to(Pending));
        assert!(!Processing.can_advance_to(Paid));
        assert!(!Pending.can_advance_to(Pending));
        assert!(!Completed.can_advance_to(Completed));
        assert!(!Cancelled.can_advance_to(Paid));
    }

    #[test]
    fn cancellation_is_only_allowed_from_open_states() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [Pending, Paid, Processing, Completed, Cancelled] {
            assert_eq!(s.to_string().parse::<OrderStatusType>().unwrap(), s);
        }
        assert_eq!(" PAID ".parse::<OrderStatusType>().unwrap(), Paid);
        assert!("expired".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn order_ids() {
        assert_eq!(OrderId::generate("FX", 2026, 42).as_str(), "FX-2026-000042");
        assert_eq!(OrderId::generate("FX", 2026, 1_234_567).as_str(), "FX-2026-1234567");
    }

    #[test]
    fn entry_direction_follows_wallets() {
        let oid = OrderId::from("FX-2026-000001");
        let amount = Amount::from_units(93);
        assert_eq!(NewLedgerEntry::hold(&oid, "b", amount, "alice").delta(), -amount);
        assert_eq!(NewLedgerEntry::release(&oid, "b", amount, "ops").delta(), amount);
        assert_eq!(NewLedgerEntry::payout(&oid, "b", amount, "ops").delta(), -amount);
        let topup = NewLedgerEntry::adjustment("B", amount, "ops", "top up");
        assert_eq!(topup.amount, amount);
        assert_eq!(topup.delta(), amount);
        let withdrawal = NewLedgerEntry::adjustment("B", -amount, "ops", "sweep");
        assert_eq!(withdrawal.amount, amount);
        assert!(withdrawal.is_debit());
        assert_eq!(NewLedgerEntry::hold(&oid, " b ", amount, "alice").currency, "B");
    }

    #[test]
    fn restriction_activity() {
        let now = Utc::now();
        let mut r = CustomerRestriction {
            customer_id: "a@b.com".into(),
            cancellation_count: 3,
            last_cancellation_at: Some(now),
            restricted_until: Some(now + chrono::Duration::hours(1)),
            updated_at: now,
        };
        assert!(r.is_active_at(now));
        assert!(!r.is_active_at(now + chrono::Duration::hours(2)));
        r.restricted_until = None;
        assert!(!r.is_active_at(now));
    }
}
