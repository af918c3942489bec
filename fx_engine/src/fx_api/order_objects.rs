use std::fmt::Display;

use chrono::{DateTime, Utc};
use fx_common::{helpers::normalize_currency_code, Amount};
use serde::{Deserialize, Serialize};

use crate::{
    config::EngineConfig,
    db_types::{CurrencyPair, OrderId, OrderStatusType},
    fx_api::errors::OrderRejection,
    helpers::{customer_identifier, is_valid_email, is_valid_phone},
};

/// A customer's request to exchange `send_amount` of `send_method` for the equivalent in `receive_method`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub send_method: String,
    pub receive_method: String,
    pub send_amount: Amount,
    /// Where the customer wants the payout delivered on the receive rail
    pub payment_wallet: String,
}

impl NewOrderRequest {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.send_method, &self.receive_method)
    }

    /// Checks the customer fields and returns the normalized customer identifier.
    pub fn validate(&self, config: &EngineConfig) -> Result<String, OrderRejection> {
        let invalid = |msg: &str| Err(OrderRejection::Validation(msg.to_string()));
        if self.customer_name.trim().is_empty() {
            return invalid("A customer name is required");
        }
        if normalize_currency_code(&self.send_method).is_empty() ||
            normalize_currency_code(&self.receive_method).is_empty()
        {
            return invalid("Both a send method and a receive method are required");
        }
        if self.payment_wallet.trim().is_empty() {
            return invalid("A payment wallet is required");
        }
        let email = self.customer_email.as_deref().filter(|s| !s.trim().is_empty());
        let phone = self.customer_phone.as_deref().filter(|s| !s.trim().is_empty());
        if let Some(email) = email {
            if !is_valid_email(email) {
                return invalid("The email address is not valid");
            }
        }
        if let Some(phone) = phone {
            if !is_valid_phone(phone) {
                return invalid("The phone number is not valid");
            }
        }
        if phone.is_none() && config.requires_phone(&self.send_method) {
            return Err(OrderRejection::Validation(format!(
                "A phone number is required when sending {}",
                normalize_currency_code(&self.send_method)
            )));
        }
        if !self.send_amount.is_positive() {
            return invalid("The amount to send must be positive");
        }
        customer_identifier(phone, email)
            .ok_or_else(|| OrderRejection::Validation("Either an email address or a phone number is required".into()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub customer_id: Option<String>,
    pub send_method: Option<String>,
    pub receive_method: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// `customer_id` is normalized before matching.
    pub fn with_customer_id(mut self, customer_id: &str) -> Self {
        self.customer_id = Some(crate::helpers::normalize_customer_id(customer_id));
        self
    }

    pub fn with_send_method(mut self, method: &str) -> Self {
        self.send_method = Some(normalize_currency_code(method));
        self
    }

    pub fn with_receive_method(mut self, method: &str) -> Self {
        self.receive_method = Some(normalize_currency_code(method));
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.customer_id.is_none() &&
            self.send_method.is_none() &&
            self.receive_method.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(customer_id) = &self.customer_id {
            write!(f, "customer_id: {customer_id}. ")?;
        }
        if let Some(send_method) = &self.send_method {
            write!(f, "send_method: {send_method}. ")?;
        }
        if let Some(receive_method) = &self.receive_method {
            write!(f, "receive_method: {receive_method}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: {statuses}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request() -> NewOrderRequest {
        NewOrderRequest {
            customer_name: "Alice".into(),
            customer_email: Some("Alice@Example.com".into()),
            customer_phone: None,
            send_method: "usd".into(),
            receive_method: "kes".into(),
            send_amount: Amount::from_units(100),
            payment_wallet: "0712345678".into(),
        }
    }

    #[test]
    fn valid_request_yields_normalized_identifier() {
        let config = EngineConfig::default();
        assert_eq!(request().validate(&config).unwrap(), "alice@example.com");
        let req = NewOrderRequest { customer_phone: Some("+254 712 345 678".into()), ..request() };
        assert_eq!(req.validate(&config).unwrap(), "+254712345678");
        assert_eq!(req.pair(), CurrencyPair::new("USD", "KES"));
    }

    #[test]
    fn missing_contact_details() {
        let config = EngineConfig::default();
        let req = NewOrderRequest { customer_email: None, customer_phone: Some("  ".into()), ..request() };
        assert_eq!(req.validate(&config).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn malformed_fields() {
        let config = EngineConfig::default();
        for req in [
            NewOrderRequest { customer_name: " ".into(), ..request() },
            NewOrderRequest { customer_email: Some("not-an-email".into()), ..request() },
            NewOrderRequest { customer_phone: Some("call me".into()), ..request() },
            NewOrderRequest { payment_wallet: "".into(), ..request() },
            NewOrderRequest { receive_method: " ".into(), ..request() },
            NewOrderRequest { send_amount: Amount::ZERO, ..request() },
            NewOrderRequest { send_amount: Amount::from_units(-3), ..request() },
        ] {
            assert!(matches!(req.validate(&config), Err(OrderRejection::Validation(_))), "{req:?}");
        }
    }

    #[test]
    fn phone_required_for_configured_send_methods() {
        let config = EngineConfig { phone_required_methods: vec!["USD".into()], ..Default::default() };
        let err = request().validate(&config).unwrap_err();
        assert!(err.to_string().contains("phone number is required"));
        let req = NewOrderRequest { customer_phone: Some("0712345678".into()), ..request() };
        assert_eq!(req.validate(&config).unwrap(), "0712345678");
    }

    #[test]
    fn query_filter() {
        assert!(OrderQueryFilter::default().is_empty());
        let q = OrderQueryFilter::default()
            .with_status(OrderStatusType::Pending)
            .with_status(OrderStatusType::Paid)
            .with_customer_id(" A@B.com ");
        assert_eq!(q.status.as_ref().unwrap().len(), 2);
        assert_eq!(q.customer_id.as_deref(), Some("a@b.com"));
        assert!(!q.is_empty());
        assert_eq!(q.to_string(), "customer_id: a@b.com. statuses: pending,paid. ");
    }
}
