use cucumber::World;
use fx_engine::{db_types::Order, OrderRejection};

use crate::support::prepare_env::TestSystem;

#[derive(Default, Debug, World)]
pub struct ExchangeWorld {
    pub system: Option<TestSystem>,
    pub last_order: Option<Order>,
    pub last_error: Option<OrderRejection>,
}

impl ExchangeWorld {
    pub fn sys(&self) -> &TestSystem {
        self.system.as_ref().expect("Exchange not initialised")
    }

    pub fn order(&self) -> &Order {
        self.last_order.as_ref().expect("No order has been placed")
    }

    pub fn record<T>(&mut self, result: Result<T, OrderRejection>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                self.last_error = Some(e);
                None
            },
        }
    }
}
