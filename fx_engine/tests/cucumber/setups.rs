use cucumber::given;

use crate::{
    cucumber::ExchangeWorld,
    support::prepare_env::{amount, rate, TestSystem, ADMIN},
};

#[given("a fresh install")]
async fn fresh_database(world: &mut ExchangeWorld) {
    world.system = Some(TestSystem::new().await);
}

#[given(expr = "the exchange rate from {word} to {word} is {word}")]
async fn set_rate(world: &mut ExchangeWorld, from: String, to: String, value: String) {
    world.sys().rates.set_exchange_rate(&from, &to, rate(&value), ADMIN, None).await.expect("Error setting rate");
}

#[given(expr = "the {word} reserve is {word}")]
async fn set_reserve(world: &mut ExchangeWorld, currency: String, value: String) {
    world.sys().wallet.set_balance(&currency, amount(&value), ADMIN).await.expect("Error setting reserve");
}
