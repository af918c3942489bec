use std::str::FromStr;

use fx_common::{Amount, Rate};
use fx_engine::{
    events::ChangeNotifier,
    order_objects::NewOrderRequest,
    EngineConfig,
    ExchangeGatewayDatabase,
    ExchangeRateApi,
    OrderFlowApi,
    RestrictionApi,
    SqliteDatabase,
    WalletApi,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const ADMIN: &str = "admin@exchange";

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/fx_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Error dropping database");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    debug!("🚀️ Created {url}");
}

/// Lenient conflict handling so heavily concurrent tests don't surface lock contention.
pub fn test_config() -> EngineConfig {
    EngineConfig::default().with_max_conflict_retries(10)
}

pub fn amount(s: &str) -> Amount {
    Amount::from_str(s).expect("Invalid amount")
}

pub fn rate(s: &str) -> Rate {
    Rate::from_str(s).expect("Invalid rate")
}

pub fn order_request(email: &str, send: &str, from: &str, to: &str) -> NewOrderRequest {
    NewOrderRequest {
        customer_name: "Test Customer".into(),
        customer_email: Some(email.into()),
        customer_phone: None,
        send_method: from.into(),
        receive_method: to.into(),
        send_amount: amount(send),
        payment_wallet: "wallet-0001".into(),
    }
}

#[derive(Debug)]
pub struct TestSystem {
    pub url: String,
    pub db: SqliteDatabase,
    pub config: EngineConfig,
    pub notifier: ChangeNotifier,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub rates: ExchangeRateApi<SqliteDatabase>,
    pub wallet: WalletApi<SqliteDatabase>,
    pub restrictions: RestrictionApi<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, config.max_connections).await.expect("Error creating database");
        db.migrate().await.expect("Error running DB migrations");
        let notifier = ChangeNotifier::new(config.event_buffer_size);
        let orders = OrderFlowApi::new(db.clone(), config.clone(), notifier.clone());
        let rates = ExchangeRateApi::new(db.clone(), notifier.clone());
        let wallet = WalletApi::new(db.clone(), config.clone(), notifier.clone());
        let restrictions = RestrictionApi::new(db.clone(), config.restriction_policy);
        Self { url, db, config, notifier, orders, rates, wallet, restrictions }
    }

    /// Configure `from -> to` at `rate` and set the `to` reserve.
    pub async fn seed_pair(&self, from: &str, to: &str, rate_str: &str, reserve: &str) {
        self.rates.set_exchange_rate(from, to, rate(rate_str), ADMIN, None).await.expect("Error setting rate");
        self.wallet.set_balance(to, amount(reserve), ADMIN).await.expect("Error setting balance");
    }

    pub async fn teardown(self) {
        let Self { url, mut db, .. } = self;
        if let Err(e) = db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove {url}: {e}");
        }
    }
}
