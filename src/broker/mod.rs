// Brokerage API access - global client instance plus wire types

mod client;
mod types;

pub use client::BrokerClient;
pub use types::{ Account, Bar, Order, OrderSide, OrderStatus, Quote };

use crate::errors::BotError;
use crate::logger::{ log, LogTag };
use once_cell::sync::OnceCell;

static BROKER: OnceCell<BrokerClient> = OnceCell::new();

const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Build the global client from config and credentials. Call once at startup
/// before any service that talks to the broker.
pub fn init_broker() -> Result<(), BotError> {
    let (key_id, secret) = crate::config::broker_credentials()?;
    let mut broker_cfg = crate::config::with_config(|cfg| cfg.broker.clone());

    // --paper overrides whatever endpoint the config names
    if crate::arguments::is_paper_forced() && broker_cfg.api_base_url != PAPER_BASE_URL {
        log(
            LogTag::Broker,
            "INFO",
            &format!("CLI override: --paper replaces {}", broker_cfg.api_base_url),
        );
        broker_cfg.api_base_url = PAPER_BASE_URL.to_string();
    }

    let client = BrokerClient::from_config(&broker_cfg, key_id, secret)?;

    if BROKER.set(client).is_err() {
        log(LogTag::Broker, "WARN", "Broker client already initialized");
    } else {
        log(LogTag::Broker, "INIT", &format!("Broker client ready ({})", broker_cfg.api_base_url));
    }

    Ok(())
}

/// Global client accessor
pub fn broker() -> &'static BrokerClient {
    BROKER.get().expect("Broker client not initialized. Call init_broker() first.")
}

/// One authenticated account probe to fail fast on bad credentials
pub async fn verify_credentials() -> Result<Account, BotError> {
    let account = broker().get_account().await?;

    log(
        LogTag::Broker,
        "SUCCESS",
        &format!(
            "Connected to account {} ({}) - buying power {:.2}",
            account.id,
            account.status,
            account.buying_power
        )
    );

    Ok(account)
}
