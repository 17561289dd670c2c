// REST client for the brokerage trading and data APIs

use super::types::*;
use crate::config::BrokerConfig;
use crate::errors::{ BrokerError, ConfigurationError };
use crate::logger::{ log, LogTag };
use crate::marketdata::Timeframe;
use chrono::{ DateTime, SecondsFormat, Utc };
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Hard ceiling on bar pagination, in case the API never stops handing out
/// page tokens
const MAX_BAR_PAGES: usize = 50;

pub struct BrokerClient {
    http: reqwest::Client,
    trading_base: Url,
    data_base: Url,
    key_id: String,
    secret: String,
    request_timeout_ms: u64,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl BrokerClient {
    pub fn from_config(
        cfg: &BrokerConfig,
        key_id: String,
        secret: String
    ) -> Result<Self, ConfigurationError> {
        let trading_base = Url::parse(&cfg.api_base_url).map_err(
            |e| ConfigurationError::InvalidUrl {
                url: cfg.api_base_url.clone(),
                error: e.to_string(),
            }
        )?;

        let data_base = Url::parse(&cfg.data_base_url).map_err(
            |e| ConfigurationError::InvalidUrl {
                url: cfg.data_base_url.clone(),
                error: e.to_string(),
            }
        )?;

        let http = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "broker".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            trading_base,
            data_base,
            key_id,
            secret,
            request_timeout_ms: cfg.request_timeout_secs * 1000,
            max_retries: cfg.max_retries.max(1),
            retry_base_delay_ms: cfg.retry_base_delay_ms,
        })
    }

    fn trading_url(&self, path: &str) -> Result<Url, BrokerError> {
        self.trading_base.join(path).map_err(|e| BrokerError::Http {
            endpoint: path.to_string(),
            error: format!("invalid URL: {}", e),
        })
    }

    fn data_url(&self, path: &str) -> Result<Url, BrokerError> {
        self.data_base.join(path).map_err(|e| BrokerError::Http {
            endpoint: path.to_string(),
            error: format!("invalid URL: {}", e),
        })
    }

    /// Send one authenticated request with retry on transient failures.
    ///
    /// Retries up to `max_retries` attempts total, with exponential backoff
    /// from `retry_base_delay_ms`. A 429 with a Retry-After header uses that
    /// delay instead.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>
    ) -> Result<reqwest::Response, BrokerError> {
        let endpoint = url.path().to_string();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let mut request = self.http
                .request(method.clone(), url.clone())
                .header("APCA-API-KEY-ID", &self.key_id)
                .header("APCA-API-SECRET-KEY", &self.secret);

            if let Some(json) = body {
                request = request.json(json);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response);
                }
                Ok(response) => Self::error_from_response(&endpoint, response).await,
                Err(e) if e.is_timeout() =>
                    BrokerError::ConnectionTimeout {
                        endpoint: endpoint.clone(),
                        timeout_ms: self.request_timeout_ms,
                    },
                Err(e) =>
                    BrokerError::Http {
                        endpoint: endpoint.clone(),
                        error: e.to_string(),
                    },
            };

            if !error.is_retryable() || attempt >= self.max_retries {
                return Err(error);
            }

            let delay_ms = match &error {
                BrokerError::RateLimited { retry_after_secs: Some(secs) } => secs * 1000,
                _ => self.retry_base_delay_ms * (2u64).pow(attempt - 1),
            };

            log(
                LogTag::Broker,
                "RETRY",
                &format!(
                    "{} {} failed (attempt {}/{}): {} - retrying in {}ms",
                    method,
                    endpoint,
                    attempt,
                    self.max_retries,
                    error,
                    delay_ms
                )
            );

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    /// Map a non-success response to a structured error
    async fn error_from_response(endpoint: &str, response: reqwest::Response) -> BrokerError {
        let status = response.status().as_u16();

        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response.text().await.unwrap_or_default();
        let message = Self::extract_api_message(&body);

        match status {
            401 => BrokerError::Auth { message },
            429 => BrokerError::RateLimited { retry_after_secs },
            _ =>
                BrokerError::Api {
                    status,
                    message: if message.is_empty() {
                        format!("request to {} failed", endpoint)
                    } else {
                        message
                    },
                },
        }
    }

    /// API errors carry a JSON body like {"code":40310000,"message":"..."}
    fn extract_api_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| body.trim().chars().take(200).collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BrokerError> {
        let endpoint = url.path().to_string();
        let response = self.execute(Method::GET, url, None).await?;
        response.json::<T>().await.map_err(|e| BrokerError::Decode {
            endpoint,
            error: e.to_string(),
        })
    }

    // =========================================================================
    // TRADING API
    // =========================================================================

    /// Account snapshot; also serves as the startup credential probe
    pub async fn get_account(&self) -> Result<Account, BrokerError> {
        let url = self.trading_url("/v2/account")?;
        self.get_json(url).await
    }

    /// Submit a market day order.
    ///
    /// `client_order_id` makes the submission idempotent on the broker side -
    /// resubmitting with the same id cannot double-fill.
    pub async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        client_order_id: &str
    ) -> Result<Order, BrokerError> {
        let url = self.trading_url("/v2/orders")?;
        let endpoint = url.path().to_string();

        let body =
            serde_json::json!({
            "symbol": symbol,
            "qty": format_qty(qty),
            "side": side.as_str(),
            "type": "market",
            "time_in_force": "day",
            "client_order_id": client_order_id,
        });

        crate::logger::debug(
            LogTag::Broker,
            &format!("Submitting {} market order: {} x {}", side, symbol, format_qty(qty))
        );

        let response = self
            .execute(Method::POST, url, Some(&body)).await
            .map_err(|e| reject_order_errors(e, symbol))?;

        response.json::<Order>().await.map_err(|e| BrokerError::Decode {
            endpoint,
            error: e.to_string(),
        })
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, BrokerError> {
        let url = self.trading_url(&format!("/v2/orders/{}", order_id))?;
        self.get_json(url).await
    }

    /// Cancel an order. Already-gone (404) and already-terminal (422)
    /// responses count as success so callers can cancel blindly.
    pub async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let url = self.trading_url(&format!("/v2/orders/{}", order_id))?;

        match self.execute(Method::DELETE, url, None).await {
            Ok(_) => Ok(()),
            Err(BrokerError::Api { status: 404, .. }) => Ok(()),
            Err(BrokerError::Api { status: 422, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // DATA API
    // =========================================================================

    /// Fetch bars for a window, following `next_page_token` until exhausted.
    /// The result is sorted ascending and deduped on timestamp.
    pub async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize
    ) -> Result<Vec<Bar>, BrokerError> {
        let mut all_bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;

        for _page in 0..MAX_BAR_PAGES {
            let mut url = self.data_url(&format!("/v2/stocks/{}/bars", symbol))?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("timeframe", timeframe.as_str());
                pairs.append_pair("start", &start.to_rfc3339_opts(SecondsFormat::Secs, true));
                pairs.append_pair("end", &end.to_rfc3339_opts(SecondsFormat::Secs, true));
                pairs.append_pair("limit", &limit.to_string());
                if let Some(token) = &page_token {
                    pairs.append_pair("page_token", token);
                }
            }

            let page: BarsResponse = self.get_json(url).await?;

            if let Some(bars) = page.bars {
                all_bars.extend(bars);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    page_token = Some(token);
                }
                _ => {
                    break;
                }
            }
        }

        all_bars.sort_by_key(|b| b.t);
        all_bars.dedup_by_key(|b| b.t);

        Ok(all_bars)
    }

    /// Latest trade, normalized: a missing trade or a non-finite/non-positive
    /// price becomes `price: None` instead of an error.
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let url = self.data_url(&format!("/v2/stocks/{}/trades/latest", symbol))?;
        let raw: LatestTradeResponse = self.get_json(url).await?;

        let price = raw.trade
            .as_ref()
            .and_then(|t| t.price)
            .filter(|p| p.is_finite() && *p > 0.0);

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            timestamp: raw.trade.and_then(|t| t.timestamp),
        })
    }
}

/// Order placements surface buying-power (403) and validation (422) failures
/// as rejections with the broker's reason attached
fn reject_order_errors(error: BrokerError, symbol: &str) -> BrokerError {
    match error {
        BrokerError::Api { status: 403, message } =>
            BrokerError::OrderRejected {
                symbol: symbol.to_string(),
                reason: message,
            },
        BrokerError::Api { status: 422, message } =>
            BrokerError::OrderRejected {
                symbol: symbol.to_string(),
                reason: message,
            },
        other => other,
    }
}

/// Whole-number quantities submit as integers, fractional as trimmed decimals
fn format_qty(qty: f64) -> String {
    if qty.fract().abs() < 1e-9 {
        format!("{}", qty as i64)
    } else {
        let fixed = format!("{:.9}", qty);
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> BrokerClient {
        BrokerClient::from_config(
            &BrokerConfig::default(),
            "key".to_string(),
            "secret".to_string()
        ).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = test_client();
        let url = client.trading_url("/v2/orders/abc-123").unwrap();
        assert_eq!(url.as_str(), "https://paper-api.alpaca.markets/v2/orders/abc-123");

        let url = client.data_url("/v2/stocks/SPY/bars").unwrap();
        assert_eq!(url.as_str(), "https://data.alpaca.markets/v2/stocks/SPY/bars");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let cfg = BrokerConfig {
            api_base_url: "not a url".to_string(),
            ..BrokerConfig::default()
        };
        assert!(BrokerClient::from_config(&cfg, String::new(), String::new()).is_err());
    }

    #[test]
    fn test_format_qty() {
        assert_eq!(format_qty(1.0), "1");
        assert_eq!(format_qty(10.0), "10");
        assert_eq!(format_qty(0.5), "0.5");
        assert_eq!(format_qty(2.25), "2.25");
    }

    #[test]
    fn test_extract_api_message() {
        let body = r#"{"code":40310000,"message":"insufficient buying power"}"#;
        assert_eq!(BrokerClient::extract_api_message(body), "insufficient buying power");

        assert_eq!(BrokerClient::extract_api_message("plain text error"), "plain text error");
    }

    #[test]
    fn test_order_rejection_mapping() {
        let api = BrokerError::Api {
            status: 403,
            message: "insufficient buying power".to_string(),
        };
        let mapped = reject_order_errors(api, "SPY");
        assert!(matches!(mapped, BrokerError::OrderRejected { .. }));
        assert!(!mapped.is_retryable());

        let server = BrokerError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        let mapped = reject_order_errors(server, "SPY");
        assert!(mapped.is_retryable());
    }
}
