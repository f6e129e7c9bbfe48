//! Display formatting for token stats
//!
//! Pure functions over a `PricePayload`. Amounts use a compact suffix rule:
//! below one thousand the literal value with 2 decimals, then `K`, then `M`.
//! Prices switch to exponential notation below `0.0001`.

use crate::types::PricePayload;
use serde::{Deserialize, Serialize};

const THOUSAND: f64 = 1_000.0;
const MILLION: f64 = 1_000_000.0;
const EXPONENTIAL_BELOW: f64 = 0.0001;
const NOT_AVAILABLE: &str = "N/A";

/// Display strings derived from one payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedStats {
    pub price: String,
    pub price_eth: String,
    pub market_cap: String,
    pub circulating_supply: String,
    pub total_supply: String,
    pub volume_24h: String,
    pub tvl: String,
    pub price_change_24h: Option<String>,
}

impl FormattedStats {
    pub fn from_payload(payload: &PricePayload) -> Self {
        Self {
            price: formatted_price(payload),
            price_eth: price_in_eth_units(payload),
            market_cap: formatted_market_cap(payload),
            circulating_supply: format_supply(payload.circulating_supply),
            total_supply: format_supply(payload.total_supply),
            volume_24h: formatted_24h_volume(payload),
            tvl: formatted_tvl(payload),
            price_change_24h: payload.price_change_24h.map(format_percent_change),
        }
    }
}

/// USD price of the token
pub fn formatted_price(payload: &PricePayload) -> String {
    format_price(payload.price_usd)
}

pub fn formatted_market_cap(payload: &PricePayload) -> String {
    format_usd_compact(payload.market_cap)
}

pub fn formatted_24h_volume(payload: &PricePayload) -> String {
    format_usd_compact(payload.volume_24h)
}

pub fn formatted_tvl(payload: &PricePayload) -> String {
    format_usd_compact(payload.tvl)
}

/// ETH price of the token, e.g. `"4.1000e-9 ETH"`
pub fn price_in_eth_units(payload: &PricePayload) -> String {
    let price = format_price(payload.price_eth);
    if price == NOT_AVAILABLE {
        price
    } else {
        format!("{} ETH", price)
    }
}

/// Formats a unit price
///
/// * `0 < |p| < 0.0001` -> exponential with 4 fractional digits (`9.9990e-5`)
/// * `|p| < 1000` -> 6 decimals (`0.123456`)
/// * otherwise compact suffix without a currency sign (`1.50K`)
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let magnitude = price.abs();
    if magnitude > 0.0 && magnitude < EXPONENTIAL_BELOW {
        format!("{:.4e}", price)
    } else if round_to(magnitude, 6) < THOUSAND {
        format!("{:.6}", price)
    } else {
        compact(price, "")
    }
}

/// Formats a dollar amount with the compact suffix rule (`$150.00`, `$2.50K`, `$1.50M`)
pub fn format_usd_compact(value: f64) -> String {
    compact(value, "$")
}

/// Formats a token quantity with the compact suffix rule, no currency sign
pub fn format_supply(value: f64) -> String {
    compact(value, "")
}

/// Signed percentage with 2 decimals (`+3.25%`, `-0.50%`)
pub fn format_percent_change(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("{:+.2}%", value)
}

fn compact(value: f64, prefix: &str) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();

    // Suffix is picked from the figure as it will be printed
    if round_to(magnitude / THOUSAND, 2) >= THOUSAND {
        format!("{}{}{:.2}M", sign, prefix, magnitude / MILLION)
    } else if round_to(magnitude, 2) >= THOUSAND {
        format!("{}{}{:.2}K", sign, prefix, magnitude / THOUSAND)
    } else {
        format!("{}{}{:.2}", sign, prefix, magnitude)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
