//! Shared fixtures for unit tests

use crate::types::PricePayload;

pub fn sample_payload(price_usd: f64) -> PricePayload {
    PricePayload {
        price_usd,
        price_eth: price_usd / 2_500.0,
        market_cap: 1_500_000.0,
        circulating_supply: 120_000_000.0,
        total_supply: 200_000_000.0,
        volume_24h: 2_500.0,
        tvl: 150.0,
        price_change_24h: Some(1.5),
    }
}
