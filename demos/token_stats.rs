use std::sync::Arc;
use std::time::Duration;
use token_stats_sdk::{PriceDataSource, PriceQueryController, PriceServiceConfig, QueryPolicy};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Endpoint, key and timings come from TOKEN_STATS_* variables
    let config = PriceServiceConfig::from_env()?;
    println!("Token stats from {}", config.endpoint);

    let source = Arc::new(PriceDataSource::from_config(config)?);
    let controller = PriceQueryController::new(source.clone(), QueryPolicy::from_env()?)?;
    let _poller = controller.start_polling();

    for _ in 0..6 {
        sleep(Duration::from_secs(10)).await;

        let view = controller.get_snapshot();
        println!("\n{:-<50}", "");
        match &view.data {
            Some(stats) => {
                println!("Price:       {}", stats.price);
                println!("Price (ETH): {}", stats.price_eth);
                println!("Market cap:  {}", stats.market_cap);
                println!("24h volume:  {}", stats.volume_24h);
                println!("TVL:         {}", stats.tvl);
                println!("Stale:       {}", view.is_stale);
            }
            None => println!("Status: {:?}", view.status),
        }
        if let Some(error) = &view.error {
            println!("Last error:  {}", error);
        }
    }

    let metrics = source.metrics().await;
    println!(
        "\nrequests={} failed={} cache_hits={} p50={:.0}ms p99={:.0}ms",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.cache_hits,
        metrics.latency_p50_ms,
        metrics.latency_p99_ms
    );

    Ok(())
}
