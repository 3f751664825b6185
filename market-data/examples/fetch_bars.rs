//! Fetch bars through the real producer script and print them.
//!
//! ```text
//! cargo run -p market-data --example fetch_bars -- RELIANCE 5m 2024-01-02 2024-01-05
//! ```

use anyhow::Result;
use market_data::config::ServiceConfig;
use market_data::data::{format_in_zone, parse_timestamp};
use market_data::producer::ProcessInvoker;
use market_data::request::HistoricalRequest;
use market_data::AcquisitionService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let symbol = args.first().map(String::as_str).unwrap_or("RELIANCE");
    let interval = args.get(1).map(String::as_str).unwrap_or("1d");

    let config = ServiceConfig::default();
    let tz = config.producer.timezone;

    let mut request = HistoricalRequest::new(symbol).interval(interval);
    if let (Some(start), Some(end)) = (args.get(2), args.get(3)) {
        let start = parse_timestamp(start, tz)
            .ok_or_else(|| anyhow::anyhow!("Invalid start date: {}", start))?;
        let end =
            parse_timestamp(end, tz).ok_or_else(|| anyhow::anyhow!("Invalid end date: {}", end))?;
        request = request.range(start, end);
    }

    let service = AcquisitionService::new(config, Arc::new(ProcessInvoker));
    let fetched = service.fetch(&request).await?;

    println!("{} bars for {} ({:?})", fetched.bars.len(), symbol, fetched.source);
    for bar in fetched.bars.iter().take(20) {
        println!(
            "{}  O {:>10.2}  H {:>10.2}  L {:>10.2}  C {:>10.2}  V {:>10}",
            format_in_zone(bar.timestamp, tz),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }

    service.shutdown();
    Ok(())
}
