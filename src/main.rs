use anyhow::Context;
use binance_connect::exchanges::binance::streams;
use binance_connect::exchanges::binance::types::OrderBookRequest;
use binance_connect::{BinanceApi, ClientConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Credentials are optional; without them only public calls work.
    let config = ClientConfig::from_env("BINANCE").unwrap_or_else(|_| ClientConfig::read_only());
    let api = BinanceApi::new(config).context("building client")?;

    let time = api
        .futures
        .market
        .check_server_time()
        .await
        .context("fetching futures server time")?;
    println!("Futures server time: {}", time.server_time);

    let book = api
        .futures
        .market
        .get_order_book(&OrderBookRequest {
            symbol: Some("BTCUSDT".to_string()),
            limit: Some(5),
        })
        .await?;
    for (price, quantity) in &book.bids {
        println!("bid {price} x {quantity}");
    }

    let (handle, mut trades) = api
        .realtime
        .futures_market()
        .subscribe_channel(streams::agg_trade("BTCUSDT"))?;
    let deadline = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = trades.recv() => match event {
                Some(Ok(event)) => println!("{event:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    api.realtime.futures_market().unsubscribe(&handle).await;
    api.realtime.close().await;
    Ok(())
}
