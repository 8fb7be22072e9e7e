// =============================================================================
// Market Sync — Main Entry Point
// =============================================================================
//
// Watches order books, trades and tickers for the configured symbols and
// logs what arrives. Each watch loop backs off for 5s after an error; the
// client reconnects and renegotiates on the next call.
// =============================================================================

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use market_sync::{SyncClient, SyncConfig};

const CONFIG_PATH: &str = "sync_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Market Sync — starting up");

    let mut config = SyncConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        SyncConfig::default()
    });
    if let Ok(raw) = std::env::var("SYNC_SYMBOLS") {
        config.apply_symbols_override(&raw);
    }
    info!(symbols = ?config.symbols, "Configuration loaded");

    // ── 2. Client ────────────────────────────────────────────────────────
    let client = Arc::new(SyncClient::kucoin(config.clone())?);

    // ── 3. Spawn watch loops ─────────────────────────────────────────────
    for symbol in &config.symbols {
        // Order book
        let c = client.clone();
        let sym = symbol.clone();
        tokio::spawn(async move {
            loop {
                match c.watch_order_book(&sym, None).await {
                    Ok(book) => info!(
                        symbol = %sym,
                        nonce = ?book.nonce,
                        best_bid = ?book.best_bid(),
                        best_ask = ?book.best_ask(),
                        spread = ?book.spread(),
                        "order book"
                    ),
                    Err(e) => {
                        error!(symbol = %sym, error = %e, "Order book watch error — retrying in 5s");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });

        // Trades
        let c = client.clone();
        let sym = symbol.clone();
        tokio::spawn(async move {
            loop {
                match c.watch_trades(&sym, None, None).await {
                    Ok(trades) => {
                        for trade in &trades {
                            info!(
                                symbol = %sym,
                                side = ?trade.side,
                                price = ?trade.price,
                                amount = ?trade.amount,
                                "trade"
                            );
                        }
                    }
                    Err(e) => {
                        error!(symbol = %sym, error = %e, "Trade watch error — retrying in 5s");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });

        // Ticker
        let c = client.clone();
        let sym = symbol.clone();
        tokio::spawn(async move {
            loop {
                match c.watch_ticker(&sym).await {
                    Ok(ticker) => info!(
                        symbol = %sym,
                        last = ?ticker.last,
                        bid = ?ticker.bid,
                        ask = ?ticker.ask,
                        "ticker"
                    ),
                    Err(e) => {
                        error!(symbol = %sym, error = %e, "Ticker watch error — retrying in 5s");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    info!("All watchers running. Press Ctrl+C to stop.");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping");

    if let Err(e) = config.save(CONFIG_PATH) {
        error!(error = %e, "Failed to save config on shutdown");
    }

    info!("Market Sync shut down complete.");
    Ok(())
}
