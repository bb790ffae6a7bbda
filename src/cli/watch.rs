//! Watch command implementation

use crate::config::Config;
use crate::feed::{ConnectionState, FeedClient, StatusCallback, Subscription, TickerMessage};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Products to watch (defaults to `feed.product_ids` from the config)
    pub product_ids: Vec<String>,

    /// Override the feed URL
    #[arg(long)]
    pub url: Option<String>,
}

impl WatchArgs {
    /// Products requested on the command line, or the configured ones
    pub fn products(&self, config: &Config) -> Vec<String> {
        if self.product_ids.is_empty() {
            config.feed.product_ids.clone()
        } else {
            self.product_ids.clone()
        }
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let products = self.products(config);
        if products.is_empty() {
            anyhow::bail!("No products to watch");
        }

        let url = self.url.clone().unwrap_or_else(|| config.feed.url.clone());
        tracing::info!(%url, products = ?products, "Starting ticker watch");

        let client = FeedClient::websocket(url, config.client_config());

        let status: StatusCallback = Arc::new(|state: ConnectionState| {
            tracing::info!(%state, "Feed status");
        });
        client.on_status_change(status.clone());

        let subscriptions: Vec<Subscription> = products
            .into_iter()
            .map(|product| client.subscribe(product, log_ticker))
            .collect();

        client.start();

        tokio::signal::ctrl_c().await?;
        tracing::info!("Received shutdown signal");

        for subscription in &subscriptions {
            subscription.unsubscribe();
        }
        client.close();
        client.off_status_change(&status);

        Ok(())
    }
}

fn log_ticker(ticker: &TickerMessage) {
    tracing::info!(
        topic = %ticker.topic,
        price = %ticker.price,
        change_pct_24h = ?ticker.change_pct_24h(),
        volume_24h = %ticker.volume_24h,
        time = %ticker.time,
        "Ticker"
    );
}
