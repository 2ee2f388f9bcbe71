use std::io;
use std::sync::mpsc;

use color_eyre::Result;
use color_eyre::eyre::Context;
use env_logger::Env;
use log::info;

mod config;
mod diff;
mod error;
mod notify;
mod poller;
#[cfg(test)]
mod testing;
mod tracking;

use config::Config;
use notify::{DryRunNotifier, WebhookNotifier};
use poller::Poller;
use tracking::TrackingClient;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::load().wrap_err("failed to load config")?;
    let client = tracking::http_client(&config)?;
    let source = TrackingClient::new(client.clone(), config.tracking_url.clone());

    if config.dry_run {
        info!("Dry run: printing the notification instead of sending it");
        let notifier = DryRunNotifier::new(io::stdout().lock());
        let mut poller = Poller::new(source, notifier, config.identity(), config.channel.clone());
        poller.poll_once().wrap_err("dry run failed")?;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .wrap_err("failed to set shutdown handler")?;

    let notifier = WebhookNotifier::new(client, config.webhook_url.clone());
    let mut poller = Poller::new(source, notifier, config.identity(), config.channel.clone());
    poller.run(config.poll_interval, &shutdown_rx);
    Ok(())
}
