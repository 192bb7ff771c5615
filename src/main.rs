use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod bot;
use bot::{diagnostic::diagnose, DingTalkBot};

mod config;
use config::PushbellConfig;

mod event;
mod filter;

mod relay;
use relay::Relay;

mod webhooks;

#[derive(Parser)]
#[clap(version, about = "Relays Gogs and GitHub webhooks to a DingTalk chat bot")]
struct Opts {
    /// Configuration file for pushbell
    #[clap(short, long)]
    config: PathBuf,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let config_file = File::open(&opts.config)
        .with_context(|| format!("couldn't open {}:", opts.config.display()))?;
    let config: PushbellConfig = serde_yaml::from_reader(BufReader::new(config_file))
        .context("couldn't parse config file")?;

    init_logging(config.verbose);
    info!(
        "relaying webhooks to DingTalk robot at {}",
        config.dingtalk.webhook_url.host_str().unwrap_or("?")
    );
    for issue in diagnose(&config.dingtalk).issues {
        warn!("DingTalk settings: {}", issue);
    }

    let notifier = DingTalkBot::new(config.dingtalk.clone()).context("failed to create DingTalk bot")?;
    let relay = Relay {
        rules: config.filter,
        template: config.template,
        notifier: Arc::new(notifier),
        verbose: config.verbose,
    };

    let figment = rocket::Config::figment()
        .merge(("address", config.address))
        .merge(("port", config.port));
    let rocket = webhooks::mount(rocket::custom(figment), relay, config.dingtalk);

    rocket.launch().await.map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}
