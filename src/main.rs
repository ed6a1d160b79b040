// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apc2mqtt::bridge::{Bridge, BuildInfo};
use apc2mqtt::config::Config;

/// Exposes APC PDU outlets as Home Assistant switches over MQTT.
#[derive(Parser, Debug)]
#[command(name = "apc2mqtt", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    conf: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(&cli.conf) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %cli.conf.display(), error = %err, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    Bridge::new(config, BuildInfo::CURRENT).run().await;
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}
