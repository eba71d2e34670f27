// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface for the subscription manager contract.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use subscription_sui::{
    client::SubscriptionManagerClient,
    config::{ClientConfig, ConfigOverrides, Network, load_configuration},
};
use sui_types::base_types::ObjectID;
use tracing_subscriber::EnvFilter;

mod runner;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    about = "Query the subscription manager contract and build its transactions",
    long_about = None,
    name = env!("CARGO_BIN_NAME"),
    version,
)]
struct Args {
    /// The path to the configuration file.
    ///
    /// If omitted, `subscription_config.yaml` is searched in the current directory,
    /// `$XDG_CONFIG_HOME/subscription/`, and `~/.config/subscription/`. Without a configuration
    /// file, the defaults of the selected network are used.
    #[arg(long, verbatim_doc_comment)]
    config: Option<PathBuf>,
    /// The configuration context to use, if omitted the default_context is used.
    #[arg(long)]
    context: Option<String>,
    /// The network whose defaults are used. Overrides the network in the configuration file.
    #[arg(long)]
    network: Option<Network>,
    /// Override the full node RPC URL.
    #[arg(long)]
    rpc_url: Option<String>,
    /// Override the package ID of the contract.
    #[arg(long)]
    package_id: Option<ObjectID>,
    /// Override the ID of the manager object.
    #[arg(long)]
    subscription_manager_id: Option<ObjectID>,
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Print the subscription record of a user, or `null` if there is none.
    Subscription {
        /// The address of the user.
        address: String,
    },
    /// Print whether a user has an active subscription, and its tier.
    Status {
        /// The address of the user.
        address: String,
    },
    /// Print the latest subscription events, newest first.
    Events {
        /// Only include events emitted at or after this time, in ms since the Unix epoch.
        #[arg(long)]
        start_time: Option<u64>,
        /// Only include events emitted before this time, in ms since the Unix epoch.
        #[arg(long)]
        end_time: Option<u64>,
        /// The maximum number of events to print.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the total amount collected by the manager, in MIST.
    TotalCollected,
    /// Print the admin address of the manager.
    Admin,
    /// Print the unsigned transaction buying a subscription, as base64-encoded BCS.
    BuildPurchase {
        /// The tier to buy: 0 (free), 1, or 2.
        tier: u8,
    },
    /// Print the unsigned transaction withdrawing all funds, as base64-encoded BCS.
    BuildWithdraw {
        /// The address of the admin.
        admin: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let file_config = load_configuration(args.config.as_deref(), args.context.as_deref())?
        .unwrap_or_default();
    let network = args.network.unwrap_or(file_config.network);
    let overrides = ConfigOverrides {
        rpc_url: args.rpc_url,
        package_id: args.package_id,
        subscription_manager_id: args.subscription_manager_id,
    }
    .or(file_config.overrides);
    let config = ClientConfig::resolve(network, overrides)
        .with_context(|| format!("unable to configure the client for {network}"))?;
    tracing::debug!(?config, "resolved the client configuration");

    let client = SubscriptionManagerClient::new(config, file_config.request_timeout)
        .await
        .context("unable to connect to the full node")?;
    let output = runner::run(&client, args.command).await?;
    println!("{output}");
    Ok(())
}
