// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Network defaults and configuration files for the subscription manager client.

use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use sui_types::base_types::ObjectID;

use crate::client::{SubscriptionClientError, SubscriptionClientResult};

/// A Sui network with known contract deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Sui testnet.
    #[default]
    Testnet,
    /// Sui devnet.
    Devnet,
    /// Sui mainnet.
    Mainnet,
}

/// The default endpoint and contract deployment of a [`Network`].
///
/// Empty strings mark deployments that are not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkDefaults {
    /// The URL of the full node RPC endpoint.
    pub rpc_url: &'static str,
    /// The ID of the published subscription manager package.
    pub package_id: &'static str,
    /// The ID of the shared manager object.
    pub subscription_manager_id: &'static str,
}

const TESTNET_DEFAULTS: NetworkDefaults = NetworkDefaults {
    rpc_url: "https://fullnode.testnet.sui.io:443",
    package_id: "0x9dc94dd2222c559d2c3e30ddb43cea0517a4d4f01b13e0fc655c65c8d209e456",
    subscription_manager_id: "0x917c24d6cbb368b3ad4cae5d550bfe744e488d4b94987188217258b1518dde3c",
};

const DEVNET_DEFAULTS: NetworkDefaults = NetworkDefaults {
    rpc_url: "",
    package_id: "",
    subscription_manager_id: "",
};

const MAINNET_DEFAULTS: NetworkDefaults = NetworkDefaults {
    rpc_url: "",
    package_id: "",
    subscription_manager_id: "",
};

impl Network {
    /// Returns the default endpoint and deployment for the network.
    pub const fn defaults(&self) -> NetworkDefaults {
        match self {
            Self::Testnet => TESTNET_DEFAULTS,
            Self::Devnet => DEVNET_DEFAULTS,
            Self::Mainnet => MAINNET_DEFAULTS,
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Testnet => write!(f, "testnet"),
            Self::Devnet => write!(f, "devnet"),
            Self::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(anyhow!(
                "unknown network '{other}'; expected one of testnet, devnet, mainnet"
            )),
        }
    }
}

/// Resolved configuration of the [`SubscriptionManagerClient`][crate::client::SubscriptionManagerClient].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The URL of the full node RPC endpoint.
    pub rpc_url: String,
    /// The ID of the published subscription manager package.
    pub package_id: ObjectID,
    /// The ID of the shared manager object.
    pub subscription_manager_id: ObjectID,
}

/// Values replacing the defaults of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    /// Overrides the RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Overrides the package ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<ObjectID>,
    /// Overrides the manager object ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_manager_id: Option<ObjectID>,
}

impl ConfigOverrides {
    /// Returns the overrides in `self`, falling back to `other` for unset fields.
    pub fn or(self, other: Self) -> Self {
        Self {
            rpc_url: self.rpc_url.or(other.rpc_url),
            package_id: self.package_id.or(other.package_id),
            subscription_manager_id: self.subscription_manager_id.or(other.subscription_manager_id),
        }
    }
}

impl ClientConfig {
    /// Returns the default configuration of the network.
    pub fn for_network(network: Network) -> SubscriptionClientResult<Self> {
        Self::resolve(network, ConfigOverrides::default())
    }

    /// Resolves the configuration of the network, replacing defaults with the given overrides.
    pub fn resolve(network: Network, overrides: ConfigOverrides) -> SubscriptionClientResult<Self> {
        let defaults = network.defaults();
        let missing = |field| SubscriptionClientError::MissingNetworkConfig { network, field };

        let rpc_url = match overrides.rpc_url {
            Some(rpc_url) => rpc_url,
            None if !defaults.rpc_url.is_empty() => defaults.rpc_url.to_owned(),
            None => return Err(missing("rpc_url")),
        };
        let package_id = match overrides.package_id {
            Some(package_id) => package_id,
            None => parse_default_id(defaults.package_id).ok_or_else(|| missing("package_id"))?,
        };
        let subscription_manager_id = match overrides.subscription_manager_id {
            Some(manager_id) => manager_id,
            None => parse_default_id(defaults.subscription_manager_id)
                .ok_or_else(|| missing("subscription_manager_id"))?,
        };

        Ok(Self {
            rpc_url,
            package_id,
            subscription_manager_id,
        })
    }
}

fn parse_default_id(id: &str) -> Option<ObjectID> {
    if id.is_empty() {
        None
    } else {
        ObjectID::from_hex_literal(id).ok()
    }
}

/// A configuration as written in a configuration file.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// The network whose defaults are used.
    #[serde(default)]
    pub network: Network,
    /// Values replacing the network defaults.
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
    /// Timeout for requests to the full node, in seconds.
    #[serde_as(as = "Option<DurationSeconds>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

impl SubscriptionConfig {
    /// Resolves the client configuration described by the file.
    pub fn client_config(&self) -> SubscriptionClientResult<ClientConfig> {
        ClientConfig::resolve(self.network, self.overrides.clone())
    }
}

/// A configuration file holding either a single configuration or several named contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum MultiConfig {
    MultiConfig {
        contexts: HashMap<String, SubscriptionConfig>,
        default_context: String,
    },
    SingletonConfig(SubscriptionConfig),
}

/// Returns the default paths for the configuration file.
pub fn default_configuration_paths() -> Vec<PathBuf> {
    const CONFIG_FILE_NAMES: [&str; 2] = ["subscription_config.yaml", "subscription_config.yml"];
    let mut directories = vec![PathBuf::from(".")];
    if let Ok(xdg_config_dir) = std::env::var("XDG_CONFIG_HOME") {
        directories.push(PathBuf::from(xdg_config_dir).join("subscription"));
    }
    if let Some(home_dir) = home::home_dir() {
        directories.push(home_dir.join(".config").join("subscription"));
    }
    directories
        .into_iter()
        .cartesian_product(CONFIG_FILE_NAMES)
        .map(|(directory, file_name)| directory.join(file_name))
        .collect()
}

/// Loads the configuration from the given path and context.
///
/// Without a path, the first existing file among [`default_configuration_paths`] is used, and
/// `Ok(None)` is returned if there is none. Without a context, the default context of a
/// multi-context file is used.
pub fn load_configuration(
    path: Option<&Path>,
    context: Option<&str>,
) -> Result<Option<SubscriptionConfig>> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_configuration_paths()
            .into_iter()
            .find(|path| path.exists())
        {
            Some(path) => path,
            None => {
                if context.is_some() {
                    bail!("a context was specified, but no configuration file was found");
                }
                return Ok(None);
            }
        },
    };

    let config = load_from_multi_config(&path, context)?;
    tracing::info!(
        "using subscription configuration from '{}' with {} context",
        path.display(),
        context.map_or("default".to_string(), |c| format!("'{c}'"))
    );
    Ok(Some(config))
}

/// Loads a configuration from a single- or multi-context file.
pub fn load_from_multi_config(
    path: impl AsRef<Path>,
    context: Option<&str>,
) -> Result<SubscriptionConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read the config file '{}'", path.display()))?;
    let config: MultiConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("unable to parse the config file '{}'", path.display()))?;

    match config {
        MultiConfig::SingletonConfig(config) => {
            if let Some(context) = context {
                bail!(
                    "cannot specify context when using a single-context configuration file \
                    [config_filename='{}', specified_context='{}']",
                    path.display(),
                    context,
                )
            }
            Ok(config)
        }
        MultiConfig::MultiConfig {
            mut contexts,
            default_context,
        } => {
            let target_context = context.unwrap_or(&default_context);
            contexts.remove(target_context).ok_or_else(|| {
                anyhow!(
                    "context '{}' not found in multi-config file '{}'. available context(s): [{}]",
                    target_context,
                    path.display(),
                    contexts.keys().sorted().map(|x| format!("'{x}'")).join(", ")
                )
            })
        }
    }
}
