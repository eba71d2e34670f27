// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Client to call the subscription manager move functions from rust.

use core::fmt;
use std::{sync::Arc, time::Duration};

use sui_sdk::{
    SuiClient,
    SuiClientBuilder,
    rpc_types::{EventFilter, SuiObjectDataOptions},
};
use sui_types::{
    SUI_CLOCK_OBJECT_ID,
    TypeTag,
    base_types::{ObjectID, SuiAddress},
    dynamic_field::DynamicFieldName,
    object::Owner,
    transaction::{ObjectArg, ProgrammableTransaction, SharedObjectMutability},
};
use tracing::Level;

use crate::{
    config::{ClientConfig, Network},
    contracts::subscription_manager,
    normalize_sui_address,
    types::{
        EventQueryFilter,
        ManagerObject,
        SubscriptionEvent,
        SubscriptionRecord,
        SubscriptionStatus,
        Tier,
        events::EventTimePosition,
        move_structs::clock_timestamp_ms,
    },
};

pub mod rpc;
pub use rpc::{DynamicFieldLookup, SubscriptionReadApi};

pub mod transaction_builder;
pub use transaction_builder::SubscriptionPtbBuilder;

/// Number of events returned when the caller does not set a limit.
pub const DEFAULT_EVENT_LIMIT: usize = 50;
/// The largest page the node serves for event queries.
const MAX_EVENT_PAGE_SIZE: usize = 50;

#[derive(Debug, thiserror::Error)]
/// Error returned by the [`SubscriptionManagerClient`].
pub enum SubscriptionClientError {
    /// The manager object does not exist or has no content.
    #[error(
        "the subscription manager object {0} does not exist;\n\
        make sure the package and manager object IDs match the selected network"
    )]
    ManagerObjectNotFound(ObjectID),
    /// The manager object exists, but its content does not match the manager struct.
    #[error("invalid subscription manager content structure for object {object_id}: {reason}")]
    InvalidManagerObject {
        /// The ID of the object that was read.
        object_id: ObjectID,
        /// What is wrong with the content.
        reason: String,
    },
    /// An object other than the manager does not exist or has no content.
    #[error("the object {0} does not exist")]
    ObjectNotFound(ObjectID),
    /// The content of an object does not have the expected shape.
    #[error("unexpected content of object {object_id}: {reason}")]
    InvalidMoveContent {
        /// The ID of the object that was read.
        object_id: ObjectID,
        /// What is wrong with the content.
        reason: String,
    },
    /// An event does not match the `SubscriptionEvent` struct.
    #[error("invalid subscription event: {0}")]
    InvalidEvent(String),
    /// The input is not a Sui address.
    #[error("invalid Sui address: '{0}'")]
    InvalidAddress(String),
    /// The tier is not one of the tiers defined by the contract.
    #[error(transparent)]
    InvalidTier(#[from] crate::types::InvalidTierError),
    /// A network default is empty and no override was provided.
    #[error("no default {field} is known for {network}; provide it explicitly")]
    MissingNetworkConfig {
        /// The selected network.
        network: Network,
        /// The name of the missing field.
        field: &'static str,
    },
    /// Error resulting from a Sui-SDK call.
    #[error(transparent)]
    SuiSdkError(#[from] sui_sdk::error::Error),
    /// Unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type of the [`SubscriptionManagerClient`].
pub type SubscriptionClientResult<T> = Result<T, SubscriptionClientError>;

/// Client for the subscription manager contract.
///
/// Builds unsigned transactions for the contract's entry points and reads its on-chain state.
/// The client only holds its configuration and a handle to the node, so it can be cloned and
/// used concurrently.
pub struct SubscriptionManagerClient<R = SuiClient> {
    config: ClientConfig,
    rpc: Arc<R>,
}

impl<R> Clone for SubscriptionManagerClient<R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            rpc: Arc::clone(&self.rpc),
        }
    }
}

impl SubscriptionManagerClient<SuiClient> {
    /// Connects to the full node in the configuration and creates a new client.
    pub async fn new(
        config: ClientConfig,
        request_timeout: Option<Duration>,
    ) -> SubscriptionClientResult<Self> {
        let mut builder = SuiClientBuilder::default();
        if let Some(request_timeout) = request_timeout {
            builder = builder.request_timeout(request_timeout);
        }
        let sui_client = builder.build(&config.rpc_url).await?;
        tracing::debug!(rpc_url = %config.rpc_url, "connected to the Sui full node");
        Ok(Self::new_with_rpc(config, sui_client))
    }
}

impl<R: SubscriptionReadApi> SubscriptionManagerClient<R> {
    /// Creates a new client on top of an existing RPC handle.
    pub fn new_with_rpc(config: ClientConfig, rpc: R) -> Self {
        Self {
            config,
            rpc: Arc::new(rpc),
        }
    }

    /// Returns the configuration of the client.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the RPC handle of the client.
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Builds the transaction buying a subscription of the given tier.
    ///
    /// The price of the tier is split off the gas coin of the signer. The transaction is not
    /// signed or submitted.
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn build_purchase_transaction(
        &self,
        tier: Tier,
    ) -> SubscriptionClientResult<ProgrammableTransaction> {
        let manager = self.manager_object_arg().await?;
        let mut pt_builder = self.transaction_builder();
        pt_builder.buy_subscription(manager, tier)?;
        Ok(pt_builder.finish())
    }

    /// Like [`Self::build_purchase_transaction`], but for a tier given as its contract value.
    ///
    /// Values that do not correspond to a [`Tier`] are rejected with
    /// [`SubscriptionClientError::InvalidTier`] before any node request.
    pub async fn build_purchase_transaction_from_raw_tier(
        &self,
        raw_tier: u8,
    ) -> SubscriptionClientResult<ProgrammableTransaction> {
        let tier = Tier::try_from(raw_tier)?;
        self.build_purchase_transaction(tier).await
    }

    /// Builds the transaction withdrawing all collected funds to the admin.
    ///
    /// The contract rejects the transaction unless it is signed by the admin.
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn build_withdraw_all_funds_transaction(
        &self,
        admin_address: &str,
    ) -> SubscriptionClientResult<ProgrammableTransaction> {
        let admin = normalize_sui_address(admin_address)?;
        let manager = self.manager_object_arg().await?;
        let mut pt_builder = self.transaction_builder();
        pt_builder.withdraw_all_funds(manager, admin)?;
        Ok(pt_builder.finish())
    }

    /// Returns the subscription record of the user, or `None` if the user never subscribed.
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn get_subscription(
        &self,
        user_address: &str,
    ) -> SubscriptionClientResult<Option<SubscriptionRecord>> {
        let user = normalize_sui_address(user_address)?;
        let manager = self.get_manager_object().await?;

        let name = DynamicFieldName {
            type_: TypeTag::Address,
            value: serde_json::Value::String(user.to_string()),
        };
        let response = match self
            .rpc
            .get_dynamic_field_object(manager.subscriptions_table_id, name)
            .await?
        {
            DynamicFieldLookup::Found(response) => response,
            DynamicFieldLookup::NotFound => {
                tracing::debug!(%user, "no subscription found");
                return Ok(None);
            }
        };

        let Some(data) = response.data else {
            return Ok(None);
        };
        let Some(content) = data.content.as_ref() else {
            return Ok(None);
        };
        SubscriptionRecord::try_from_field_content(data.object_id, content).map(Some)
    }

    /// Returns whether the user holds an unexpired subscription, and its tier.
    ///
    /// Users without a subscription are reported as inactive on [`Tier::Free`].
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn is_subscription_active(
        &self,
        user_address: &str,
    ) -> SubscriptionClientResult<SubscriptionStatus> {
        let Some(subscription) = self.get_subscription(user_address).await? else {
            return Ok(SubscriptionStatus::inactive());
        };
        let now_ms = self.current_timestamp_ms().await?;
        Ok(SubscriptionStatus {
            active: subscription.is_active_at(now_ms),
            tier: subscription.tier,
        })
    }

    /// Returns the subscription events matching the filter, newest first.
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn get_subscription_events(
        &self,
        filter: EventQueryFilter,
    ) -> SubscriptionClientResult<Vec<SubscriptionEvent>> {
        let limit = filter.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
        let mut events = Vec::new();
        if limit == 0 {
            return Ok(events);
        }

        let query = EventFilter::MoveEventType(
            subscription_manager::SubscriptionEvent
                .to_move_struct_tag_with_package(self.config.package_id, &[])?,
        );
        // Events outside the time range are skipped on the client, so pages are not shrunk to
        // the limit when a range is given.
        let page_size = if filter.start_time.is_some() || filter.end_time.is_some() {
            MAX_EVENT_PAGE_SIZE
        } else {
            limit.min(MAX_EVENT_PAGE_SIZE)
        };
        let mut cursor = None;
        loop {
            let page = self
                .rpc
                .query_events(query.clone(), cursor, Some(page_size), true)
                .await?;

            for sui_event in page.data {
                match filter.position_of(sui_event.timestamp_ms) {
                    EventTimePosition::AfterRange => continue,
                    EventTimePosition::BeforeRange => return Ok(events),
                    EventTimePosition::InRange => {
                        events.push(SubscriptionEvent::try_from(sui_event)?);
                        if events.len() >= limit {
                            return Ok(events);
                        }
                    }
                }
            }

            match page.next_cursor {
                Some(next_cursor) if page.has_next_page => cursor = Some(next_cursor),
                _ => return Ok(events),
            }
        }
    }

    /// Returns the total amount collected by the manager, in MIST.
    pub async fn get_total_collected(&self) -> SubscriptionClientResult<u64> {
        Ok(self.get_manager_object().await?.total_collected)
    }

    /// Returns the admin address of the manager.
    pub async fn get_admin(&self) -> SubscriptionClientResult<SuiAddress> {
        Ok(self.get_manager_object().await?.admin)
    }

    /// Fetches a fresh snapshot of the manager object.
    #[tracing::instrument(level = Level::DEBUG, skip(self))]
    pub async fn get_manager_object(&self) -> SubscriptionClientResult<ManagerObject> {
        let object_id = self.config.subscription_manager_id;
        let response = self
            .rpc
            .get_object_with_options(object_id, SuiObjectDataOptions::new().with_content())
            .await?;
        ManagerObject::try_from_object_response(object_id, response)
    }

    /// Returns a builder for transactions calling the configured package.
    pub fn transaction_builder(&self) -> SubscriptionPtbBuilder {
        SubscriptionPtbBuilder::new(self.config.package_id)
    }

    /// Reads the current network time from the clock object.
    async fn current_timestamp_ms(&self) -> SubscriptionClientResult<u64> {
        let response = self
            .rpc
            .get_object_with_options(SUI_CLOCK_OBJECT_ID, SuiObjectDataOptions::new().with_content())
            .await?;
        clock_timestamp_ms(SUI_CLOCK_OBJECT_ID, response)
    }

    /// Returns the mutable shared-object argument for the manager.
    async fn manager_object_arg(&self) -> SubscriptionClientResult<ObjectArg> {
        let object_id = self.config.subscription_manager_id;
        let response = self
            .rpc
            .get_object_with_options(object_id, SuiObjectDataOptions::new().with_owner())
            .await?;
        let Some(data) = response.data else {
            return Err(SubscriptionClientError::ManagerObjectNotFound(object_id));
        };
        match data.owner {
            Some(Owner::Shared {
                initial_shared_version,
            }) => Ok(ObjectArg::SharedObject {
                id: object_id,
                initial_shared_version,
                mutability: SharedObjectMutability::Mutable,
            }),
            owner => Err(SubscriptionClientError::InvalidManagerObject {
                object_id,
                reason: format!("expected a shared object, found owner {owner:?}"),
            }),
        }
    }
}

impl<R> fmt::Debug for SubscriptionManagerClient<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManagerClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use sui_types::transaction::{Argument, CallArg, Command};

    use super::*;
    use crate::types::{InvalidTierError, PRICE_TIER2};
    use crate::test_utils::{ManagerFixture, MockSubscriptionRpc};

    fn client_for(fixture: &ManagerFixture) -> SubscriptionManagerClient<MockSubscriptionRpc> {
        SubscriptionManagerClient::new_with_rpc(
            fixture.client_config(),
            MockSubscriptionRpc::new().with_manager(fixture),
        )
    }

    #[tokio::test]
    async fn purchase_uses_initial_shared_version_of_manager() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        let ptb = client
            .build_purchase_transaction(Tier::Tier1)
            .await
            .expect("transaction builds");

        let Some(CallArg::Object(ObjectArg::SharedObject {
            id,
            initial_shared_version,
            ..
        })) = ptb.inputs.first()
        else {
            panic!("first input must be the manager object");
        };
        assert_eq!(*id, fixture.manager_id);
        assert_eq!(*initial_shared_version, fixture.initial_shared_version);
        assert!(matches!(ptb.commands.last(), Some(Command::MoveCall(_))));
    }

    #[tokio::test]
    async fn purchase_fails_for_missing_manager() {
        let fixture = ManagerFixture::default();
        let client =
            SubscriptionManagerClient::new_with_rpc(fixture.client_config(), MockSubscriptionRpc::new());

        assert!(matches!(
            client.build_purchase_transaction(Tier::Free).await,
            Err(SubscriptionClientError::ManagerObjectNotFound(id)) if id == fixture.manager_id
        ));
    }

    #[tokio::test]
    async fn purchase_from_unknown_raw_tier_is_rejected() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        assert!(matches!(
            client.build_purchase_transaction_from_raw_tier(3).await,
            Err(SubscriptionClientError::InvalidTier(InvalidTierError(3)))
        ));
        assert_eq!(client.rpc().object_reads(fixture.manager_id), 0);
    }

    #[tokio::test]
    async fn purchase_from_raw_tier_pays_tier_price() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        let ptb = client
            .build_purchase_transaction_from_raw_tier(2)
            .await
            .expect("transaction builds");
        let amount = ptb
            .commands
            .iter()
            .find_map(|command| match command {
                Command::SplitCoins(_, amounts) => amounts.first(),
                _ => None,
            })
            .and_then(|amount| match amount {
                Argument::Input(index) => ptb.inputs.get(usize::from(*index)),
                _ => None,
            });
        assert!(matches!(
            amount,
            Some(CallArg::Pure(bytes)) if *bytes == bcs::to_bytes(&PRICE_TIER2).expect("u64")
        ));
    }

    #[tokio::test]
    async fn withdraw_rejects_invalid_admin_address() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        assert!(matches!(
            client.build_withdraw_all_funds_transaction("not an address").await,
            Err(SubscriptionClientError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn reads_admin_and_total_collected() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        assert_eq!(client.get_admin().await.expect("admin"), fixture.admin);
        assert_eq!(
            client.get_total_collected().await.expect("total collected"),
            fixture.total_collected
        );
    }

    #[tokio::test]
    async fn inactive_status_skips_the_clock() {
        let fixture = ManagerFixture::default();
        let rpc = MockSubscriptionRpc::new().with_manager(&fixture);
        let client = SubscriptionManagerClient::new_with_rpc(fixture.client_config(), rpc);

        let status = client
            .is_subscription_active("0xabc")
            .await
            .expect("status of unknown user");
        assert_eq!(status, SubscriptionStatus::inactive());
        assert_eq!(client.rpc().object_reads(SUI_CLOCK_OBJECT_ID), 0);
    }

    #[tokio::test]
    async fn zero_limit_returns_no_events_without_querying() {
        let fixture = ManagerFixture::default();
        let client = client_for(&fixture);

        let events = client
            .get_subscription_events(EventQueryFilter {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .expect("events");
        assert!(events.is_empty());
        assert_eq!(client.rpc().event_queries(), 0);
    }
}
