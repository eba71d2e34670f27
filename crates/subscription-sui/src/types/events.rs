// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Subscription event bindings and the filter used to query them.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sui_sdk::rpc_types::SuiEvent;
use sui_types::{base_types::SuiAddress, event::EventID};

use super::tier_cost;
use crate::{client::SubscriptionClientError, contracts::subscription_manager};

/// Sui event emitted when a user buys a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    /// The subscriber.
    pub user: SuiAddress,
    /// The purchased tier, as stored by the contract.
    pub tier: u8,
    /// The new expiration time of the subscription, in milliseconds since the Unix epoch.
    pub expiration_time: u64,
    /// The ID of the event.
    pub event_id: EventID,
    /// The time at which the event was emitted, if reported by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

/// The JSON fields of the Move event. Integers may be encoded as numbers or strings.
#[serde_as]
#[derive(Debug, Deserialize)]
struct SubscriptionEventFields {
    user: SuiAddress,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    tier: u8,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    expiration_time: u64,
}

impl SubscriptionEvent {
    /// Returns the price of the purchased tier, in MIST.
    ///
    /// Tier values unknown to the client are priced at zero.
    pub fn amount_paid(&self) -> u64 {
        tier_cost(self.tier)
    }
}

impl TryFrom<SuiEvent> for SubscriptionEvent {
    type Error = SubscriptionClientError;

    fn try_from(sui_event: SuiEvent) -> Result<Self, Self::Error> {
        let expected = subscription_manager::SubscriptionEvent;
        if sui_event.type_.module.as_str() != expected.module
            || sui_event.type_.name.as_str() != expected.name
        {
            return Err(SubscriptionClientError::InvalidEvent(format!(
                "expected event type {expected}, found {}::{}",
                sui_event.type_.module, sui_event.type_.name
            )));
        }

        let SubscriptionEventFields {
            user,
            tier,
            expiration_time,
        } = serde_json::from_value(sui_event.parsed_json)
            .map_err(|error| SubscriptionClientError::InvalidEvent(error.to_string()))?;

        Ok(Self {
            user,
            tier,
            expiration_time,
            event_id: sui_event.id,
            timestamp_ms: sui_event.timestamp_ms,
        })
    }
}

/// Bounds for an event query.
///
/// The time range includes `start_time` and excludes `end_time`, both in milliseconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueryFilter {
    /// Only return events emitted at or after this time.
    pub start_time: Option<u64>,
    /// Only return events emitted before this time.
    pub end_time: Option<u64>,
    /// The maximum number of events to return.
    pub limit: Option<usize>,
}

/// Position of an event relative to the time range of an [`EventQueryFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventTimePosition {
    /// The event was emitted before the start of the range.
    BeforeRange,
    /// The event lies within the range, or has no timestamp.
    InRange,
    /// The event was emitted at or after the end of the range.
    AfterRange,
}

impl EventQueryFilter {
    pub(crate) fn position_of(&self, timestamp_ms: Option<u64>) -> EventTimePosition {
        let Some(timestamp_ms) = timestamp_ms else {
            return EventTimePosition::InRange;
        };
        if self.start_time.is_some_and(|start| timestamp_ms < start) {
            EventTimePosition::BeforeRange
        } else if self.end_time.is_some_and(|end| timestamp_ms >= end) {
            EventTimePosition::AfterRange
        } else {
            EventTimePosition::InRange
        }
    }
}
