// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Move structs of the subscription manager contract and their parsing from node responses.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sui_sdk::rpc_types::{SuiMoveStruct, SuiObjectResponse, SuiParsedData};
use sui_types::base_types::{ObjectDigest, ObjectID, SequenceNumber, SuiAddress};

use crate::{
    client::{SubscriptionClientError, SubscriptionClientResult},
    utils::{address_field, struct_fields, u64_field, uid_field},
};

/// Price of a [`Tier::Tier1`] subscription, in MIST.
pub const PRICE_TIER1: u64 = 10_000_000;
/// Price of a [`Tier::Tier2`] subscription, in MIST.
pub const PRICE_TIER2: u64 = 50_000_000;

/// Subscription level purchased by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Tier {
    /// The free tier.
    #[default]
    Free = 0,
    /// The first paid tier.
    Tier1 = 1,
    /// The second paid tier.
    Tier2 = 2,
}

impl Tier {
    /// Returns the price of the tier, in MIST.
    pub const fn price(&self) -> u64 {
        match self {
            Self::Free => 0,
            Self::Tier1 => PRICE_TIER1,
            Self::Tier2 => PRICE_TIER2,
        }
    }

    /// Returns the value used for the tier in the contract.
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Tier1 => write!(f, "tier1"),
            Self::Tier2 => write!(f, "tier2"),
        }
    }
}

/// Error returned when a value does not correspond to any [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid subscription tier {0}; expected 0 (free), 1 (tier1), or 2 (tier2)")]
pub struct InvalidTierError(pub u8);

impl TryFrom<u8> for Tier {
    type Error = InvalidTierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Free),
            1 => Ok(Self::Tier1),
            2 => Ok(Self::Tier2),
            other => Err(InvalidTierError(other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

/// Looks up the cost of a raw tier value in the pricing table.
///
/// Values that do not correspond to a [`Tier`] cost nothing.
pub fn tier_cost(raw_tier: u8) -> u64 {
    match Tier::try_from(raw_tier) {
        Ok(tier) => tier.price(),
        Err(error) => {
            tracing::warn!(%error, "pricing unknown tier as free");
            0
        }
    }
}

/// Snapshot of the shared `SubscriptionManager` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerObject {
    /// The object ID of the manager.
    pub object_id: ObjectID,
    /// The version of the object at the time it was read.
    pub version: SequenceNumber,
    /// The digest of the object at the time it was read.
    pub digest: ObjectDigest,
    /// The address allowed to withdraw the collected funds.
    pub admin: SuiAddress,
    /// The total amount collected by the manager, in MIST.
    pub total_collected: u64,
    /// The object ID of the table mapping user addresses to subscriptions.
    pub subscriptions_table_id: ObjectID,
}

impl ManagerObject {
    /// Parses the manager object from a node response that includes the object content.
    ///
    /// A missing object, or content that does not have the shape of the manager struct, indicates a
    /// wrong object ID or network and is reported as an error.
    pub fn try_from_object_response(
        object_id: ObjectID,
        response: SuiObjectResponse,
    ) -> SubscriptionClientResult<Self> {
        let invalid = |reason: String| SubscriptionClientError::InvalidManagerObject {
            object_id,
            reason,
        };

        let Some(data) = response.data else {
            return Err(SubscriptionClientError::ManagerObjectNotFound(object_id));
        };
        let Some(content) = data.content.as_ref() else {
            return Err(SubscriptionClientError::ManagerObjectNotFound(object_id));
        };
        let fields = move_object_fields(content).map_err(invalid)?;

        let subscriptions = fields
            .get("subscriptions")
            .and_then(struct_fields)
            .ok_or_else(|| invalid("missing struct field `subscriptions`".to_owned()))?;

        Ok(Self {
            object_id: data.object_id,
            version: data.version,
            digest: data.digest,
            admin: address_field(&fields, "admin").map_err(invalid)?,
            total_collected: u64_field(&fields, "total_collected").map_err(invalid)?,
            subscriptions_table_id: uid_field(subscriptions, "id").map_err(invalid)?,
        })
    }
}

/// A user's entry in the subscriptions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// The purchased tier.
    pub tier: Tier,
    /// The time at which the subscription expires, in milliseconds since the Unix epoch.
    pub expiration_time_ms: u64,
}

impl SubscriptionRecord {
    /// Parses the record from the content of the `Field<address, Subscription>` dynamic field.
    pub fn try_from_field_content(
        field_id: ObjectID,
        content: &SuiParsedData,
    ) -> SubscriptionClientResult<Self> {
        let invalid = |reason: String| SubscriptionClientError::InvalidMoveContent {
            object_id: field_id,
            reason,
        };

        let fields = move_object_fields(content).map_err(invalid)?;
        let value = fields
            .get("value")
            .and_then(struct_fields)
            .ok_or_else(|| invalid("missing struct field `value`".to_owned()))?;

        let raw_tier = u64_field(value, "tier").map_err(invalid)?;
        let tier = u8::try_from(raw_tier)
            .ok()
            .and_then(|tier| Tier::try_from(tier).ok())
            .ok_or_else(|| invalid(format!("field `tier` is not a valid tier: {raw_tier}")))?;

        Ok(Self {
            tier,
            expiration_time_ms: u64_field(value, "expiration_time").map_err(invalid)?,
        })
    }

    /// Returns true if the subscription expires strictly after `now_ms`.
    pub fn is_active_at(&self, now_ms: u64) -> bool {
        self.expiration_time_ms > now_ms
    }
}

/// Whether a user currently holds an active subscription, and of which tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    /// True if the subscription has not expired.
    pub active: bool,
    /// The tier of the subscription; [`Tier::Free`] if the user never subscribed.
    pub tier: Tier,
}

impl SubscriptionStatus {
    /// Status of a user without any subscription record.
    pub const fn inactive() -> Self {
        Self {
            active: false,
            tier: Tier::Free,
        }
    }
}

/// Reads the `timestamp_ms` field of the `0x2::clock::Clock` object.
pub(crate) fn clock_timestamp_ms(
    clock_id: ObjectID,
    response: SuiObjectResponse,
) -> SubscriptionClientResult<u64> {
    let content = response
        .data
        .and_then(|data| data.content)
        .ok_or(SubscriptionClientError::ObjectNotFound(clock_id))?;
    let invalid = |reason: String| SubscriptionClientError::InvalidMoveContent {
        object_id: clock_id,
        reason,
    };
    let fields = move_object_fields(&content).map_err(invalid)?;
    u64_field(&fields, "timestamp_ms").map_err(invalid)
}

/// Returns the fields of a Move object as a JSON mapping.
///
/// Fails if the content is a package, or if the fields are positional.
fn move_object_fields(content: &SuiParsedData) -> Result<Map<String, Value>, String> {
    let SuiParsedData::MoveObject(object) = content else {
        return Err("content is not a Move object".to_owned());
    };
    if let SuiMoveStruct::Runtime(_) = object.fields {
        return Err("fields are a positional list instead of a keyed mapping".to_owned());
    }
    let value = serde_json::to_value(&object.fields)
        .map_err(|error| format!("fields cannot be represented as JSON: {error}"))?;
    struct_fields(&value)
        .cloned()
        .ok_or_else(|| "fields are not a keyed mapping".to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sui_sdk::rpc_types::{SuiMovePackage, SuiMoveValue, SuiObjectResponseError};
    use subscription_test_utils::param_test;

    use super::*;
    use crate::test_utils::{self, ManagerFixture};

    param_test! {
        test_tier_cost: [
            free: (0, 0),
            tier1: (1, 10_000_000),
            tier2: (2, 50_000_000),
            unknown_small: (3, 0),
            unknown_max: (u8::MAX, 0),
        ]
    }
    fn test_tier_cost(raw_tier: u8, expected_cost: u64) {
        assert_eq!(tier_cost(raw_tier), expected_cost);
    }

    #[test]
    fn tier_conversion_rejects_unknown_values() {
        assert_eq!(Tier::try_from(2), Ok(Tier::Tier2));
        assert_eq!(Tier::try_from(3), Err(InvalidTierError(3)));
        assert_eq!(u8::from(Tier::Tier1), 1);
    }

    #[test]
    fn tier_serializes_as_integer() {
        assert_eq!(serde_json::to_value(Tier::Tier2).expect("serializes"), 2);
        assert!(serde_json::from_value::<Tier>(serde_json::json!(7)).is_err());
    }

    #[test]
    fn parses_manager_object() {
        let fixture = ManagerFixture::default();
        let manager =
            ManagerObject::try_from_object_response(fixture.manager_id, fixture.object_response())
                .expect("valid manager object");

        assert_eq!(manager.object_id, fixture.manager_id);
        assert_eq!(manager.admin, fixture.admin);
        assert_eq!(manager.total_collected, fixture.total_collected);
        assert_eq!(manager.subscriptions_table_id, fixture.table_id);
    }

    #[test]
    fn missing_manager_object_is_an_error() {
        let manager_id = ObjectID::random();
        let response =
            SuiObjectResponse::new_with_error(SuiObjectResponseError::NotExists {
                object_id: manager_id,
            });

        assert!(matches!(
            ManagerObject::try_from_object_response(manager_id, response),
            Err(SubscriptionClientError::ManagerObjectNotFound(id)) if id == manager_id
        ));
    }

    #[test]
    fn manager_content_without_fields_is_not_found() {
        let fixture = ManagerFixture::default();
        let mut response = fixture.object_response();
        if let Some(data) = response.data.as_mut() {
            data.content = None;
        }

        assert!(matches!(
            ManagerObject::try_from_object_response(fixture.manager_id, response),
            Err(SubscriptionClientError::ManagerObjectNotFound(_))
        ));
    }

    #[test]
    fn package_content_is_rejected() {
        let fixture = ManagerFixture::default();
        let response = fixture.object_response_with_content(SuiParsedData::Package(
            SuiMovePackage {
                disassembled: BTreeMap::new(),
            },
        ));

        assert!(matches!(
            ManagerObject::try_from_object_response(fixture.manager_id, response),
            Err(SubscriptionClientError::InvalidManagerObject { .. })
        ));
    }

    #[test]
    fn positional_fields_are_rejected() {
        let fixture = ManagerFixture::default();
        let response = fixture.object_response_with_content(test_utils::move_object_content(
            fixture.manager_struct_tag(),
            SuiMoveStruct::Runtime(vec![SuiMoveValue::Bool(true)]),
        ));

        assert!(matches!(
            ManagerObject::try_from_object_response(fixture.manager_id, response),
            Err(SubscriptionClientError::InvalidManagerObject { .. })
        ));
    }

    #[test]
    fn manager_without_subscriptions_table_is_rejected() {
        let fixture = ManagerFixture::default();
        let mut fields = fixture.fields();
        fields.remove("subscriptions");
        let response = fixture.object_response_with_content(test_utils::move_object_content(
            fixture.manager_struct_tag(),
            SuiMoveStruct::WithFields(fields),
        ));

        assert!(matches!(
            ManagerObject::try_from_object_response(fixture.manager_id, response),
            Err(SubscriptionClientError::InvalidManagerObject { reason, .. })
                if reason.contains("subscriptions")
        ));
    }

    #[test]
    fn parses_subscription_record() {
        let field_id = ObjectID::random();
        let content = test_utils::subscription_field_content(
            SuiAddress::random_for_testing_only(),
            Tier::Tier2,
            1_700_000_000_000,
        );

        let record = SubscriptionRecord::try_from_field_content(field_id, &content)
            .expect("valid subscription record");
        assert_eq!(
            record,
            SubscriptionRecord {
                tier: Tier::Tier2,
                expiration_time_ms: 1_700_000_000_000,
            }
        );
    }

    param_test! {
        test_unknown_on_chain_tier_is_rejected: [
            fits_u8: (9),
            exceeds_u8: (300),
        ]
    }
    fn test_unknown_on_chain_tier_is_rejected(raw_tier: u32) {
        let field_id = ObjectID::random();
        let content = test_utils::subscription_field_content_with_raw_tier(
            SuiAddress::random_for_testing_only(),
            raw_tier,
            1,
        );

        assert!(matches!(
            SubscriptionRecord::try_from_field_content(field_id, &content),
            Err(SubscriptionClientError::InvalidMoveContent { object_id, reason })
                if object_id == field_id && reason.ends_with(&raw_tier.to_string())
        ));
    }

    param_test! {
        test_record_activity: [
            expires_later: (1_001, 1_000, true),
            expires_now: (1_000, 1_000, false),
            expired: (999, 1_000, false),
        ]
    }
    fn test_record_activity(expiration_time_ms: u64, now_ms: u64, expected: bool) {
        let record = SubscriptionRecord {
            tier: Tier::Tier1,
            expiration_time_ms,
        };
        assert_eq!(record.is_active_at(now_ms), expected);
    }

    #[test]
    fn parses_clock_timestamp() {
        let clock_id = ObjectID::random();
        let timestamp = clock_timestamp_ms(clock_id, test_utils::clock_object_response(42))
            .expect("valid clock");
        assert_eq!(timestamp, 42);
    }
}
