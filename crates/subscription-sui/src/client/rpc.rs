// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! The read interface of the Sui full node consumed by the subscription manager client.

use async_trait::async_trait;
use jsonrpsee::{core::ClientError, types::error::INVALID_PARAMS_CODE};
use sui_sdk::{
    SuiClient,
    error::Error as SuiSdkError,
    rpc_types::{EventFilter, EventPage, SuiObjectDataOptions, SuiObjectResponse},
};
use sui_types::{base_types::ObjectID, dynamic_field::DynamicFieldName, event::EventID};

use super::SubscriptionClientResult;

/// Outcome of a dynamic-field lookup.
///
/// A lookup miss is an expected result and therefore not an error.
#[derive(Debug, Clone)]
pub enum DynamicFieldLookup {
    /// The field exists; the response contains its object data.
    Found(SuiObjectResponse),
    /// There is no field with the given name.
    NotFound,
}

/// The node RPC methods used by the
/// [`SubscriptionManagerClient`][super::SubscriptionManagerClient].
#[async_trait]
pub trait SubscriptionReadApi: Send + Sync {
    /// Returns the object with the given ID.
    ///
    /// Mirrors [`sui_sdk::apis::ReadApi::get_object_with_options`].
    async fn get_object_with_options(
        &self,
        object_id: ObjectID,
        options: SuiObjectDataOptions,
    ) -> SubscriptionClientResult<SuiObjectResponse>;

    /// Looks up the dynamic field `name` of the parent object.
    ///
    /// Mirrors [`sui_sdk::apis::ReadApi::get_dynamic_field_object`], but reports lookup misses
    /// as [`DynamicFieldLookup::NotFound`].
    async fn get_dynamic_field_object(
        &self,
        parent_object_id: ObjectID,
        name: DynamicFieldName,
    ) -> SubscriptionClientResult<DynamicFieldLookup>;

    /// Returns a page of events matching the query.
    ///
    /// Mirrors [`sui_sdk::apis::EventApi::query_events`].
    async fn query_events(
        &self,
        query: EventFilter,
        cursor: Option<EventID>,
        limit: Option<usize>,
        descending_order: bool,
    ) -> SubscriptionClientResult<EventPage>;
}

#[async_trait]
impl SubscriptionReadApi for SuiClient {
    async fn get_object_with_options(
        &self,
        object_id: ObjectID,
        options: SuiObjectDataOptions,
    ) -> SubscriptionClientResult<SuiObjectResponse> {
        Ok(self
            .read_api()
            .get_object_with_options(object_id, options)
            .await?)
    }

    async fn get_dynamic_field_object(
        &self,
        parent_object_id: ObjectID,
        name: DynamicFieldName,
    ) -> SubscriptionClientResult<DynamicFieldLookup> {
        let result = self
            .read_api()
            .get_dynamic_field_object(parent_object_id, name)
            .await;
        dynamic_field_lookup_from_result(result)
    }

    async fn query_events(
        &self,
        query: EventFilter,
        cursor: Option<EventID>,
        limit: Option<usize>,
        descending_order: bool,
    ) -> SubscriptionClientResult<EventPage> {
        Ok(self
            .event_api()
            .query_events(query, cursor, limit, descending_order)
            .await?)
    }
}

/// Classifies the result of a dynamic-field RPC call.
///
/// Responses without object data and invalid-parameter errors are lookup misses, every other
/// error is propagated.
pub fn dynamic_field_lookup_from_result(
    result: Result<SuiObjectResponse, SuiSdkError>,
) -> SubscriptionClientResult<DynamicFieldLookup> {
    match result {
        Ok(response) if response.data.is_some() => Ok(DynamicFieldLookup::Found(response)),
        Ok(response) => {
            tracing::debug!(error = ?response.error, "dynamic field lookup returned no data");
            Ok(DynamicFieldLookup::NotFound)
        }
        Err(error) if is_invalid_params_error(&error) => {
            tracing::debug!(%error, "dynamic field lookup rejected as invalid parameters");
            Ok(DynamicFieldLookup::NotFound)
        }
        Err(error) => Err(error.into()),
    }
}

/// Returns true if the node rejected the call with the JSON-RPC invalid-parameters code.
pub(crate) fn is_invalid_params_error(error: &SuiSdkError) -> bool {
    matches!(
        error,
        SuiSdkError::RpcError(ClientError::Call(call_error))
            if call_error.code() == INVALID_PARAMS_CODE
    )
}
