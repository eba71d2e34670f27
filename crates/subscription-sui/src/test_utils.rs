// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for the subscription manager client.
//!
//! [`MockSubscriptionRpc`] serves canned node responses and counts the calls it receives, the
//! fixture functions build node responses with the shapes the contract produces.

use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
    sync::{
        Mutex,
        PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use jsonrpsee::{
    core::ClientError,
    types::{ErrorObjectOwned, error::INVALID_PARAMS_CODE},
};
use move_core_types::{identifier::Identifier, language_storage::StructTag};
use serde_json::Value;
use sui_sdk::{
    error::Error as SuiSdkError,
    rpc_types::{
        BcsEvent,
        EventFilter,
        EventPage,
        SuiEvent,
        SuiMoveStruct,
        SuiMoveValue,
        SuiObjectData,
        SuiObjectDataOptions,
        SuiObjectResponse,
        SuiObjectResponseError,
        SuiParsedData,
        SuiParsedMoveObject,
    },
};
use sui_types::{
    SUI_CLOCK_OBJECT_ID,
    SUI_FRAMEWORK_ADDRESS,
    TypeTag,
    base_types::{ObjectDigest, ObjectID, SequenceNumber, SuiAddress},
    digests::TransactionDigest,
    dynamic_field::DynamicFieldName,
    event::EventID,
    object::Owner,
};

use crate::{
    client::{
        DynamicFieldLookup,
        SubscriptionClientResult,
        SubscriptionReadApi,
        rpc::dynamic_field_lookup_from_result,
    },
    config::ClientConfig,
    contracts::{MODULE, subscription_manager},
    types::Tier,
};

fn identifier(name: &str) -> Identifier {
    Identifier::from_str(name).expect("test identifiers are valid")
}

/// Returns the struct tag of the `Subscription` value stored in the subscriptions table.
fn subscription_struct_tag(package_id: ObjectID) -> StructTag {
    StructTag {
        address: package_id.into(),
        module: identifier(MODULE),
        name: identifier("Subscription"),
        type_params: vec![],
    }
}

fn framework_struct_tag(module: &str, name: &str, type_params: Vec<TypeTag>) -> StructTag {
    StructTag {
        address: SUI_FRAMEWORK_ADDRESS,
        module: identifier(module),
        name: identifier(name),
        type_params,
    }
}

/// Wraps the fields of a Move object into parsed object content.
pub fn move_object_content(type_: StructTag, fields: SuiMoveStruct) -> SuiParsedData {
    SuiParsedData::MoveObject(SuiParsedMoveObject {
        type_,
        has_public_transfer: false,
        fields,
    })
}

/// Returns an object response with the given content and owner.
pub fn object_response(
    object_id: ObjectID,
    owner: Option<Owner>,
    content: Option<SuiParsedData>,
) -> SuiObjectResponse {
    SuiObjectResponse::new_with_data(SuiObjectData {
        object_id,
        version: SequenceNumber::from_u64(1),
        digest: ObjectDigest::random(),
        type_: None,
        owner,
        previous_transaction: None,
        storage_rebate: None,
        display: None,
        content,
        bcs: None,
    })
}

/// Returns the content of the dynamic field holding the subscription of `user`.
pub fn subscription_field_content(
    user: SuiAddress,
    tier: Tier,
    expiration_time_ms: u64,
) -> SuiParsedData {
    subscription_field_content_with_raw_tier(user, tier.as_u8().into(), expiration_time_ms)
}

/// Like [`subscription_field_content`], but allows tier values unknown to the client.
pub fn subscription_field_content_with_raw_tier(
    user: SuiAddress,
    raw_tier: u32,
    expiration_time_ms: u64,
) -> SuiParsedData {
    let value_type = subscription_struct_tag(ObjectID::ZERO);
    let value = SuiMoveStruct::WithTypes {
        type_: value_type.clone(),
        fields: BTreeMap::from([
            ("tier".to_owned(), SuiMoveValue::Number(raw_tier)),
            (
                "expiration_time".to_owned(),
                SuiMoveValue::String(expiration_time_ms.to_string()),
            ),
        ]),
    };
    move_object_content(
        framework_struct_tag(
            "dynamic_field",
            "Field",
            vec![TypeTag::Address, TypeTag::Struct(Box::new(value_type))],
        ),
        SuiMoveStruct::WithFields(BTreeMap::from([
            (
                "id".to_owned(),
                SuiMoveValue::UID {
                    id: ObjectID::random(),
                },
            ),
            ("name".to_owned(), SuiMoveValue::Address(user)),
            ("value".to_owned(), SuiMoveValue::Struct(value)),
        ])),
    )
}

/// Returns the response for the clock object at `0x6` showing the given time.
pub fn clock_object_response(timestamp_ms: u64) -> SuiObjectResponse {
    object_response(
        SUI_CLOCK_OBJECT_ID,
        Some(Owner::Shared {
            initial_shared_version: SequenceNumber::from_u64(1),
        }),
        Some(move_object_content(
            framework_struct_tag("clock", "Clock", vec![]),
            SuiMoveStruct::WithFields(BTreeMap::from([
                (
                    "id".to_owned(),
                    SuiMoveValue::UID {
                        id: SUI_CLOCK_OBJECT_ID,
                    },
                ),
                (
                    "timestamp_ms".to_owned(),
                    SuiMoveValue::String(timestamp_ms.to_string()),
                ),
            ])),
        )),
    )
}

/// Returns a `SubscriptionEvent` of the package with the given JSON content.
pub fn subscription_sui_event(
    package_id: ObjectID,
    parsed_json: Value,
    event_seq: u64,
    timestamp_ms: Option<u64>,
) -> SuiEvent {
    SuiEvent {
        id: EventID {
            tx_digest: TransactionDigest::random(),
            event_seq,
        },
        package_id,
        transaction_module: identifier(MODULE),
        sender: SuiAddress::ZERO,
        type_: subscription_manager::SubscriptionEvent
            .to_move_struct_tag_with_package(package_id, &[])
            .expect("event struct tag is valid"),
        parsed_json,
        bcs: BcsEvent::new(vec![]),
        timestamp_ms,
    }
}

/// Returns a well-formed `SubscriptionEvent` emitted at `timestamp_ms`.
pub fn purchase_event(
    package_id: ObjectID,
    user: SuiAddress,
    tier: Tier,
    expiration_time_ms: u64,
    timestamp_ms: Option<u64>,
) -> SuiEvent {
    subscription_sui_event(
        package_id,
        serde_json::json!({
            "user": user.to_string(),
            "tier": tier.as_u8(),
            "expiration_time": expiration_time_ms.to_string(),
        }),
        0,
        timestamp_ms,
    )
}

/// A deployed subscription manager with random IDs.
#[derive(Debug, Clone)]
pub struct ManagerFixture {
    /// The ID of the package.
    pub package_id: ObjectID,
    /// The ID of the shared manager object.
    pub manager_id: ObjectID,
    /// The version at which the manager was shared.
    pub initial_shared_version: SequenceNumber,
    /// The admin of the manager.
    pub admin: SuiAddress,
    /// The funds collected so far, in MIST.
    pub total_collected: u64,
    /// The ID of the subscriptions table.
    pub table_id: ObjectID,
}

impl Default for ManagerFixture {
    fn default() -> Self {
        Self {
            package_id: ObjectID::random(),
            manager_id: ObjectID::random(),
            initial_shared_version: SequenceNumber::from_u64(7),
            admin: SuiAddress::random_for_testing_only(),
            total_collected: 60_000_000,
            table_id: ObjectID::random(),
        }
    }
}

impl ManagerFixture {
    /// Returns a client configuration pointing at the fixture.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            rpc_url: "http://127.0.0.1:9000".to_owned(),
            package_id: self.package_id,
            subscription_manager_id: self.manager_id,
        }
    }

    /// Returns the struct tag of the manager object.
    pub fn manager_struct_tag(&self) -> StructTag {
        subscription_manager::SubscriptionManager
            .to_move_struct_tag_with_package(self.package_id, &[])
            .expect("manager struct tag is valid")
    }

    /// Returns the fields of the manager object.
    pub fn fields(&self) -> BTreeMap<String, SuiMoveValue> {
        let table = SuiMoveStruct::WithTypes {
            type_: framework_struct_tag(
                "table",
                "Table",
                vec![
                    TypeTag::Address,
                    TypeTag::Struct(Box::new(subscription_struct_tag(self.package_id))),
                ],
            ),
            fields: BTreeMap::from([
                ("id".to_owned(), SuiMoveValue::UID { id: self.table_id }),
                ("size".to_owned(), SuiMoveValue::String("0".to_owned())),
            ]),
        };
        BTreeMap::from([
            ("id".to_owned(), SuiMoveValue::UID { id: self.manager_id }),
            ("admin".to_owned(), SuiMoveValue::Address(self.admin)),
            (
                "total_collected".to_owned(),
                SuiMoveValue::String(self.total_collected.to_string()),
            ),
            ("subscriptions".to_owned(), SuiMoveValue::Struct(table)),
        ])
    }

    /// Returns the node response for the manager object.
    pub fn object_response(&self) -> SuiObjectResponse {
        self.object_response_with_content(move_object_content(
            self.manager_struct_tag(),
            SuiMoveStruct::WithFields(self.fields()),
        ))
    }

    /// Returns a response for the manager object with replaced content.
    pub fn object_response_with_content(&self, content: SuiParsedData) -> SuiObjectResponse {
        object_response(
            self.manager_id,
            Some(Owner::Shared {
                initial_shared_version: self.initial_shared_version,
            }),
            Some(content),
        )
    }
}

/// The canned outcome of a dynamic-field lookup.
#[derive(Debug, Clone)]
pub enum MockFieldResponse {
    /// The node returns the field object.
    Found(SuiObjectResponse),
    /// The node rejects the lookup with an invalid-parameters error.
    InvalidParams,
    /// The node fails with an internal error.
    InternalError,
    /// The request times out.
    Timeout,
}

/// An in-memory [`SubscriptionReadApi`] serving canned responses.
#[derive(Debug, Default)]
pub struct MockSubscriptionRpc {
    objects: HashMap<ObjectID, SuiObjectResponse>,
    dynamic_fields: HashMap<(ObjectID, String), MockFieldResponse>,
    events: Vec<SuiEvent>,
    max_page_size: Option<usize>,
    object_reads: Mutex<HashMap<ObjectID, usize>>,
    event_queries: AtomicUsize,
    event_filters: Mutex<Vec<EventFilter>>,
}

impl MockSubscriptionRpc {
    /// Creates a mock without any objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `response` for reads of `object_id`.
    pub fn with_object(mut self, object_id: ObjectID, response: SuiObjectResponse) -> Self {
        self.objects.insert(object_id, response);
        self
    }

    /// Serves the manager object and its shared owner.
    pub fn with_manager(self, fixture: &ManagerFixture) -> Self {
        self.with_object(fixture.manager_id, fixture.object_response())
    }

    /// Serves the clock object showing the given time.
    pub fn with_clock(self, timestamp_ms: u64) -> Self {
        self.with_object(SUI_CLOCK_OBJECT_ID, clock_object_response(timestamp_ms))
    }

    /// Stores a subscription for `user` in the table of the manager.
    pub fn with_subscription(
        self,
        fixture: &ManagerFixture,
        user: SuiAddress,
        tier: Tier,
        expiration_time_ms: u64,
    ) -> Self {
        let field_id = ObjectID::random();
        let response = object_response(
            field_id,
            Some(Owner::ObjectOwner(fixture.table_id.into())),
            Some(subscription_field_content(user, tier, expiration_time_ms)),
        );
        self.with_dynamic_field(fixture.table_id, user, MockFieldResponse::Found(response))
    }

    /// Serves a canned response for the lookup of `user` in the table `table_id`.
    pub fn with_dynamic_field(
        mut self,
        table_id: ObjectID,
        user: SuiAddress,
        response: MockFieldResponse,
    ) -> Self {
        self.dynamic_fields
            .insert((table_id, user.to_string()), response);
        self
    }

    /// Serves the events, which must be ordered newest first.
    pub fn with_events(mut self, events: Vec<SuiEvent>) -> Self {
        self.events = events;
        self
    }

    /// Caps the number of events returned per page, regardless of the requested limit.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = Some(max_page_size);
        self
    }

    /// Returns the number of reads of the object.
    pub fn object_reads(&self, object_id: ObjectID) -> usize {
        self.object_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&object_id)
            .copied()
            .unwrap_or_default()
    }

    /// Returns the number of event pages requested.
    pub fn event_queries(&self) -> usize {
        self.event_queries.load(Ordering::SeqCst)
    }

    /// Returns the filters of all event queries, in order.
    pub fn event_filters(&self) -> Vec<EventFilter> {
        self.event_filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn call_error(code: i32, message: &str) -> SuiSdkError {
    SuiSdkError::RpcError(ClientError::Call(ErrorObjectOwned::owned(
        code,
        message.to_owned(),
        None::<()>,
    )))
}

#[async_trait]
impl SubscriptionReadApi for MockSubscriptionRpc {
    async fn get_object_with_options(
        &self,
        object_id: ObjectID,
        _options: SuiObjectDataOptions,
    ) -> SubscriptionClientResult<SuiObjectResponse> {
        *self
            .object_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(object_id)
            .or_default() += 1;
        Ok(self.objects.get(&object_id).cloned().unwrap_or_else(|| {
            SuiObjectResponse::new_with_error(SuiObjectResponseError::NotExists { object_id })
        }))
    }

    async fn get_dynamic_field_object(
        &self,
        parent_object_id: ObjectID,
        name: DynamicFieldName,
    ) -> SubscriptionClientResult<DynamicFieldLookup> {
        let key = match &name.value {
            Value::String(key) => key.clone(),
            other => other.to_string(),
        };
        let result = match self.dynamic_fields.get(&(parent_object_id, key)) {
            Some(MockFieldResponse::Found(response)) => Ok(response.clone()),
            Some(MockFieldResponse::InvalidParams) => {
                Err(call_error(INVALID_PARAMS_CODE, "invalid dynamic field name"))
            }
            Some(MockFieldResponse::InternalError) => Err(call_error(-32603, "internal error")),
            Some(MockFieldResponse::Timeout) => Err(SuiSdkError::RpcError(ClientError::RequestTimeout)),
            None => Ok(SuiObjectResponse::new_with_error(
                SuiObjectResponseError::DynamicFieldNotFound { parent_object_id },
            )),
        };
        dynamic_field_lookup_from_result(result)
    }

    async fn query_events(
        &self,
        query: EventFilter,
        cursor: Option<EventID>,
        limit: Option<usize>,
        descending_order: bool,
    ) -> SubscriptionClientResult<EventPage> {
        assert!(descending_order, "subscription events are queried newest first");
        self.event_queries.fetch_add(1, Ordering::SeqCst);
        self.event_filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query);

        let start = match cursor {
            Some(cursor) => self
                .events
                .iter()
                .position(|event| event.id == cursor)
                .map_or(self.events.len(), |index| index + 1),
            None => 0,
        };
        let page_size = limit
            .unwrap_or(usize::MAX)
            .min(self.max_page_size.unwrap_or(usize::MAX));
        let data: Vec<_> = self.events[start..]
            .iter()
            .take(page_size)
            .cloned()
            .collect();
        let has_next_page = start + data.len() < self.events.len();

        Ok(EventPage {
            next_cursor: data.last().map(|event| event.id.clone()),
            data,
            has_next_page,
        })
    }
}
