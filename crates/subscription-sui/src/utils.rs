// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for working with Sui addresses and JSON object content.

use std::str::FromStr;

use serde_json::{Map, Value};
use sui_types::base_types::{ObjectID, SUI_ADDRESS_LENGTH, SuiAddress};

use crate::client::{SubscriptionClientError, SubscriptionClientResult};

/// Number of hex characters in a full Sui address.
const SUI_ADDRESS_HEX_LENGTH: usize = 2 * SUI_ADDRESS_LENGTH;

/// Normalizes a user-supplied address into a [`SuiAddress`].
///
/// The `0x` prefix is optional, the hex digits are case-insensitive, and short addresses are
/// left-padded with zeros to the full 32 bytes. For example `0x6`, `6`, and `0X06` all normalize
/// to `0x00..06`.
pub fn normalize_sui_address(address: &str) -> SubscriptionClientResult<SuiAddress> {
    let trimmed = address.trim();
    let hex_digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_digits.is_empty()
        || hex_digits.len() > SUI_ADDRESS_HEX_LENGTH
        || !hex_digits.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(SubscriptionClientError::InvalidAddress(address.to_owned()));
    }

    let padded = format!(
        "0x{:0>width$}",
        hex_digits.to_ascii_lowercase(),
        width = SUI_ADDRESS_HEX_LENGTH
    );
    SuiAddress::from_str(&padded)
        .map_err(|_| SubscriptionClientError::InvalidAddress(address.to_owned()))
}

/// Returns the field mapping of a JSON-encoded Move struct.
///
/// Structs returned by the node are either a plain mapping of their fields, or a
/// `{ "type": ..., "fields": { ... } }` wrapper around it.
pub(crate) fn struct_fields(value: &Value) -> Option<&Map<String, Value>> {
    let object = value.as_object()?;
    match object.get("fields") {
        Some(Value::Object(fields)) if object.contains_key("type") => Some(fields),
        _ => Some(object),
    }
}

/// Reads a `u64` field that the node may encode either as a JSON number or a decimal string.
pub(crate) fn u64_field(fields: &Map<String, Value>, name: &str) -> Result<u64, String> {
    match fields.get(name) {
        Some(Value::Number(number)) => number
            .as_u64()
            .ok_or_else(|| format!("field `{name}` is not an unsigned 64-bit integer")),
        Some(Value::String(string)) => string
            .parse()
            .map_err(|_| format!("field `{name}` is not an unsigned 64-bit integer: {string}")),
        Some(other) => Err(format!("field `{name}` has an unexpected shape: {other}")),
        None => Err(format!("missing field `{name}`")),
    }
}

/// Reads an address field.
pub(crate) fn address_field(fields: &Map<String, Value>, name: &str) -> Result<SuiAddress, String> {
    let Some(Value::String(address)) = fields.get(name) else {
        return Err(format!("missing or non-string address field `{name}`"));
    };
    normalize_sui_address(address).map_err(|_| format!("field `{name}` is not an address"))
}

/// Reads the object ID of a `UID` field, i.e. `{ "id": "0x.." }` or `{ "id": { "id": "0x.." } }`.
pub(crate) fn uid_field(fields: &Map<String, Value>, name: &str) -> Result<ObjectID, String> {
    let id = match fields.get(name) {
        Some(Value::String(id)) => id,
        Some(Value::Object(uid)) => match uid.get("id") {
            Some(Value::String(id)) => id,
            _ => return Err(format!("field `{name}` is not a UID")),
        },
        _ => return Err(format!("missing UID field `{name}`")),
    };
    ObjectID::from_hex_literal(id).map_err(|_| format!("field `{name}` is not an object ID: {id}"))
}
