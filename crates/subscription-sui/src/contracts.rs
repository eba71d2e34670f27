// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Module, function, and type names of the subscription manager Move package.

use std::{fmt::Display, str::FromStr};

use move_core_types::{
    account_address::AccountAddress,
    identifier::Identifier,
    language_storage::StructTag as MoveStructTag,
};
use sui_types::{TypeTag, base_types::ObjectID};

/// Name of the Move module holding the subscription manager.
pub const MODULE: &str = "SubscriptionManager";

/// Tag identifying a Move function by module and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionTag<'a> {
    /// Move module of the function.
    pub module: &'a str,
    /// Name of the function.
    pub name: &'a str,
}

impl FunctionTag<'_> {
    /// Returns the module and function identifiers, ready to be used in a move call.
    pub fn identifiers(&self) -> anyhow::Result<(Identifier, Identifier)> {
        Ok((
            Identifier::from_str(self.module)?,
            Identifier::from_str(self.name)?,
        ))
    }
}

impl Display for FunctionTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

/// Tag identifying a Move struct by module and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructTag<'a> {
    /// Move module of the struct.
    pub module: &'a str,
    /// Name of the struct.
    pub name: &'a str,
}

impl StructTag<'_> {
    /// Converts the tag into a fully qualified Move struct tag defined in `package_id`.
    pub fn to_move_struct_tag_with_package(
        &self,
        package_id: ObjectID,
        type_params: &[TypeTag],
    ) -> anyhow::Result<MoveStructTag> {
        Ok(MoveStructTag {
            address: AccountAddress::from(package_id),
            module: Identifier::from_str(self.module)?,
            name: Identifier::from_str(self.name)?,
            type_params: type_params.to_vec(),
        })
    }
}

impl Display for StructTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

/// Functions and types of the `SubscriptionManager` module.
#[allow(non_upper_case_globals)]
pub mod subscription_manager {
    use super::{FunctionTag, MODULE, StructTag};

    /// `buy_subscription(manager, tier: u8, payment: Coin<SUI>, clock: &Clock)`
    pub const buy_subscription: FunctionTag<'static> = FunctionTag {
        module: MODULE,
        name: "buy_subscription",
    };

    /// `withdraw_all_funds(manager, admin: address)`
    pub const withdraw_all_funds: FunctionTag<'static> = FunctionTag {
        module: MODULE,
        name: "withdraw_all_funds",
    };

    /// The shared manager object.
    pub const SubscriptionManager: StructTag<'static> = StructTag {
        module: MODULE,
        name: "SubscriptionManager",
    };

    /// The event emitted on every purchase.
    pub const SubscriptionEvent: StructTag<'static> = StructTag {
        module: MODULE,
        name: "SubscriptionEvent",
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_struct_tag_uses_package_address() {
        let package_id = ObjectID::from_hex_literal("0x42").expect("valid object id");
        let tag = subscription_manager::SubscriptionEvent
            .to_move_struct_tag_with_package(package_id, &[])
            .expect("valid identifiers");

        assert_eq!(tag.address, AccountAddress::from(package_id));
        assert_eq!(tag.module.as_str(), "SubscriptionManager");
        assert_eq!(tag.name.as_str(), "SubscriptionEvent");
        assert!(tag.type_params.is_empty());
    }

    #[test]
    fn function_tag_displays_module_path() {
        assert_eq!(
            subscription_manager::buy_subscription.to_string(),
            "SubscriptionManager::buy_subscription"
        );
    }
}
