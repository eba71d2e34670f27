// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Rust bindings for the Move types of the subscription manager contract.

pub mod events;
pub mod move_structs;

pub use events::{EventQueryFilter, SubscriptionEvent};
pub use move_structs::{
    InvalidTierError,
    ManagerObject,
    PRICE_TIER1,
    PRICE_TIER2,
    SubscriptionRecord,
    SubscriptionStatus,
    Tier,
    tier_cost,
};
