// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Bindings to call the subscription manager contract from Rust.

pub mod client;
pub mod config;
pub mod contracts;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
mod utils;

pub use utils::normalize_sui_address;
