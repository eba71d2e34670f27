// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Executes the CLI commands against a client.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;
use subscription_sui::{
    client::{SubscriptionManagerClient, SubscriptionReadApi},
    types::EventQueryFilter,
};
use sui_types::transaction::{ProgrammableTransaction, TransactionKind};

use crate::Command;

/// Runs the command and returns the text to print.
pub(crate) async fn run<R: SubscriptionReadApi>(
    client: &SubscriptionManagerClient<R>,
    command: Command,
) -> Result<String> {
    match command {
        Command::Subscription { address } => to_json(&client.get_subscription(&address).await?),
        Command::Status { address } => to_json(&client.is_subscription_active(&address).await?),
        Command::Events {
            start_time,
            end_time,
            limit,
        } => {
            let filter = EventQueryFilter {
                start_time,
                end_time,
                limit,
            };
            to_json(&client.get_subscription_events(filter).await?)
        }
        Command::TotalCollected => to_json(&client.get_total_collected().await?),
        Command::Admin => to_json(&client.get_admin().await?),
        Command::BuildPurchase { tier } => encode_transaction(
            client
                .build_purchase_transaction_from_raw_tier(tier)
                .await?,
        ),
        Command::BuildWithdraw { admin } => {
            encode_transaction(client.build_withdraw_all_funds_transaction(&admin).await?)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Encodes the transaction kind as base64 BCS, ready to be completed with sender and gas data.
fn encode_transaction(ptb: ProgrammableTransaction) -> Result<String> {
    let kind = TransactionKind::ProgrammableTransaction(ptb);
    Ok(BASE64.encode(bcs::to_bytes(&kind)?))
}

#[cfg(test)]
mod tests {
    use subscription_sui::{
        client::SubscriptionClientError,
        test_utils::{ManagerFixture, MockSubscriptionRpc},
        types::{SubscriptionStatus, Tier},
    };
    use sui_types::base_types::{ObjectID, SuiAddress};

    use super::*;

    fn subscriber() -> SuiAddress {
        SuiAddress::from(ObjectID::from_hex_literal("0x101").expect("valid object id"))
    }

    fn client(fixture: &ManagerFixture) -> SubscriptionManagerClient<MockSubscriptionRpc> {
        let user = subscriber();
        SubscriptionManagerClient::new_with_rpc(
            fixture.client_config(),
            MockSubscriptionRpc::new()
                .with_manager(fixture)
                .with_clock(1_000)
                .with_subscription(fixture, user, Tier::Tier2, 2_000),
        )
    }

    #[tokio::test]
    async fn status_is_printed_as_json() -> Result<()> {
        let fixture = ManagerFixture::default();
        let output = run(
            &client(&fixture),
            Command::Status {
                address: subscriber().to_string(),
            },
        )
        .await?;

        let status: SubscriptionStatus = serde_json::from_str(&output)?;
        assert_eq!(
            status,
            SubscriptionStatus {
                active: true,
                tier: Tier::Tier2,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_subscription_is_printed_as_null() -> Result<()> {
        let fixture = ManagerFixture::default();
        let output = run(
            &client(&fixture),
            Command::Subscription {
                address: "0x2".to_owned(),
            },
        )
        .await?;
        assert_eq!(output, "null");
        Ok(())
    }

    #[tokio::test]
    async fn purchase_is_encoded_as_transaction_kind() -> Result<()> {
        let fixture = ManagerFixture::default();
        let output = run(&client(&fixture), Command::BuildPurchase { tier: 1 }).await?;

        let kind: TransactionKind = bcs::from_bytes(&BASE64.decode(output)?)?;
        assert!(matches!(kind, TransactionKind::ProgrammableTransaction(_)));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_tier_is_rejected() {
        let fixture = ManagerFixture::default();
        let error = run(&client(&fixture), Command::BuildPurchase { tier: 3 })
            .await
            .expect_err("tier 3 does not exist");
        assert!(matches!(
            error.downcast_ref::<SubscriptionClientError>(),
            Some(SubscriptionClientError::InvalidTier(_))
        ));
    }
}
