// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Builder for programmable transactions calling the subscription manager contract.

use std::fmt;

use sui_types::{
    SUI_CLOCK_OBJECT_ID,
    SUI_CLOCK_OBJECT_SHARED_VERSION,
    base_types::{ObjectID, SuiAddress},
    programmable_transaction_builder::ProgrammableTransactionBuilder,
    transaction::{Argument, Command, ObjectArg, ProgrammableTransaction, SharedObjectMutability},
};

use super::SubscriptionClientResult;
use crate::{
    contracts::{FunctionTag, subscription_manager},
    types::Tier,
};

/// A PTB builder for subscription manager calls.
///
/// The resulting transaction is unsigned and carries neither sender nor gas data.
pub struct SubscriptionPtbBuilder {
    pt_builder: ProgrammableTransactionBuilder,
    package_id: ObjectID,
}

impl fmt::Debug for SubscriptionPtbBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionPtbBuilder")
            .field("package_id", &self.package_id)
            .finish_non_exhaustive()
    }
}

impl SubscriptionPtbBuilder {
    /// Creates a new builder for calls into the package `package_id`.
    pub fn new(package_id: ObjectID) -> Self {
        Self {
            pt_builder: ProgrammableTransactionBuilder::new(),
            package_id,
        }
    }

    /// Splits a coin holding `amount` MIST off the gas coin.
    pub fn split_gas_coin(&mut self, amount: u64) -> SubscriptionClientResult<Argument> {
        let amount_arg = self.pt_builder.pure(amount)?;
        Ok(self
            .pt_builder
            .command(Command::SplitCoins(Argument::GasCoin, vec![amount_arg])))
    }

    /// Adds a call to `buy_subscription` paying the price of `tier` from the gas coin.
    ///
    /// The payment is always a coin argument; for [`Tier::Free`] it holds zero MIST.
    pub fn buy_subscription(
        &mut self,
        manager: ObjectArg,
        tier: Tier,
    ) -> SubscriptionClientResult<&mut Self> {
        let manager_arg = self.pt_builder.obj(manager)?;
        let tier_arg = self.pt_builder.pure(tier.as_u8())?;
        let payment_arg = self.split_gas_coin(tier.price())?;
        let clock_arg = self.pt_builder.obj(clock_object_arg())?;
        self.move_call(
            subscription_manager::buy_subscription,
            vec![manager_arg, tier_arg, payment_arg, clock_arg],
        )?;
        Ok(self)
    }

    /// Adds a call to `withdraw_all_funds`.
    ///
    /// Only the admin recorded in the manager object can execute the call successfully.
    pub fn withdraw_all_funds(
        &mut self,
        manager: ObjectArg,
        admin: SuiAddress,
    ) -> SubscriptionClientResult<&mut Self> {
        let manager_arg = self.pt_builder.obj(manager)?;
        let admin_arg = self.pt_builder.pure(admin)?;
        self.move_call(
            subscription_manager::withdraw_all_funds,
            vec![manager_arg, admin_arg],
        )?;
        Ok(self)
    }

    /// Returns the finished transaction.
    pub fn finish(self) -> ProgrammableTransaction {
        self.pt_builder.finish()
    }

    fn move_call(
        &mut self,
        function: FunctionTag<'_>,
        arguments: Vec<Argument>,
    ) -> SubscriptionClientResult<Argument> {
        let (module, function) = function.identifiers()?;
        Ok(self.pt_builder.programmable_move_call(
            self.package_id,
            module,
            function,
            vec![],
            arguments,
        ))
    }
}

/// Returns the read-only argument for the shared clock object at `0x6`.
pub fn clock_object_arg() -> ObjectArg {
    ObjectArg::SharedObject {
        id: SUI_CLOCK_OBJECT_ID,
        initial_shared_version: SUI_CLOCK_OBJECT_SHARED_VERSION,
        mutability: SharedObjectMutability::Immutable,
    }
}

#[cfg(test)]
mod tests {
    use sui_types::{
        base_types::SequenceNumber,
        transaction::{CallArg, ProgrammableMoveCall},
    };
    use subscription_test_utils::param_test;

    use super::*;

    fn manager_arg() -> ObjectArg {
        manager_arg_with_id(ObjectID::random())
    }

    fn manager_arg_with_id(id: ObjectID) -> ObjectArg {
        ObjectArg::SharedObject {
            id,
            initial_shared_version: SequenceNumber::from_u64(3),
            mutability: SharedObjectMutability::Mutable,
        }
    }

    fn single_move_call(ptb: &ProgrammableTransaction) -> &ProgrammableMoveCall {
        let calls: Vec<_> = ptb
            .commands
            .iter()
            .filter_map(|command| match command {
                Command::MoveCall(call) => Some(call.as_ref()),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 1, "expected exactly one move call");
        calls[0]
    }

    fn pure_input(ptb: &ProgrammableTransaction, argument: &Argument) -> Vec<u8> {
        let Argument::Input(index) = argument else {
            panic!("expected an input argument, got {argument:?}");
        };
        match &ptb.inputs[usize::from(*index)] {
            CallArg::Pure(bytes) => bytes.clone(),
            other => panic!("expected a pure input, got {other:?}"),
        }
    }

    param_test! {
        test_buy_subscription_pays_tier_price: [
            free: (Tier::Free, 0),
            tier1: (Tier::Tier1, 10_000_000),
            tier2: (Tier::Tier2, 50_000_000),
        ]
    }
    fn test_buy_subscription_pays_tier_price(tier: Tier, expected_cost: u64) {
        let package_id = ObjectID::random();
        let mut builder = SubscriptionPtbBuilder::new(package_id);
        builder
            .buy_subscription(manager_arg(), tier)
            .expect("building the call succeeds");
        let ptb = builder.finish();

        let split_commands: Vec<_> = ptb
            .commands
            .iter()
            .enumerate()
            .filter_map(|(index, command)| match command {
                Command::SplitCoins(Argument::GasCoin, amounts) => Some((index, amounts)),
                _ => None,
            })
            .collect();
        assert_eq!(split_commands.len(), 1, "expected exactly one payment coin");
        let (split_index, amounts) = split_commands[0];
        assert_eq!(amounts.len(), 1);
        assert_eq!(
            pure_input(&ptb, &amounts[0]),
            bcs::to_bytes(&expected_cost).expect("u64 serializes")
        );

        let call = single_move_call(&ptb);
        assert_eq!(call.package, package_id);
        assert_eq!(call.module.to_string(), "SubscriptionManager");
        assert_eq!(call.function.to_string(), "buy_subscription");
        assert_eq!(call.arguments.len(), 4);
        assert_eq!(
            pure_input(&ptb, &call.arguments[1]),
            vec![tier.as_u8()],
            "tier must be encoded as u8"
        );
        let split_index = u16::try_from(split_index).expect("few commands");
        assert!(matches!(
            call.arguments[2],
            Argument::Result(index) | Argument::NestedResult(index, 0) if index == split_index
        ));
    }

    #[test]
    fn buy_subscription_passes_manager_and_clock() {
        let manager_id = ObjectID::random();
        let mut builder = SubscriptionPtbBuilder::new(ObjectID::random());
        builder
            .buy_subscription(manager_arg_with_id(manager_id), Tier::Tier1)
            .expect("building the call succeeds");
        let ptb = builder.finish();
        let call = single_move_call(&ptb);

        let shared_object_of = |argument: &Argument| match argument {
            Argument::Input(index) => match &ptb.inputs[usize::from(*index)] {
                CallArg::Object(ObjectArg::SharedObject { id, mutability, .. }) => {
                    (*id, matches!(mutability, SharedObjectMutability::Mutable))
                }
                other => panic!("expected a shared object input, got {other:?}"),
            },
            other => panic!("expected an input argument, got {other:?}"),
        };
        assert_eq!(shared_object_of(&call.arguments[0]), (manager_id, true));
        assert_eq!(
            shared_object_of(&call.arguments[3]),
            (SUI_CLOCK_OBJECT_ID, false),
            "the clock is passed by immutable reference"
        );
    }

    #[test]
    fn withdraw_all_funds_passes_admin_address() {
        let admin = SuiAddress::random_for_testing_only();
        let mut builder = SubscriptionPtbBuilder::new(ObjectID::random());
        builder
            .withdraw_all_funds(manager_arg(), admin)
            .expect("building the call succeeds");
        let ptb = builder.finish();

        let call = single_move_call(&ptb);
        assert_eq!(call.function.to_string(), "withdraw_all_funds");
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(
            pure_input(&ptb, &call.arguments[1]),
            bcs::to_bytes(&admin).expect("address serializes")
        );
        assert!(
            !ptb.commands
                .iter()
                .any(|command| matches!(command, Command::SplitCoins(..)))
        );
    }
}
