// Copyright (c) Walrus Foundation
// SPDX-License-Identifier: Apache-2.0

//! Macros for writing parameterized tests.

/// Generates one test per case, each calling the test function with the case's arguments.
///
/// The tests are placed in a module named after the test function, so a case `foo` of
/// `test_fn` is reported as `test_fn::foo`. Attributes before the function name are applied to
/// every case, and an optional return type can be given after the name.
///
/// # Examples
///
/// ```
/// # use subscription_test_utils::param_test;
/// param_test! {
///     test_add: [
///         zero: (0, 0, 0),
///         one: (1, 1, 2),
///     ]
/// }
/// fn test_add(lhs: u64, rhs: u64, sum: u64) {
///     assert_eq!(lhs + rhs, sum);
/// }
/// # fn main() {}
/// ```
#[macro_export]
macro_rules! param_test {
    (
        $(#[$outer:meta])*
        $func_name:ident -> $return_ty:ty : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* $(,)? ) ),+ $(,)?
        ]
    ) => {
        $crate::param_test! {
            @mod [$(#[$outer])*]
            $func_name -> $return_ty : [
                $( $(#[$inner])* $case_name: ( $($args),* ) ),+
            ]
        }
    };
    (
        @mod $outer:tt
        $func_name:ident -> $return_ty:ty : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* ) ),+
        ]
    ) => {
        mod $func_name {
            use super::*;

            $(
                $crate::param_test! {
                    @case $outer
                    $(#[$inner])*
                    $func_name -> $return_ty : $case_name ( $($args),* )
                }
            )+
        }
    };
    (
        @case [$(#[$outer:meta])*]
        $(#[$inner:meta])*
        $func_name:ident -> $return_ty:ty : $case_name:ident ( $($args:expr),* )
    ) => {
        #[test]
        $(#[$outer])*
        $(#[$inner])*
        fn $case_name() -> $return_ty {
            $func_name($($args),*)
        }
    };
    (
        $(#[$outer:meta])*
        $func_name:ident : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* $(,)? ) ),+ $(,)?
        ]
    ) => {
        $crate::param_test! {
            $(#[$outer])*
            $func_name -> () : [
                $( $(#[$inner])* $case_name: ( $($args),* ) ),+
            ]
        }
    };
}

/// Like [`param_test!`], but for async test functions run with `#[tokio::test]`.
///
/// # Examples
///
/// ```
/// # use subscription_test_utils::async_param_test;
/// async_param_test! {
///     test_double -> Result<(), String> : [
///         one: (1, 2),
///         two: (2, 4),
///     ]
/// }
/// async fn test_double(value: u64, expected: u64) -> Result<(), String> {
///     assert_eq!(value * 2, expected);
///     Ok(())
/// }
/// # fn main() {}
/// ```
#[macro_export]
macro_rules! async_param_test {
    (
        $(#[$outer:meta])*
        $func_name:ident -> $return_ty:ty : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* $(,)? ) ),+ $(,)?
        ]
    ) => {
        $crate::async_param_test! {
            @mod [$(#[$outer])*]
            $func_name -> $return_ty : [
                $( $(#[$inner])* $case_name: ( $($args),* ) ),+
            ]
        }
    };
    (
        @mod $outer:tt
        $func_name:ident -> $return_ty:ty : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* ) ),+
        ]
    ) => {
        mod $func_name {
            use super::*;

            $(
                $crate::async_param_test! {
                    @case $outer
                    $(#[$inner])*
                    $func_name -> $return_ty : $case_name ( $($args),* )
                }
            )+
        }
    };
    (
        @case [$(#[$outer:meta])*]
        $(#[$inner:meta])*
        $func_name:ident -> $return_ty:ty : $case_name:ident ( $($args:expr),* )
    ) => {
        #[tokio::test]
        $(#[$outer])*
        $(#[$inner])*
        async fn $case_name() -> $return_ty {
            $func_name($($args),*).await
        }
    };
    (
        $(#[$outer:meta])*
        $func_name:ident : [
            $( $(#[$inner:meta])* $case_name:ident: ( $($args:expr),* $(,)? ) ),+ $(,)?
        ]
    ) => {
        $crate::async_param_test! {
            $(#[$outer])*
            $func_name -> () : [
                $( $(#[$inner])* $case_name: ( $($args),* ) ),+
            ]
        }
    };
}

#[cfg(test)]
mod tests {
    param_test! {
        test_parity: [
            even: (4, true),
            odd: (7, false),
            #[should_panic]
            mismatch: (7, true),
        ]
    }
    fn test_parity(value: u32, is_even: bool) {
        assert_eq!(value % 2 == 0, is_even);
    }

    param_test! {
        test_checked_sub -> Result<(), String> : [
            smaller: (5, 3),
            equal: (3, 3),
        ]
    }
    fn test_checked_sub(lhs: u32, rhs: u32) -> Result<(), String> {
        lhs.checked_sub(rhs)
            .map(|_| ())
            .ok_or_else(|| format!("{lhs} - {rhs} underflows"))
    }

    async_param_test! {
        test_async_sum: [
            empty: (&[], 0),
            several: (&[1, 2, 3], 6),
        ]
    }
    async fn test_async_sum(values: &[u64], expected: u64) {
        let sum = async { values.iter().sum::<u64>() }.await;
        assert_eq!(sum, expected);
    }
}
