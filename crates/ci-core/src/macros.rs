// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Declarative macros for reducing boilerplate.
//!
//! `simple_display!` lives here; the companion `define_id!` macro (newtype
//! ID wrapper with a type prefix) lives in [`crate::id`] next to the
//! `IdBuf` type it wraps.

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// ```ignore
/// crate::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar(..) => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}
