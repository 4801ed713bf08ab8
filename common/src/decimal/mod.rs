//! Decimal type utilities for exact monetary arithmetic

pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Monetary amount with arbitrary decimal precision
pub type Amount = Decimal;
