//! Portfolio management module
//!
//! Position tracking, account balance, and order sizing.

pub mod balance;
pub mod position;
pub mod risk;

pub use balance::*;
pub use position::*;
pub use risk::*;
