//! Strategy engine module
//!
//! Maps market conditions to risk parameters and generates confluence-based
//! entry signals.

pub mod generator;
pub mod selector;
pub mod signal;

pub use generator::*;
pub use selector::*;
pub use signal::*;
