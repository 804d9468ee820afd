//! Market condition classification module

pub mod classifier;
pub mod condition;

pub use classifier::*;
pub use condition::*;
