//! Configuration module

mod bot;
mod risk;
mod signal;

pub use bot::*;
pub use risk::*;
pub use signal::*;
