//! FxGate Common Types
//!
//! This crate contains the types shared by the FxGate crates: the normalized
//! currency code, the supported currency allow-list and the clock abstraction
//! used for cache expiry.

pub mod currency;
pub mod time;

pub use currency::*;
pub use time::*;
