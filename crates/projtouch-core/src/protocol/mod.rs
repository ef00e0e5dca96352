//! Protocol module containing the hub's event and message types.

pub mod messages;

pub use messages::*;
