#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod clock;
pub mod engine;
pub mod error;
pub mod force;
pub mod game;
pub mod matchmaking;
pub mod message;
pub mod oracle;
pub mod rating;
pub mod server;
pub mod session;
pub mod store;
pub mod test_util;
pub mod wire;
