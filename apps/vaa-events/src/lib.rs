//! Read access to the VAA event table and an admin client for a guardian's
//! privileged control-plane socket.

pub mod admin;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod hex_serde;
pub mod identity;
pub mod query;
pub mod vaa;

pub use error::{EventsError, Result};
