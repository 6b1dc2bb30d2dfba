//! Core types for botstore
//!
//! Domain types shared by the storage and service crates: the three persisted
//! records (users, chat sessions, messages), their validation rules, the
//! row-level access model and environment configuration.

mod access;
pub mod constants;
mod env_config;
mod error;
mod message;
mod session;
mod stats;
mod user;

pub use access::*;
pub use constants::*;
pub use env_config::*;
pub use error::*;
pub use message::*;
pub use session::*;
pub use stats::*;
pub use user::*;
