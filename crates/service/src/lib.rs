//! Service layer for botstore
//!
//! Conversation bookkeeping on top of the storage traits: get-or-create of
//! users and active sessions, message recording and history, per-user stats.
//! Every call is checked against an [`botstore_core::AccessPolicy`] first.

#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]

mod conversation_service;
mod error;

pub use conversation_service::ConversationService;
pub use error::ServiceError;
