//! Domain-specific storage traits.
//!
//! Both backends implement every trait; the service layer only sees these.

mod message;
mod schema;
mod session;
mod user;

pub use message::MessageStore;
pub use schema::SchemaStore;
pub use session::ChatSessionStore;
pub use user::UserStore;
