//! # ponte-store
//!
//! SQLite-backed persistence for the bridge: the contact directory
//! (address → display name) and the durable mirror of the admin
//! allow-list.

mod registry;
mod store;

pub use registry::AdminRegistry;
pub use store::{Contact, Store};
