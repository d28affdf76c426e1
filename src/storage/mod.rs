mod entries;
mod feeds;
mod schema;
mod store;
mod types;
mod users;

pub use schema::Database;
pub use store::EntryStore;
pub use types::{entry_hash, DatabaseError, Entry, Feed, IngestedEntry, NewFeed, User};
