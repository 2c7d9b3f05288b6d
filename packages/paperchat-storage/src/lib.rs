pub mod blob;
pub mod chat;
pub mod db;
pub mod documents;
pub mod models;
pub mod outbox;
pub mod qdrant;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
