//! Custom Axum extractors.

pub mod actor;
pub mod path_id;

pub use actor::{actor_from_parts, client_addr, ClientActor};
pub use path_id::RawProjectId;
