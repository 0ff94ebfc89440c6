//! Request extractors that reject with the API error body.

pub mod json;
pub mod path_id;

pub use json::JsonBody;
pub use path_id::PathId;
