//! Model-serving engine access
//!
//! - types.rs: probe results and pull progress records
//! - parser.rs: newline-delimited pull stream decoding
//! - client.rs: `ModelEngine` trait and the HTTP `EngineClient`
//! - error.rs: transport errors (never leave the client)

pub mod types;
pub mod parser;
pub mod client;
pub mod error;

pub use client::{
    endpoint, EngineClient, EngineConfig, ModelEngine, DEFAULT_ENGINE_BASE_URL, GENERATE_PATH,
    PULL_PATH, TAGS_PATH,
};
pub use error::EngineError;
pub use parser::parse_pull_line;
pub use types::{ConnectionProbeResult, PullProgressEvent};
