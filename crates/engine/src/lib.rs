pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod mock;

pub use config::HttpEngineConfig;
pub use engine::{EngineOutput, FnEngine, Vector, VectorEngine, engine_fn};
pub use error::EngineError;
pub use http::HttpVectorEngine;
pub use mock::{FailingVectorEngine, FixedVectorEngine, MappingVectorEngine};
