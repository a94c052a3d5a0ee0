//! HTTP inbound adapter: error envelopes, response rendering, and probes.

pub mod classifier;
pub mod context;
pub mod envelope;
pub mod fallback;
pub mod health;
pub mod json;
pub mod response;
pub mod sink;

pub use classifier::{Classification, Classifier};
pub use context::{RequestBody, RequestContext};
pub use envelope::{ApiError, ErrorDetail, ErrorEnvelope};
pub use json::json_config;
pub use response::{AdapterError, ControllerResponse, Payload, ResponseAdapter};
pub use sink::{HttpSink, ResponseSink, WriterSink};
