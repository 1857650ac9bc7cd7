//! Provider module for goalsplit
//!
//! Text-generation backends behind a single trait, an instance-owned
//! registry, and the orchestrator that tries them in order.

mod client;
mod error;
mod http;
mod mock;
mod orchestrator;
mod registry;
mod types;

pub use client::ProviderClient;
pub use error::ProviderError;
pub use http::{HttpProvider, classify_response};
pub use mock::{MockProvider, MockResponse, canned_payload};
pub use orchestrator::{MOCK_PROVIDER_ID, ProviderOrchestrator};
pub use registry::ProviderRegistry;
pub use types::{CallOptions, ProviderConfig, ProviderResult, RawPayload};
