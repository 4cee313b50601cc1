// ventaly-api: Async wire client for Venta appliances (HTTP + raw TCP dialects)
//
// Knows how to reach a device and get a JSON object back. Snapshots,
// polling and device identity live in `ventaly-core`.

pub mod dialect;
pub mod error;
pub mod json;
pub mod retry;
pub mod strategy;
pub mod transport;

pub use dialect::{ApiVersion, DIALECTS, DialectDefinition, Endpoint, HostEndpoint, HttpMethod};
pub use error::Error;
pub use json::{extract_json_objects, first_json_object};
pub use retry::RetryPolicy;
pub use strategy::{HttpStrategy, Strategy, TcpIdentity, TcpStrategy};
pub use transport::TransportConfig;

/// A decoded device response: one JSON object, keyed by section name.
pub type Payload = serde_json::Map<String, serde_json::Value>;
