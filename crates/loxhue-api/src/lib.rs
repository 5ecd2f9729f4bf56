// loxhue-api: Async Rust client for the Philips Hue CLIP v2 API (resources + event stream)

pub mod client;
pub mod error;
pub mod eventstream;
pub mod models;
pub mod transport;

pub use client::{HueClient, RetryPolicy};
pub use error::Error;
pub use eventstream::{EventStream, FrameDecoder};
pub use transport::{TlsMode, TransportConfig};
