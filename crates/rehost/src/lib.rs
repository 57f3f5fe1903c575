//! Asset rehosting: move externally hosted images and files onto a stable
//! host, concurrently, without ever failing the surrounding conversion.
//!
//! The [`Pipeline`] consumes the URL table produced by `debb-engine`, runs
//! one job per unique source URL over a bounded pool, and writes back
//! whatever destinations it managed to obtain. Network access is abstracted
//! behind the [`Transport`] capability trait.

pub mod error;
mod pipeline;
mod recover;
mod transport;

pub use crate::pipeline::{Pipeline, RehostConfig};
#[cfg(any(test, feature = "mock"))]
pub use crate::transport::MockTransport;
pub use crate::transport::{Fetched, Offline, Transport, TransportHandle};
