#![deny(missing_docs)]
#![doc = "Serial protocol client for the glitch probe: wire constants, blocking transports, and the write-coalescing device link."]

pub mod client;
pub mod transport;
pub mod wire;

pub use client::DeviceLink;
pub use transport::{LinkConfig, SerialTransport, Transport};

#[cfg(feature = "mock")]
pub use transport::mock::MockTransport;
