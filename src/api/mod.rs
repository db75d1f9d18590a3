mod client;
mod transport;

pub use client::{ApiClient, NewStep, Upload};
#[cfg(test)]
pub use transport::{Body, mock::MockTransport};
