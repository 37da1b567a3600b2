//! Gateway control seam and path-MTU tuning
//!
//! The regional gateway process (tunnel daemon plus its management endpoint)
//! is an opaque collaborator. This crate defines the narrow typed contract
//! the rest of wgfleet talks to, an HTTP implementation of it, and the
//! binary-search MTU tuner that drives the probe operation.

pub mod control;
pub mod http;
pub mod mtu;

pub use control::{GatewayControl, GatewayError, Liveness};
pub use http::{HttpGateway, HttpGatewayConfig};
pub use mtu::{MtuTuner, MtuTunerConfig};
