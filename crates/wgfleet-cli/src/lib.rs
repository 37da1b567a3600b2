//! Operator-facing pieces of the wgfleet CLI

pub mod config;
pub mod service;
