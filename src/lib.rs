//! fwsync - concurrent configuration sync for firewall management planes
//!
//! This crate bulk-manages firewall configuration objects (addresses and
//! address groups) on a remote management plane. Batches of create/update/
//! delete operations fan out across a bounded worker pool with retry on
//! transient device faults, and asynchronous commit jobs are polled to a
//! terminal state.

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod scope;
pub mod sync;
