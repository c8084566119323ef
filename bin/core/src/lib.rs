//! The Showcase deployment engine: orchestrates a container daemon,
//! a git tool, a mongo store and a shared data-file volume to clone,
//! build, run, expose, monitor, reclaim and tag team projects on a
//! single shared container host.
//!
//! The HTTP facade is external; everything here is exposed as
//! in-process callables on [engine::Engine].

#[macro_use]
extern crate tracing;

pub mod config;
pub mod deploy;
pub mod docker;
pub mod engine;
pub mod helpers;
pub mod migrate;
pub mod permission;
pub mod prune;
pub mod reconcile;
pub mod tag;
pub mod transport;
