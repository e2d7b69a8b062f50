//! Test fixtures: scripted mock plugins and event helpers.

pub mod mocks;

pub use mocks::{drain_events, FlakyPlugin, FnPlugin, MockPlugin, SlowPlugin};
