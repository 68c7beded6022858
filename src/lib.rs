//! dvrflow - finished-recording to transcode job pipeline
//!
//! This library crate exposes the pipeline for the binary and for
//! integration testing.

pub mod bus;
pub mod config;
pub mod derive;
pub mod fetch;
pub mod publisher;
pub mod queue;
pub mod worker;
