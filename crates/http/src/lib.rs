//! HTTP transport for the Dropload upload engine.
//!
//! Sends each upload request with `reqwest`, as a multipart form or a raw
//! body, and reports upload progress while the body is streamed out.

pub mod client;
mod progress;

pub use client::{Error, HttpTransport};
