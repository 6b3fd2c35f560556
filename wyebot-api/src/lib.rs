//! Client for the Wyebot external API.
//!
//! This crate walks the organization → location → sensor hierarchy of the
//! Wyebot REST API and returns typed, defaulted records for each resource.
//!
//! - [`transport`] - the [`Transport`] seam and the reqwest-backed [`HttpTransport`]
//! - [`client`] - [`WyebotClient`], one fetcher per resource
//! - [`records`] - typed records decoded from the API's nested JSON
//! - [`label`] - [`LabelText`], the lenient scalar-to-text decoder
//! - [`envelope`] - `{resource: {data: ...}}` unwrapping
//! - [`error`] - error types

pub mod client;
pub mod envelope;
pub mod error;
pub mod label;
pub mod records;
pub mod transport;

pub use client::{ResourceScope, TestWindow, WyebotClient};
pub use error::{ApiError, Result};
pub use label::LabelText;
pub use records::RfAnalytics;
pub use transport::{Endpoint, HttpTransport, Params, Transport};
