//! HTTP client for the Mixin Computer API.
//!
//! [`ComputerClient::call`] sends one request and classifies the outcome as
//! a JSON value or an [`ApiError`]. The typed endpoints (computer info, user
//! lookup, nonce accounts, fee quotes) are thin wrappers that decode the
//! value into [`mixcomp::proto`] types.
//!
//! # Modules
//!
//! - [`client`] - [`ComputerClient`] and its endpoints
//! - [`constants`] - Default service URL
//! - [`error`] - [`ApiError`]
//!
//! # Feature Flags
//!
//! - `telemetry` - Records request outcomes on tracing spans

pub mod client;
pub mod constants;
pub mod error;

pub use client::ComputerClient;
pub use error::ApiError;
pub use reqwest::Method;
