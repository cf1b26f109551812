//! Mixin Computer payment flows.
//!
//! Wires the core types, the API client and the Solana builder into the
//! flows a user runs: checking and paying for registration, quoting fees,
//! and turning a Solana call into payable invoices through a staged
//! [`pipeline`].
//!
//! # Modules
//!
//! - [`config`] - Client configuration with environment variable expansion
//! - [`error`] - Flow, pipeline and configuration errors
//! - [`fee`] - Fee quotes and their validity window
//! - [`invoice`] - Invoice assembly for a system call
//! - [`pipeline`] - Ordered, validated invocation stages
//! - [`registration`] - Registration check and registration link

pub mod config;
pub mod error;
pub mod fee;
pub mod invoice;
pub mod pipeline;
pub mod registration;

pub use config::ClientConfig;
pub use error::{ConfigError, FlowError, PipelineError};
pub use pipeline::{InvokeRequest, Pipeline, PipelineOutput, Stage};
