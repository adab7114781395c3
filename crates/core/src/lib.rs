//! Shared leaves for the hostlink client access library.
//!
//! This crate holds what every host conversation needs before any protocol
//! logic runs: the error taxonomy, the self-describing codepoint field
//! carried inside reply datastreams, and the host version/capability
//! negotiation that gates protocol features.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codepoint;
pub mod error;
pub mod vrm;

pub use codepoint::Codepoint;
pub use error::{Error, Result};
pub use vrm::{ServerCapabilities, Vrm};
