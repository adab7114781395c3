//! hostlink - client access library for legacy midrange host services.
//!
//! Two subsystems are provided: a distributed-transaction resource adapter
//! ([`xa`]) enforcing the branch lifecycle over a request/reply connection,
//! and a print object list engine ([`print`]) streaming paginated list
//! results with synchronous and background consumption.
//!
//! # Quick Start
//!
//! ```ignore
//! use hostlink::print::{ListKind, PrintObjectList};
//!
//! let list = PrintObjectList::new(conversation, ListKind::SpooledFiles);
//! list.open_asynchronously()?;
//! list.wait_for_list_to_complete()?;
//! for object in list.get_objects()? {
//!     println!("{}", object.identity_text());
//! }
//! ```
//!
//! Shared leaves (error taxonomy, codepoints, host capability negotiation)
//! are re-exported at the crate root.

pub use hostlink_core::{Codepoint, Error, Result, ServerCapabilities, Vrm};

/// Distributed-transaction resource adapter.
pub mod xa {
    pub use hostlink_xa::*;
}

/// Print object list engine.
pub mod print {
    pub use hostlink_print::*;
}
