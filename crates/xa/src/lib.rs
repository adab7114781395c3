//! Distributed-transaction resource adapter for the legacy host.
//!
//! The host's wire protocol has no notion of "this connection is mid-branch":
//! preventing a connection from being multiplexed across transaction
//! branches, and enforcing the start/end/commit-or-rollback lifecycle, is
//! entirely this crate's responsibility. [`XaResource`] layers that state
//! machine over a request/reply connection and a transaction-manager
//! collaborator.
//!
//! # Example
//!
//! ```ignore
//! use hostlink_xa::{XaResource, Xid, TMNOFLAGS, TMSUCCESS, XA_OK};
//!
//! let mut resource = XaResource::new(connection);
//! let xid = Xid::generate();
//!
//! resource.start(&xid, TMNOFLAGS)?;
//! // ... perform transactional work on the connection ...
//! resource.end(&xid, TMSUCCESS)?;
//!
//! if resource.prepare(&xid)? == XA_OK {
//!     resource.commit(&xid, false)?;
//! } else {
//!     // read-only branch, already complete
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod error;
mod flags;
mod resource;
mod xid;

pub use connection::{
    ConnectionProperties, StartControls, TransactionManager, XaConnection, XaOperation, XaRequest,
    XaReply,
};
pub use error::{XaError, XaResult};
pub use flags::*;
pub use resource::{XaResource, RECOVER_PAGE_SIZE};
pub use xid::Xid;
