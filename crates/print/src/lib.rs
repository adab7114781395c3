//! Print-subsystem object lists for the legacy host.
//!
//! Building a list of print objects (spooled files, output queues) is a
//! paginated conversation: one request, then reply packets until the host
//! sets the last-reply flag. [`PrintObjectList`] runs that loop either on
//! the calling thread or on a background thread, accumulates results into a
//! never-shrinking cache, and lets any number of consumer threads block on
//! partial progress, poll completion, or receive per-object listener events
//! while the build is still streaming.
//!
//! # Example
//!
//! ```ignore
//! use hostlink_print::{ListKind, PrintObjectList, SelectionFilter};
//!
//! let list = PrintObjectList::new(conversation, ListKind::SpooledFiles);
//! list.open_asynchronously()?;
//! list.wait_for_item(10)?;          // block until ten objects arrived
//! let first = list.get_object(0)?;
//! list.wait_for_list_to_complete()?;
//! list.close();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod conversation;
mod events;
mod list;
mod object;

pub use conversation::{
    Conversation, ListKind, ListReply, ListRequest, SelectionFilter, CP_ATTRIBUTES, CP_IDENTITY,
    CP_MESSAGE_HELP, CP_MESSAGE_ID, CP_MESSAGE_TEXT, RC_EMPTY_LIST, RC_ESCAPE_MESSAGE,
    RC_FUNCTION_NOT_SUPPORTED, RC_OK,
};
pub use events::PrintObjectListListener;
pub use list::PrintObjectList;
pub use object::PrintObject;
