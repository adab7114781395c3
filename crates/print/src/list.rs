//! The list-building engine.
//!
//! One producer (the thread running the protocol loop, either the caller or
//! a spawned background thread) appends to a never-shrinking cache while any
//! number of consumer threads read sizes, wait on partial progress, or pull
//! objects by index. All shared state lives in one mutex-guarded record with
//! a condition variable for progress; every append and every terminal
//! transition notifies all waiters, and waiters re-check their predicate in
//! a loop to tolerate spurious wakeups and pick up a stored build error.

use std::sync::Arc;

use hostlink_core::{Codepoint, Error, Result};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::conversation::{
    Conversation, ListKind, ListRequest, SelectionFilter, CP_ATTRIBUTES, CP_IDENTITY,
    RC_EMPTY_LIST, RC_ESCAPE_MESSAGE, RC_FUNCTION_NOT_SUPPORTED, RC_OK,
};
use crate::events::{ListenerRegistry, PrintObjectListListener};
use crate::object::PrintObject;

struct ListState {
    // Configuration, frozen once the list opens
    selection: SelectionFilter,
    id_filter: Option<String>,
    attributes: Option<Vec<u16>>,
    caching: bool,

    // Lifecycle
    opened: bool,
    building: bool,
    completed: bool,
    closed: bool,
    error: Option<Error>,

    // Cache: raw codepoint pairs in host order, plus the materialized view
    entries: Vec<(Codepoint, Codepoint)>,
    live_count: usize,
    materialized: Vec<PrintObject>,
    in_sync: bool,
}

impl ListState {
    fn new() -> Self {
        Self {
            selection: SelectionFilter::default(),
            id_filter: None,
            attributes: None,
            caching: true,
            opened: false,
            building: false,
            completed: false,
            closed: false,
            error: None,
            entries: Vec::new(),
            live_count: 0,
            materialized: Vec::new(),
            in_sync: true,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.opened || self.closed {
            return Err(Error::InvalidState("list must be open".to_string()));
        }
        Ok(())
    }
}

struct ListInner {
    conversation: Arc<dyn Conversation>,
    kind: ListKind,
    listeners: ListenerRegistry,
    state: Mutex<ListState>,
    progress: Condvar,
}

/// A list of print-system objects built over a host conversation.
///
/// One open per instance: the list moves from not-open through building to
/// completed, and [`close`](Self::close) is terminal. A fresh instance is
/// expected for a fresh enumeration.
pub struct PrintObjectList {
    inner: Arc<ListInner>,
}

impl PrintObjectList {
    /// Create an unopened list over the given conversation.
    pub fn new(conversation: Arc<dyn Conversation>, kind: ListKind) -> Self {
        Self {
            inner: Arc::new(ListInner {
                conversation,
                kind,
                listeners: ListenerRegistry::default(),
                state: Mutex::new(ListState::new()),
                progress: Condvar::new(),
            }),
        }
    }

    // ========================================================================
    // Configuration (before open)
    // ========================================================================

    /// Set the selection filter.
    ///
    /// # Errors
    /// `Error::InvalidState` once the list has been opened.
    pub fn set_selection(&self, selection: SelectionFilter) -> Result<()> {
        self.configure(|st| st.selection = selection)
    }

    /// Set an exact-identity filter.
    pub fn set_id_filter(&self, id_filter: impl Into<String>) -> Result<()> {
        let value = id_filter.into();
        self.configure(|st| st.id_filter = Some(value))
    }

    /// Choose which attribute ids to retrieve per object, replacing the
    /// defaults for this list kind.
    pub fn set_attributes_to_retrieve(&self, attributes: &[u16]) -> Result<()> {
        let owned = attributes.to_vec();
        self.configure(|st| st.attributes = Some(owned))
    }

    /// Enable or disable the materialized object cache.
    pub fn set_cache(&self, caching: bool) -> Result<()> {
        self.configure(|st| st.caching = caching)
    }

    fn configure(&self, apply: impl FnOnce(&mut ListState)) -> Result<()> {
        let mut st = self.inner.state.lock();
        if st.opened {
            return Err(Error::InvalidState(
                "list configuration cannot change after open".to_string(),
            ));
        }
        apply(&mut st);
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener for list lifecycle events.
    pub fn add_listener(&self, listener: Arc<dyn PrintObjectListListener>) {
        self.inner.listeners.add(listener);
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, listener: &Arc<dyn PrintObjectListListener>) {
        self.inner.listeners.remove(listener);
    }

    // ========================================================================
    // Opening
    // ========================================================================

    /// Run the build on the calling thread, returning when the list has
    /// completed or failed.
    ///
    /// Fires opened, then object-added per object, then error-occurred on
    /// failure, then completed. Waiters are signaled even when the build
    /// fails; the failure is also returned to the caller.
    pub fn open_synchronously(&self) -> Result<()> {
        self.mark_opened()?;
        self.inner.run_build()
    }

    /// Start the build on a background thread and return immediately.
    ///
    /// The same events fire, from the background thread. The build outcome
    /// is stored and re-raised from [`is_completed`](Self::is_completed),
    /// [`wait_for_item`](Self::wait_for_item), and
    /// [`wait_for_list_to_complete`](Self::wait_for_list_to_complete).
    ///
    /// # Errors
    /// `Error::InvalidState` when this configuration forbids background
    /// threads, or when the list is already open or closed.
    pub fn open_asynchronously(&self) -> Result<()> {
        if !self.inner.conversation.background_threads_allowed() {
            return Err(Error::InvalidState(
                "background threads are not permitted for this configuration".to_string(),
            ));
        }
        self.mark_opened()?;
        let inner = Arc::clone(&self.inner);
        std::thread::Builder::new()
            .name("hostlink-printlist".to_string())
            .spawn(move || {
                let _ = inner.run_build();
            })
            .map_err(|e| Error::Io(e.to_string()))?;
        Ok(())
    }

    fn mark_opened(&self) -> Result<()> {
        let mut st = self.inner.state.lock();
        if st.closed {
            return Err(Error::InvalidState("list is closed".to_string()));
        }
        if st.opened {
            return Err(Error::InvalidState("list is already open".to_string()));
        }
        st.opened = true;
        st.building = true;
        st.in_sync = false;
        Ok(())
    }

    // ========================================================================
    // Closing
    // ========================================================================

    /// Close the list and discard the cache.
    ///
    /// Never blocks on the network: an in-flight build keeps receiving, but
    /// every packet processed after this point is discarded rather than
    /// appended, and waiters are woken. Idempotent.
    pub fn close(&self) {
        {
            let mut st = self.inner.state.lock();
            if st.closed {
                return;
            }
            st.closed = true;
            st.entries.clear();
            st.live_count = 0;
            st.materialized.clear();
            st.in_sync = false;
        }
        debug!("print object list closed");
        self.inner.listeners.fire_closed();
        self.inner.progress.notify_all();
    }

    // ========================================================================
    // Consumption
    // ========================================================================

    /// Number of objects discovered so far; 0 after close.
    pub fn size(&self) -> usize {
        self.inner.state.lock().live_count
    }

    /// Whether the build has finished.
    ///
    /// # Errors
    /// Re-raises the stored build error once the build has terminated.
    pub fn is_completed(&self) -> Result<bool> {
        let st = self.inner.state.lock();
        if st.completed {
            if let Some(e) = &st.error {
                return Err(e.clone());
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Fetch one object by insertion index.
    ///
    /// With caching enabled, entries between the last materialized index
    /// and `index` are materialized on demand; a cache left stale by a
    /// concurrent background build is reconciled against the live count
    /// first, rebuilding from scratch when it cannot be trusted.
    ///
    /// # Errors
    /// `Error::InvalidState` when the list is not open;
    /// `Error::InvalidArgument` when `index` is past the live count.
    pub fn get_object(&self, index: usize) -> Result<PrintObject> {
        let mut st = self.inner.state.lock();
        st.ensure_open()?;
        if index >= st.live_count {
            return Err(Error::InvalidArgument(format!(
                "index {} beyond list size {}",
                index, st.live_count
            )));
        }
        if !st.caching {
            let (identity, attributes) = &st.entries[index];
            return Ok(PrintObject::new(identity.clone(), attributes.clone()));
        }
        if !st.in_sync {
            if st.materialized.len() > st.live_count {
                st.materialized.clear();
            }
            if !st.building {
                st.in_sync = true;
            }
        }
        while st.materialized.len() <= index {
            let next = st.materialized.len();
            let (identity, attributes) = st.entries[next].clone();
            st.materialized.push(PrintObject::new(identity, attributes));
        }
        Ok(st.materialized[index].clone())
    }

    /// Every object discovered so far, in host order.
    ///
    /// # Errors
    /// `Error::InvalidState` when the list is not open.
    pub fn get_objects(&self) -> Result<Vec<PrintObject>> {
        let st = self.inner.state.lock();
        st.ensure_open()?;
        Ok(st
            .entries
            .iter()
            .map(|(identity, attributes)| PrintObject::new(identity.clone(), attributes.clone()))
            .collect())
    }

    /// Block until at least `count` objects have arrived, or the list has
    /// completed or been closed.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a zero count; `Error::InvalidState`
    /// before open; the stored build error when the build failed.
    pub fn wait_for_item(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(Error::InvalidArgument(
                "item count must be at least 1".to_string(),
            ));
        }
        let mut st = self.inner.state.lock();
        if !st.opened {
            return Err(Error::InvalidState("list has not been opened".to_string()));
        }
        loop {
            if let Some(e) = &st.error {
                return Err(e.clone());
            }
            if st.live_count >= count || st.completed || st.closed {
                return Ok(());
            }
            self.inner.progress.wait(&mut st);
        }
    }

    /// Block until the build has terminated or the list has been closed.
    ///
    /// # Errors
    /// `Error::InvalidState` before open; the stored build error when the
    /// build failed.
    pub fn wait_for_list_to_complete(&self) -> Result<()> {
        let mut st = self.inner.state.lock();
        if !st.opened {
            return Err(Error::InvalidState("list has not been opened".to_string()));
        }
        loop {
            if let Some(e) = &st.error {
                return Err(e.clone());
            }
            if st.completed || st.closed {
                return Ok(());
            }
            self.inner.progress.wait(&mut st);
        }
    }
}

impl ListInner {
    /// Fire opened, run the protocol loop, then record the outcome. The
    /// outcome is also returned for the synchronous entry point.
    fn run_build(&self) -> Result<()> {
        self.listeners.fire_opened();
        let result = self.build_list();
        self.finish(&result);
        result
    }

    /// The protocol loop: one request, then reply packets until the host
    /// sets the last-reply flag.
    fn build_list(&self) -> Result<()> {
        let request = {
            let st = self.state.lock();
            ListRequest {
                kind: self.kind,
                selection: st.selection.clone(),
                id_filter: st.id_filter.clone(),
                attributes: st
                    .attributes
                    .clone()
                    .unwrap_or_else(|| self.kind.default_attributes().to_vec()),
            }
        };
        let correlation = self.conversation.new_correlation();
        debug!(kind = ?self.kind, correlation, "opening print object list");
        self.conversation.send(&request, correlation)?;

        loop {
            let reply = self
                .conversation
                .receive(correlation)?
                .ok_or_else(|| Error::Internal("list reply packet missing".to_string()))?;
            match reply.return_code() {
                RC_OK => {
                    let identity = reply.codepoint(CP_IDENTITY).cloned().ok_or_else(|| {
                        Error::Internal("list reply missing identity codepoint".to_string())
                    })?;
                    let attributes = reply
                        .codepoint(CP_ATTRIBUTES)
                        .cloned()
                        .unwrap_or_else(|| Codepoint::new(CP_ATTRIBUTES, Vec::new()));
                    let appended = {
                        let mut st = self.state.lock();
                        if st.closed || st.completed {
                            trace!("list closed; tossing reply packet");
                            false
                        } else {
                            st.entries.push((identity.clone(), attributes.clone()));
                            st.live_count += 1;
                            true
                        }
                    };
                    if appended {
                        self.listeners
                            .fire_object_added(&PrintObject::new(identity, attributes));
                        self.progress.notify_all();
                    }
                }
                RC_EMPTY_LIST => trace!("selection matched no objects"),
                RC_ESCAPE_MESSAGE => {
                    let (id, text, help) = reply.message_fields()?;
                    return Err(Error::ServerMessage { id, text, help });
                }
                RC_FUNCTION_NOT_SUPPORTED => return Err(Error::NotSupported),
                rc => return Err(Error::ErrorCompletingRequest(rc)),
            }
            if reply.is_last() {
                break;
            }
        }
        Ok(())
    }

    /// Terminal bookkeeping: store the outcome, fire error-occurred and
    /// completed, and signal every waiter, whatever the outcome was.
    /// Completed fires even when closed already fired from another thread.
    fn finish(&self, result: &Result<()>) {
        {
            let mut st = self.state.lock();
            st.building = false;
            st.completed = true;
            if let Err(e) = result {
                st.error = Some(e.clone());
            }
        }
        if let Err(e) = result {
            // The legacy rethrow path dropped errors outside its fixed
            // catalog; protocol-desync errors are logged and still
            // propagated here.
            if matches!(e, Error::Internal(_)) {
                warn!(error = %e, "unrecognized list build error");
            }
            self.listeners.fire_error_occurred(e);
        }
        self.listeners.fire_completed();
        self.progress.notify_all();
    }
}
