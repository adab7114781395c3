//! The resource adapter state machine.
//!
//! The host forbids multiplexing one connection across transaction branches
//! and sharing one branch across connections, but its wire protocol does not
//! track either rule. [`XaResource`] enforces both locally: a single
//! current-branch slot, plus the set of branches started or joined on this
//! adapter and not yet dissociated. Every precondition is checked before any
//! request is sent.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use tracing::debug;

use crate::connection::{StartControls, XaConnection, XaOperation, XaRequest, XaReply};
use crate::error::{XaError, XaResult};
use crate::flags::{
    TMENDRSCAN, TMFAIL, TMJOIN, TMNOFLAGS, TMRESUME, TMSTARTRSCAN, TMSUCCESS, TMSUSPEND, XA_OK,
    XA_RDONLY,
};
use crate::xid::Xid;

/// Maximum branch identifiers returned per recover call.
pub const RECOVER_PAGE_SIZE: usize = 64;

/// Process-wide resource-manager id counter. Ids are diagnostic tags, never
/// reused; the explicit start value keeps them recognizable in traces.
static NEXT_RESOURCE_MANAGER_ID: AtomicI32 = AtomicI32::new(0x1001);

/// Distributed-transaction resource manager over one host connection.
///
/// Per-instance calls are expected to be serialized by the caller, matching
/// the host's connection-exclusivity rule; only the id counter above is
/// shared between adapters.
pub struct XaResource<C: XaConnection> {
    connection: C,
    resource_manager_id: i32,
    current_branch: Option<Xid>,
    known_branches: HashSet<Xid>,
    transaction_timeout: i32,
    lock_wait: i32,
}

impl<C: XaConnection> XaResource<C> {
    /// Wrap a connection in a resource adapter.
    pub fn new(connection: C) -> Self {
        let resource_manager_id = NEXT_RESOURCE_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            connection,
            resource_manager_id,
            current_branch: None,
            known_branches: HashSet::new(),
            transaction_timeout: 0,
            lock_wait: 0,
        }
    }

    /// The diagnostic resource-manager id assigned at construction.
    pub fn resource_manager_id(&self) -> i32 {
        self.resource_manager_id
    }

    /// The branch currently associated with this connection, if any.
    pub fn current_branch(&self) -> Option<&Xid> {
        self.current_branch.as_ref()
    }

    /// True when `xid` was started or joined here and not yet dissociated.
    pub fn is_branch_known(&self, xid: &Xid) -> bool {
        self.known_branches.contains(xid)
    }

    /// Associate the connection with a transaction branch.
    ///
    /// # Errors
    /// `XAER_PROTO` when a branch is already active on this adapter;
    /// `XAER_INVAL` for flags the host level does not accept.
    pub fn start(&mut self, xid: &Xid, flags: i32) -> XaResult<()> {
        if let Some(active) = &self.current_branch {
            return Err(XaError::protocol(format!(
                "branch {} is already active on this connection",
                active
            )));
        }
        let caps = self.connection.capabilities();
        match flags {
            TMNOFLAGS | TMJOIN => {}
            TMRESUME if caps.suspend_resume => {}
            _ => {
                return Err(XaError::invalid_argument(format!(
                    "start flags {:#x} not accepted at host level",
                    flags
                )))
            }
        }

        let controls = caps.start_controls.then(|| StartControls {
            transaction_timeout: self.transaction_timeout,
            lock_wait: self.lock_wait,
            loosely_coupled: caps.loosely_coupled
                && self.connection.properties().loosely_coupled_support,
        });

        let reply = self.exchange(XaRequest {
            operation: XaOperation::Start,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags,
            controls,
        })?;
        Self::expect_ok(&reply)?;

        debug!(rmid = self.resource_manager_id, %xid, flags, "branch started");
        self.connection.transaction_manager().set_local_transaction(false);
        self.current_branch = Some(xid.clone());
        if flags != TMRESUME {
            self.known_branches.insert(xid.clone());
        }
        Ok(())
    }

    /// Dissociate the connection from a transaction branch.
    ///
    /// # Errors
    /// `XAER_PROTO` when `xid` was never started or joined on this adapter
    /// (checked before any request is sent); `XAER_INVAL` for flags the
    /// host level does not accept.
    pub fn end(&mut self, xid: &Xid, flags: i32) -> XaResult<()> {
        let caps = self.connection.capabilities();
        match flags {
            TMSUCCESS | TMFAIL => {}
            TMSUSPEND if caps.suspend_resume => {}
            _ => {
                return Err(XaError::invalid_argument(format!(
                    "end flags {:#x} not accepted at host level",
                    flags
                )))
            }
        }
        if !self.known_branches.contains(xid) {
            return Err(XaError::protocol(format!(
                "branch {} was not started on this connection",
                xid
            )));
        }

        let reply = self.exchange(XaRequest {
            operation: XaOperation::End,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags,
            controls: None,
        })?;
        Self::expect_ok(&reply)?;

        debug!(rmid = self.resource_manager_id, %xid, flags, "branch ended");
        self.current_branch = None;
        if flags != TMSUSPEND {
            self.known_branches.remove(xid);
        }
        Ok(())
    }

    /// First phase of two-phase commit.
    ///
    /// Returns [`XA_RDONLY`] when the branch did only read work and is
    /// already complete, otherwise [`XA_OK`]. The host keeps prepared
    /// branches indefinitely until committed, rolled back, or forgotten; no
    /// local bookkeeping is added here.
    pub fn prepare(&mut self, xid: &Xid) -> XaResult<i32> {
        let reply = self.exchange(XaRequest {
            operation: XaOperation::Prepare,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags: TMNOFLAGS,
            controls: None,
        })?;
        match reply.return_code {
            XA_OK => Ok(XA_OK),
            XA_RDONLY => Ok(XA_RDONLY),
            rc => Err(XaError::from_return_code(rc)),
        }
    }

    /// Commit a branch, optionally with the one-phase optimization.
    pub fn commit(&mut self, xid: &Xid, one_phase: bool) -> XaResult<()> {
        let flags = if one_phase {
            crate::flags::TMONEPHASE
        } else {
            TMNOFLAGS
        };
        let reply = self.exchange(XaRequest {
            operation: XaOperation::Commit,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags,
            controls: None,
        })?;
        Self::expect_ok(&reply)?;
        debug!(rmid = self.resource_manager_id, %xid, one_phase, "branch committed");
        self.after_transaction_boundary(false);
        Ok(())
    }

    /// Roll a branch back.
    pub fn rollback(&mut self, xid: &Xid) -> XaResult<()> {
        let reply = self.exchange(XaRequest {
            operation: XaOperation::Rollback,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags: TMNOFLAGS,
            controls: None,
        })?;
        Self::expect_ok(&reply)?;
        debug!(rmid = self.resource_manager_id, %xid, "branch rolled back");
        self.after_transaction_boundary(true);
        Ok(())
    }

    /// Tell the host to discard a heuristically completed branch.
    ///
    /// Advisory: only negative return codes are failures.
    pub fn forget(&mut self, xid: &Xid) -> XaResult<()> {
        let reply = self.exchange(XaRequest {
            operation: XaOperation::Forget,
            resource_manager_id: self.resource_manager_id,
            xid: Some(xid.clone()),
            flags: TMNOFLAGS,
            controls: None,
        })?;
        if reply.return_code < 0 {
            return Err(XaError::from_return_code(reply.return_code));
        }
        Ok(())
    }

    /// Fetch one page of prepared or heuristically completed branch ids.
    ///
    /// At most [`RECOVER_PAGE_SIZE`] identifiers are returned per call;
    /// callers page with `TMSTARTRSCAN`, then `TMNOFLAGS`, then
    /// `TMENDRSCAN`, or use [`recover_all`](Self::recover_all).
    pub fn recover(&mut self, flags: i32) -> XaResult<Vec<Xid>> {
        let scan = TMSTARTRSCAN | TMENDRSCAN;
        if flags & !scan != 0 {
            return Err(XaError::invalid_argument(format!(
                "recover flags {:#x} are not scan flags",
                flags
            )));
        }
        let mut reply = self.exchange(XaRequest {
            operation: XaOperation::Recover,
            resource_manager_id: self.resource_manager_id,
            xid: None,
            flags,
            controls: None,
        })?;
        reply.xids.truncate(RECOVER_PAGE_SIZE);
        Ok(reply.xids)
    }

    /// Drive a complete recovery scan and collect every branch id.
    pub fn recover_all(&mut self) -> XaResult<Vec<Xid>> {
        let mut all = self.recover(TMSTARTRSCAN)?;
        while all.len() % RECOVER_PAGE_SIZE == 0 && !all.is_empty() {
            let page = self.recover(TMNOFLAGS)?;
            if page.is_empty() {
                break;
            }
            all.extend(page);
        }
        all.extend(self.recover(TMENDRSCAN)?);
        Ok(all)
    }

    /// True when `other` fronts the same resource manager as this adapter.
    ///
    /// Compares the connections' catalog names, not the diagnostic ids;
    /// any lookup failure yields `false` rather than an error.
    pub fn is_same_rm<D: XaConnection>(&self, other: &XaResource<D>) -> bool {
        match (
            self.connection.catalog_name(),
            other.connection.catalog_name(),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// The transaction timeout applied to the next branch start, in seconds.
    pub fn transaction_timeout(&self) -> i32 {
        self.transaction_timeout
    }

    /// Set the transaction timeout applied to the next branch start.
    ///
    /// Returns `false` without effect on hosts below the minimum level.
    pub fn set_transaction_timeout(&mut self, seconds: i32) -> bool {
        if !self.connection.capabilities().set_transaction_timeout {
            return false;
        }
        self.transaction_timeout = seconds;
        true
    }

    /// Set the lock-wait time applied to the next branch start, in seconds.
    pub fn set_lock_wait(&mut self, seconds: i32) {
        self.lock_wait = seconds;
    }

    fn exchange(&mut self, request: XaRequest) -> XaResult<XaReply> {
        let reply = self
            .connection
            .send_and_receive(&request)
            .map_err(XaError::rm_failure)?;
        if let Some(err) = XaError::from_reply(reply.error_class, reply.return_code) {
            return Err(err);
        }
        Ok(reply)
    }

    fn expect_ok(reply: &XaReply) -> XaResult<()> {
        if reply.return_code != XA_OK {
            return Err(XaError::from_return_code(reply.return_code));
        }
        Ok(())
    }

    /// Post-commit/rollback bookkeeping: the host silently resets the
    /// session isolation level across a transaction boundary, and held
    /// cursors may need closing depending on holdability. The session also
    /// returns to local transaction mode.
    fn after_transaction_boundary(&mut self, on_rollback: bool) {
        let tm = self.connection.transaction_manager();
        tm.mark_global_transaction_boundary();
        tm.resend_isolation_level();
        tm.set_local_transaction(true);
        let close_cursors =
            self.connection.check_statement_holdability() && !tm.hold_indicator();
        if close_cursors {
            self.connection.mark_cursors_closed(on_rollback);
        }
    }
}
