//! Flag, return-code, and error-code constants from the X/Open XA
//! specification, as the host's transaction server understands them.

// ============================================================================
// Association flags
// ============================================================================

/// No flags set.
pub const TMNOFLAGS: i32 = 0x0000_0000;

/// Caller is joining an existing transaction branch.
pub const TMJOIN: i32 = 0x0020_0000;

/// Caller is resuming association with a suspended branch.
pub const TMRESUME: i32 = 0x0800_0000;

/// Dissociate from the branch; portion of work has completed successfully.
pub const TMSUCCESS: i32 = 0x0400_0000;

/// Dissociate from the branch; portion of work has failed.
pub const TMFAIL: i32 = 0x2000_0000;

/// Suspend (not end) the caller's association with the branch.
pub const TMSUSPEND: i32 = 0x0200_0000;

/// Start a recovery scan.
pub const TMSTARTRSCAN: i32 = 0x0100_0000;

/// End a recovery scan.
pub const TMENDRSCAN: i32 = 0x0080_0000;

/// Use the one-phase commit optimization.
pub const TMONEPHASE: i32 = 0x4000_0000;

// ============================================================================
// Return codes
// ============================================================================

/// Normal execution.
pub const XA_OK: i32 = 0;

/// The branch did only read work and has been committed implicitly.
pub const XA_RDONLY: i32 = 3;

// ============================================================================
// Error codes
// ============================================================================

/// Base of the rollback-reason code range.
pub const XA_RBBASE: i32 = 100;

/// Rollback for an unspecified reason.
pub const XA_RBROLLBACK: i32 = XA_RBBASE;

/// Rollback caused by a communication failure.
pub const XA_RBCOMMFAIL: i32 = XA_RBBASE + 1;

/// A deadlock was detected.
pub const XA_RBDEADLOCK: i32 = XA_RBBASE + 2;

/// An integrity condition was violated.
pub const XA_RBINTEGRITY: i32 = XA_RBBASE + 3;

/// Rollback for a reason not otherwise listed.
pub const XA_RBOTHER: i32 = XA_RBBASE + 4;

/// A protocol error inside the resource manager.
pub const XA_RBPROTO: i32 = XA_RBBASE + 5;

/// The branch exceeded its timeout.
pub const XA_RBTIMEOUT: i32 = XA_RBBASE + 6;

/// Transient condition; the branch may be retried.
pub const XA_RBTRANSIENT: i32 = XA_RBBASE + 7;

/// Upper bound of the rollback-reason range.
pub const XA_RBEND: i32 = XA_RBTRANSIENT;

/// Asynchronous operation already outstanding.
pub const XAER_ASYNC: i32 = -2;

/// Resource manager error on the branch.
pub const XAER_RMERR: i32 = -3;

/// The Xid is not known to the resource manager.
pub const XAER_NOTA: i32 = -4;

/// Invalid arguments were given.
pub const XAER_INVAL: i32 = -5;

/// Call issued in an improper context.
pub const XAER_PROTO: i32 = -6;

/// Resource manager unavailable.
pub const XAER_RMFAIL: i32 = -7;

/// The Xid already exists.
pub const XAER_DUPID: i32 = -8;

/// Work is being done outside any global transaction.
pub const XAER_OUTSIDE: i32 = -9;

/// True when `code` lies in the rollback-reason range.
pub fn is_rollback_code(code: i32) -> bool {
    (XA_RBBASE..=XA_RBEND).contains(&code)
}
