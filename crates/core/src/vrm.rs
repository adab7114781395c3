//! Host version negotiation.
//!
//! The host reports a version/release/modification triple and a server
//! functional level at connect time. Rather than scattering numeric
//! comparisons through call sites, the triple is evaluated once into a set
//! of named capability flags that the protocol adapters consult.

/// Host version/release/modification triple.
///
/// Ordering is lexicographic over (version, release, modification), which is
/// how the host numbers its releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vrm {
    /// Major version
    pub version: u8,
    /// Release within the version
    pub release: u8,
    /// Modification level within the release
    pub modification: u8,
}

impl Vrm {
    /// Create a version triple.
    pub const fn new(version: u8, release: u8, modification: u8) -> Self {
        Self {
            version,
            release,
            modification,
        }
    }
}

impl std::fmt::Display for Vrm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}R{}M{}", self.version, self.release, self.modification)
    }
}

/// First level that accepts suspend/resume association flags.
const SUSPEND_RESUME_MIN: Vrm = Vrm::new(5, 4, 0);
/// First level that honors loosely-coupled branch configuration.
const LOOSELY_COUPLED_MIN: Vrm = Vrm::new(5, 1, 0);
/// First level where the transaction-timeout setter is not a no-op.
const SET_TIMEOUT_MIN: Vrm = Vrm::new(5, 3, 0);
/// Server functional level that accepts timeout/lock-wait controls on start.
const START_CONTROLS_LEVEL: u32 = 11;

/// Named protocol features derived from the negotiated host level.
///
/// Evaluated once per connection; adapters branch on these flags instead of
/// comparing version numbers inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerCapabilities {
    /// Branch association may be suspended and resumed
    pub suspend_resume: bool,
    /// Transaction timeout and lock-wait values piggyback on branch start
    pub start_controls: bool,
    /// Loosely-coupled branch support may be configured
    pub loosely_coupled: bool,
    /// The transaction-timeout setter takes effect
    pub set_transaction_timeout: bool,
}

impl ServerCapabilities {
    /// Derive capability flags from the negotiated version and functional level.
    pub fn negotiate(vrm: Vrm, functional_level: u32) -> Self {
        Self {
            suspend_resume: vrm >= SUSPEND_RESUME_MIN,
            start_controls: functional_level >= START_CONTROLS_LEVEL,
            loosely_coupled: vrm >= LOOSELY_COUPLED_MIN,
            set_transaction_timeout: vrm >= SET_TIMEOUT_MIN,
        }
    }

    /// Capability set with every feature enabled, for current-level hosts.
    pub fn full() -> Self {
        Self {
            suspend_resume: true,
            start_controls: true,
            loosely_coupled: true,
            set_transaction_timeout: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vrm_ordering() {
        assert!(Vrm::new(5, 4, 0) > Vrm::new(5, 3, 9));
        assert!(Vrm::new(6, 1, 0) > Vrm::new(5, 4, 5));
        assert_eq!(Vrm::new(5, 4, 0), Vrm::new(5, 4, 0));
    }

    #[test]
    fn test_vrm_display() {
        assert_eq!(Vrm::new(7, 2, 0).to_string(), "V7R2M0");
    }

    #[test]
    fn test_negotiate_old_host() {
        let caps = ServerCapabilities::negotiate(Vrm::new(4, 5, 0), 8);
        assert!(!caps.suspend_resume);
        assert!(!caps.start_controls);
        assert!(!caps.loosely_coupled);
        assert!(!caps.set_transaction_timeout);
    }

    #[test]
    fn test_negotiate_mid_host() {
        // V5R3: timeout setter works, suspend/resume still rejected
        let caps = ServerCapabilities::negotiate(Vrm::new(5, 3, 0), 11);
        assert!(!caps.suspend_resume);
        assert!(caps.start_controls);
        assert!(caps.loosely_coupled);
        assert!(caps.set_transaction_timeout);
    }

    #[test]
    fn test_negotiate_current_host() {
        let caps = ServerCapabilities::negotiate(Vrm::new(7, 4, 0), 16);
        assert_eq!(caps, ServerCapabilities::full());
    }

    #[test]
    fn test_functional_level_gates_start_controls_independently() {
        // New VRM but an intermediate server that never advanced its level
        let caps = ServerCapabilities::negotiate(Vrm::new(7, 1, 0), 10);
        assert!(caps.suspend_resume);
        assert!(!caps.start_controls);
    }
}
