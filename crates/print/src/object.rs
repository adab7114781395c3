//! Decoded print objects.

use hostlink_core::Codepoint;

/// One print-system object discovered by a list build.
///
/// Carries the identity and attribute codepoints exactly as the host sent
/// them; attribute interpretation is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintObject {
    identity: Codepoint,
    attributes: Codepoint,
}

impl PrintObject {
    /// Build an object from its identity and attribute codepoints.
    pub fn new(identity: Codepoint, attributes: Codepoint) -> Self {
        Self {
            identity,
            attributes,
        }
    }

    /// The identity codepoint.
    pub fn identity(&self) -> &Codepoint {
        &self.identity
    }

    /// The attribute codepoint.
    pub fn attributes(&self) -> &Codepoint {
        &self.attributes
    }

    /// The identity decoded as text.
    pub fn identity_text(&self) -> String {
        self.identity.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_text() {
        let obj = PrintObject::new(
            Codepoint::new(0x0001, b"QPRINT/SPLF0001   ".to_vec()),
            Codepoint::new(0x0002, Vec::new()),
        );
        assert_eq!(obj.identity_text(), "QPRINT/SPLF0001");
    }
}
