//! The error surface of the contract bridge.

use core::fmt;

/// An error raised by the contract bridge.
///
/// Contract violations (`NotSerializable`, `NotDeclaredSubtype`,
/// `UnknownTypeTag`, `NotConstructible`, ...) are recoverable by the caller
/// and surface through the host format's error type at the serde boundary.
/// Configuration errors (`EmptyWireName`, `DuplicateWireName`,
/// `MissingParent`, `AlreadyInstalled`) indicate a mis-declared contract or
/// host setup and are raised eagerly, at resolve or install time.
///
/// Malformed token sequences are reported by the host format itself through
/// serde's visitor machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The type has no contract registration, or its contract forbids
    /// serialization.
    NotSerializable {
        /// Full path of the offending type.
        path: String,
    },
    /// A discriminator named a real type outside the declared type's
    /// subtype set.
    NotDeclaredSubtype {
        /// The tag carried by the payload.
        tag: String,
        /// Full path of the declared (base) type.
        declared: &'static str,
    },
    /// A discriminator named a type the registry has never heard of.
    UnknownTypeTag {
        /// The tag carried by the payload.
        tag: String,
    },
    /// A short-form discriminator matched more than one registered type.
    AmbiguousTypeTag {
        /// The tag carried by the payload.
        tag: String,
    },
    /// The target type declares no object factory.
    NotConstructible {
        /// Full path of the offending type.
        path: &'static str,
    },
    /// The naming policy produced an empty wire name for a member.
    EmptyWireName {
        /// Full path of the owning type.
        ty: &'static str,
        /// Declared name of the member.
        member: &'static str,
    },
    /// Two members of one type mapped to the same wire name.
    DuplicateWireName {
        /// Full path of the owning type.
        ty: &'static str,
        /// The colliding wire name.
        wire: String,
    },
    /// A contract declares a parent that is not registered.
    MissingParent {
        /// Full path of the child type.
        ty: &'static str,
        /// Full path of the missing parent type.
        parent: &'static str,
    },
    /// The global host was installed twice, or after first use.
    AlreadyInstalled,
    /// A basic or list-shaped type reached the contract converter.
    NotContractShaped {
        /// Full path of the offending type.
        path: &'static str,
    },
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSerializable { path } => {
                write!(f, "type `{path}` must be declared serializable")
            }
            Self::NotDeclaredSubtype { tag, declared } => {
                write!(
                    f,
                    "type tag `{tag}` is not a declared subtype of `{declared}`"
                )
            }
            Self::UnknownTypeTag { tag } => {
                write!(f, "unknown type tag `{tag}`")
            }
            Self::AmbiguousTypeTag { tag } => {
                write!(f, "type tag `{tag}` matches more than one registered type")
            }
            Self::NotConstructible { path } => {
                write!(f, "type `{path}` has no object factory; cannot deserialize")
            }
            Self::EmptyWireName { ty, member } => {
                write!(
                    f,
                    "naming policy produced an empty wire name for member `{member}` of `{ty}`"
                )
            }
            Self::DuplicateWireName { ty, wire } => {
                write!(f, "members of `{ty}` collide on wire name `{wire}`")
            }
            Self::MissingParent { ty, parent } => {
                write!(f, "type `{ty}` declares unregistered parent `{parent}`")
            }
            Self::AlreadyInstalled => {
                write!(f, "the global contract host is already installed")
            }
            Self::NotContractShaped { path } => {
                write!(
                    f,
                    "type `{path}` is handled natively by the host format, not by the contract converter"
                )
            }
        }
    }
}

impl core::error::Error for ContractError {}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ContractError;

    #[test]
    fn messages_name_the_offender() {
        let err = ContractError::NotDeclaredSubtype {
            tag: "evil::EvilType".into(),
            declared: "shapes::Shape",
        };
        let msg = err.to_string();
        assert!(msg.contains("evil::EvilType"));
        assert!(msg.contains("shapes::Shape"));
        assert!(msg.contains("not a declared subtype"));
    }
}
