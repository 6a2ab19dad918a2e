//! Strategy-selected member access.

use serde_core::Deserialize;

use crate::config::AccessStrategy;
use crate::contract::member::{GetFn, RawMember, SetFn};
use crate::contracted::{Contracted, MemberValue};

// -----------------------------------------------------------------------------
// MemberAccessor

/// The getter/setter pair for one member, behind the strategy chosen by
/// [`BridgeConfig::access_strategy`](crate::BridgeConfig).
///
/// Both strategies are functionally identical:
///
/// - [`Compiled`](Self::Compiled) holds the member table's function
///   pointers, resolved once when the contract is resolved.
/// - [`Dynamic`](Self::Dynamic) goes through
///   [`Contracted::member_ref`]/[`Contracted::member_write`] on every call,
///   paying a name lookup each time.
///
/// A member declared by an ancestor but not physically present on the
/// concrete type resolves to "not readable" and "not settable" under either
/// strategy: skipped on write, parsed and discarded on read.
#[derive(Debug)]
pub enum MemberAccessor {
    /// Cached function pointers.
    Compiled {
        /// The getter; `None` marks the member not readable.
        get: Option<GetFn>,
        /// The setter; `None` marks the member not settable.
        set: Option<SetFn>,
    },
    /// Per-call dispatch through the object-safe member methods, keyed by
    /// the declared member name.
    Dynamic {
        /// The declared member name.
        name: &'static str,
        /// Whether the declaring contract allows reads.
        readable: bool,
        /// Whether the declaring contract allows writes.
        settable: bool,
    },
}

impl MemberAccessor {
    /// Resolves the accessor for `member` under the given strategy.
    ///
    /// `physical` is `false` for members merged in from an ancestor
    /// declaration that the concrete type does not re-declare; such members
    /// have no storage to access.
    pub fn resolve(member: &RawMember, strategy: AccessStrategy, physical: bool) -> Self {
        match strategy {
            AccessStrategy::Compiled => Self::Compiled {
                get: if physical { member.getter() } else { None },
                set: if physical { member.setter() } else { None },
            },
            AccessStrategy::Dynamic => Self::Dynamic {
                name: member.name(),
                readable: physical && member.getter().is_some(),
                settable: physical && member.setter().is_some(),
            },
        }
    }

    /// Returns `true` if writing should attempt to read this member.
    #[inline]
    pub fn is_readable(&self) -> bool {
        match self {
            Self::Compiled { get, .. } => get.is_some(),
            Self::Dynamic { readable, .. } => *readable,
        }
    }

    /// Returns `true` if reading should attempt to assign this member.
    #[inline]
    pub fn is_settable(&self) -> bool {
        match self {
            Self::Compiled { set, .. } => set.is_some(),
            Self::Dynamic { settable, .. } => *settable,
        }
    }

    /// Borrows the member's value out of `container`.
    ///
    /// Returns `None` for members that are not readable.
    pub fn get<'a>(&self, container: &'a dyn Contracted) -> Option<MemberValue<'a>> {
        match self {
            Self::Compiled { get, .. } => get.and_then(|f| f(container)),
            Self::Dynamic { name, readable, .. } => {
                if *readable {
                    container.member_ref(name)
                } else {
                    None
                }
            }
        }
    }

    /// Deserializes into the member of `container`.
    ///
    /// Consumes the pending value even when the member turns out not to be
    /// assignable on this instance, so the surrounding map stream stays
    /// consistent.
    pub fn set(
        &self,
        container: &mut dyn Contracted,
        deserializer: &mut dyn erased_serde::Deserializer,
    ) -> Result<(), erased_serde::Error> {
        match self {
            Self::Compiled { set, .. } => match set {
                Some(f) => f(container, deserializer),
                None => discard(deserializer),
            },
            Self::Dynamic { name, settable, .. } => {
                if *settable && container.member_write(name, deserializer)? {
                    Ok(())
                } else {
                    discard(deserializer)
                }
            }
        }
    }
}

/// Parses and discards the pending value.
fn discard(deserializer: &mut dyn erased_serde::Deserializer) -> Result<(), erased_serde::Error> {
    serde_core::de::IgnoredAny::deserialize(deserializer).map(|_| ())
}
