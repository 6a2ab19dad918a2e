//! The type contract model: member descriptors, accessors, the registry,
//! and resolved (wire-ready) contracts.
//!
//! ## Menu
//!
//! - [`RawMember`]: one declared data member (name, declared type, ordinal,
//!   accessor pair).
//! - [`MemberAccessor`]: strategy-selected getter/setter for one member.
//! - [`TypeContract`]: a type's declared contract as registered.
//! - [`ContractRegistry`]: the store for contracts, identity indexes, and
//!   subtype edges; also owns the resolution caches.
//! - [`ResolvedContract`]: the cached, wire-ready view of one type —
//!   merged members, subtype set, factory, polymorphism descriptor.

mod access;
mod member;
mod registry;
mod resolved;

pub use access::MemberAccessor;
pub use member::{Factory, GetFn, PassthroughCodec, RawMember, SetFn};
pub use registry::{ContractRegistry, ContractShape, ListHandling, TypeContract};
pub use resolved::{PolyDescriptor, PolyVariant, ResolvedContract, ResolvedMember};

#[cfg(feature = "auto_register")]
pub use registry::AutoRegistration;

pub use registry::{global, install};
