//! The serde face of the bridge: drivers that plug contract-driven
//! member population and guarded polymorphism into any serde host format.
//!
//! ## Menu
//!
//! - [`ContractSerializer`]: serializes a type-erased value against its
//!   declared type, writing the `"$type"` discriminator exactly when the
//!   runtime type differs from the declared one.
//! - [`ContractDeserializer`]: a [`DeserializeSeed`] for the declared type,
//!   honoring a leading discriminator, validating it against the declared
//!   subtype set, and dispatching to the concrete subtype's body reader.
//! - [`TypeResolution`]: the per-type decision — host-native (basic),
//!   native list, or contract-driven object.
//!
//! See code examples in [`ContractSerializer`] and [`ContractDeserializer`].
//!
//! [`DeserializeSeed`]: serde_core::de::DeserializeSeed

mod context;
pub(crate) mod de;
mod resolver;
pub(crate) mod ser;

pub use de::ContractDeserializer;
pub use resolver::TypeResolution;
pub use ser::ContractSerializer;

pub(crate) use context::{TypeContextGuard, make_custom_error, make_custom_ser_error};
