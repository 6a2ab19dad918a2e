//! The core traits connecting concrete types to their contracts.

use core::any::{Any, TypeId};
use core::fmt;

use serde_core::{Serialize, Serializer};

use crate::contract::{ContractRegistry, TypeContract};

// -----------------------------------------------------------------------------
// ContractType

/// The identity of a contracted type: its [`TypeId`], full path, and
/// unqualified name.
///
/// # Examples
///
/// ```
/// use polytag::{derive::Contract, Contract as _};
///
/// #[derive(Contract)]
/// struct Circle {
///     radius: f64,
/// }
///
/// let ty = Circle::contract_type();
/// assert!(ty.path().ends_with("::Circle"));
/// assert_eq!(ty.name(), "Circle");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ContractType {
    id: TypeId,
    path: &'static str,
    name: &'static str,
}

impl ContractType {
    /// Creates the identity of `T` from an explicit path and name.
    ///
    /// The derive supplies both from the defining module; manual contracts
    /// may prefer [`ContractType::introspected`].
    #[inline]
    pub fn of<T: ?Sized + 'static>(path: &'static str, name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            path,
            name,
        }
    }

    /// Creates the identity of `T` from the compiler-reported type name.
    ///
    /// Compiler type names are not guaranteed stable across releases, so
    /// contracts meant to live in persisted payloads should prefer the
    /// derive, which bakes the declaring module path in.
    #[inline]
    pub fn introspected<T: ?Sized + 'static>() -> Self {
        let path = core::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            path,
            name: crate::util::short_type_name(path),
        }
    }

    /// Returns the [`TypeId`].
    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type path.
    #[inline]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// Returns the unqualified type name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check if the given type matches this identity.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ContractType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContractType {}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

// -----------------------------------------------------------------------------
// MemberValue

/// A type-erased, serializable view of one member's value.
///
/// Plain members borrow straight out of the container; members with a
/// custom codec wrap the borrow in a boxed proxy that applies the codec.
pub enum MemberValue<'a> {
    /// A direct borrow of the member.
    Borrowed(&'a dyn erased_serde::Serialize),
    /// A proxy holding the borrow, used by custom member codecs.
    Boxed(Box<dyn erased_serde::Serialize + 'a>),
}

impl Serialize for MemberValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Borrowed(value) => value.serialize(serializer),
            Self::Boxed(value) => (**value).serialize(serializer),
        }
    }
}

// -----------------------------------------------------------------------------
// Contracted

/// The object-safe trait implemented by every contracted type.
///
/// This is the dynamic half of the bridge: it carries the runtime type
/// identity and the per-call ("dynamic strategy") member access methods.
/// Implementations are generated by [`#[derive(Contract)]`](crate::derive::Contract);
/// the derive keeps the member methods consistent with the contract's
/// member table.
pub trait Contracted: Any + Send + Sync {
    /// Returns the runtime type identity.
    fn ty(&self) -> ContractType;

    /// Borrows the member with the given **declared** name.
    ///
    /// Returns `None` when no such member physically exists on this type or
    /// the member is write-only.
    fn member_ref(&self, name: &str) -> Option<MemberValue<'_>>;

    /// Deserializes into the member with the given **declared** name.
    ///
    /// Returns `Ok(true)` when the member was assigned (consuming the
    /// deserializer), and `Ok(false)` when no such member physically exists
    /// on this type — in which case the deserializer was **not** consumed
    /// and the caller must discard the pending value itself.
    fn member_write(
        &mut self,
        name: &str,
        deserializer: &mut dyn erased_serde::Deserializer,
    ) -> Result<bool, erased_serde::Error>;

    /// Upcasts to [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to [`Any`], mutably.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcasts a box to [`Any`].
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Contracted {
    /// Returns `true` if the underlying value is of type `T`.
    #[inline]
    pub fn is<T: Contracted>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcasts to a shared reference of the concrete type.
    #[inline]
    pub fn downcast_ref<T: Contracted>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcasts to a mutable reference of the concrete type.
    #[inline]
    pub fn downcast_mut<T: Contracted>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Takes the concrete value out of the box.
    ///
    /// Returns the box unchanged when the value is not a `T`.
    pub fn take<T: Contracted>(self: Box<Self>) -> Result<T, Box<dyn Contracted>> {
        if self.as_any().is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(concrete) => Ok(*concrete),
                Err(_) => unreachable!("downcast verified above"),
            }
        } else {
            Err(self)
        }
    }
}

impl fmt::Debug for dyn Contracted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Contracted<{}>", self.ty())
    }
}

// -----------------------------------------------------------------------------
// Contract

/// The static half of [`Contracted`]: type identity without an instance.
pub trait Contract: Contracted {
    /// Returns the type identity.
    fn contract_type() -> ContractType;
}

// -----------------------------------------------------------------------------
// GetContract

/// A trait which allows a type to produce its [`TypeContract`] for
/// registration into a [`ContractRegistry`].
///
/// Automatically implemented by
/// [`#[derive(Contract)]`](crate::derive::Contract).
///
/// # Implementation
///
/// ```
/// use polytag::{derive::Contract, ContractRegistry, GetContract};
///
/// #[derive(Contract)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// let contract = Point::contract();
/// assert_eq!(contract.members().len(), 2);
///
/// let mut registry = ContractRegistry::new();
/// registry.register::<Point>();
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `GetContract` so cannot be registered",
    note = "consider annotating `{Self}` with `#[derive(Contract)]`"
)]
pub trait GetContract: Contract {
    /// Returns the declared [`TypeContract`] for this type.
    fn contract() -> TypeContract;

    /// Registers other contracts this one depends on (its declared parent).
    /// **Allow** not to register oneself.
    fn register_dependencies(_registry: &mut ContractRegistry) {}
}
