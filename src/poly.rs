//! [`Poly<B>`]: a typed handle carrying "a value whose declared type is `B`
//! but whose runtime type may be any admissible subtype of `B`".

use core::fmt;
use core::marker::PhantomData;

use serde_core::de::DeserializeSeed;
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};

use crate::contract::global;
use crate::contracted::{Contract, Contracted};
use crate::serde::{ContractDeserializer, ContractSerializer};

// -----------------------------------------------------------------------------
// Poly

/// A polymorphic value declared as `B`.
///
/// This is the bridge's hook into the host format: `Poly<B>` implements
/// `Serialize`/`Deserialize` through the process-global registry, so it can
/// sit inside any serde-handled object graph. Writing emits the `"$type"`
/// discriminator exactly when the runtime type differs from `B`; reading
/// validates an incoming discriminator against `B`'s declared subtype set.
///
/// # Examples
///
/// ```
/// use polytag::{derive::Contract, Poly};
///
/// #[derive(Contract, Debug, Default, PartialEq)]
/// #[contract(default)]
/// pub struct Shape;
///
/// #[derive(Contract, Debug, Default, PartialEq)]
/// #[contract(extends = Shape, default)]
/// pub struct Circle {
///     pub radius: f64,
/// }
///
/// let shape: Poly<Shape> = Poly::new(Circle { radius: 2.5 });
/// let json = serde_json::to_string(&shape).unwrap();
///
/// let back: Poly<Shape> = serde_json::from_str(&json).unwrap();
/// assert_eq!(back.downcast_ref::<Circle>(), Some(&Circle { radius: 2.5 }));
/// ```
pub struct Poly<B: Contract> {
    value: Box<dyn Contracted>,
    declared: PhantomData<fn() -> B>,
}

impl<B: Contract> Poly<B> {
    /// Wraps a concrete value.
    ///
    /// Nothing is validated here; whether `T` is an admissible subtype of
    /// `B` is enforced on the wire, where the declared contract is
    /// authoritative.
    #[inline]
    pub fn new<T: Contracted>(value: T) -> Self {
        Self {
            value: Box::new(value),
            declared: PhantomData,
        }
    }

    /// Wraps an already-boxed value.
    #[inline]
    pub fn from_boxed(value: Box<dyn Contracted>) -> Self {
        Self {
            value,
            declared: PhantomData,
        }
    }

    /// Borrows the type-erased value.
    #[inline]
    pub fn get(&self) -> &dyn Contracted {
        self.value.as_ref()
    }

    /// Mutably borrows the type-erased value.
    #[inline]
    pub fn get_mut(&mut self) -> &mut dyn Contracted {
        self.value.as_mut()
    }

    /// Returns `true` if the runtime type is `T`.
    #[inline]
    pub fn is<T: Contracted>(&self) -> bool {
        self.value.as_ref().is::<T>()
    }

    /// Downcasts to the concrete runtime type.
    #[inline]
    pub fn downcast_ref<T: Contracted>(&self) -> Option<&T> {
        self.value.as_ref().downcast_ref::<T>()
    }

    /// Mutably downcasts to the concrete runtime type.
    #[inline]
    pub fn downcast_mut<T: Contracted>(&mut self) -> Option<&mut T> {
        self.value.as_mut().downcast_mut::<T>()
    }

    /// Takes the concrete value out of the handle.
    ///
    /// Returns the handle unchanged when the runtime type is not `T`.
    #[inline]
    pub fn take<T: Contracted>(self) -> Result<T, Self> {
        self.value.take::<T>().map_err(Self::from_boxed)
    }

    /// Unwraps into the type-erased box.
    #[inline]
    pub fn into_inner(self) -> Box<dyn Contracted> {
        self.value
    }
}

impl<B: Contract, T: Contracted> From<Box<T>> for Poly<B> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::from_boxed(value)
    }
}

impl<B: Contract> fmt::Debug for Poly<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Poly<{}>({})",
            B::contract_type().path(),
            self.value.ty().path(),
        )
    }
}

impl<B: Contract> Serialize for Poly<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ContractSerializer::of(self.value.as_ref(), B::contract_type(), global())
            .serialize(serializer)
    }
}

impl<'de, B: Contract> Deserialize<'de> for Poly<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ContractDeserializer::new::<B>(global())
            .deserialize(deserializer)
            .map(Self::from_boxed)
    }
}
