//! Member descriptors: the declared shape of one data member.

use core::any::TypeId;
use core::fmt;

use crate::contracted::{Contracted, MemberValue};

// -----------------------------------------------------------------------------
// Accessor function types

/// A compiled getter: borrows one member out of a type-erased container.
///
/// Returns `None` when the member is not readable on this instance.
/// Panics when handed a container of the wrong concrete type; accessors are
/// only ever paired with their own type's contract.
pub type GetFn = for<'a> fn(&'a dyn Contracted) -> Option<MemberValue<'a>>;

/// A compiled setter: deserializes one member into a type-erased container.
///
/// Always consumes the deserializer. Panics when handed a container of the
/// wrong concrete type.
pub type SetFn = fn(
    &mut dyn Contracted,
    &mut dyn erased_serde::Deserializer,
) -> Result<(), erased_serde::Error>;

/// A no-argument object factory.
pub type Factory = fn() -> Box<dyn Contracted>;

// -----------------------------------------------------------------------------
// PassthroughCodec

/// Erased serde entry points for contracted types the host format handles
/// natively (list-shaped contracts).
///
/// Stores function pointers specific to one concrete type; given a
/// type-erased value it downcasts and invokes the type's own `serde`
/// implementations.
#[derive(Clone, Copy)]
pub struct PassthroughCodec {
    ser: for<'a> fn(&'a dyn Contracted) -> &'a dyn erased_serde::Serialize,
    de: fn(&mut dyn erased_serde::Deserializer) -> Result<Box<dyn Contracted>, erased_serde::Error>,
}

impl PassthroughCodec {
    /// Builds the codec for `T` from its own `serde` implementations.
    pub fn of<T>() -> Self
    where
        T: Contracted + serde_core::Serialize + for<'de> serde_core::Deserialize<'de>,
    {
        Self {
            ser: |value| match value.downcast_ref::<T>() {
                Some(concrete) => concrete as &dyn erased_serde::Serialize,
                None => panic!(
                    "passthrough codec type mismatched: value is `{}`",
                    value.ty().path(),
                ),
            },
            de: |deserializer| Ok(Box::new(T::deserialize(deserializer)?)),
        }
    }

    /// Borrows the value as an erased `Serialize`.
    #[inline]
    pub fn erased<'a>(&self, value: &'a dyn Contracted) -> &'a dyn erased_serde::Serialize {
        (self.ser)(value)
    }

    /// Deserializes a boxed value through the type's own `Deserialize`.
    #[inline]
    pub fn deserialize(
        &self,
        deserializer: &mut dyn erased_serde::Deserializer,
    ) -> Result<Box<dyn Contracted>, erased_serde::Error> {
        (self.de)(deserializer)
    }
}

// -----------------------------------------------------------------------------
// RawMember

/// One declared data member of a contracted type.
///
/// Ordering of `RawMember`s in a contract is the declaration order; the
/// `ordinal` is the binary engine's numeric tag and plays no role in the
/// text format.
pub struct RawMember {
    name: &'static str,
    explicit_name: Option<&'static str>,
    ty: TypeId,
    ty_path: &'static str,
    ordinal: u32,
    get: Option<GetFn>,
    set: Option<SetFn>,
    custom_codec: bool,
    required: bool,
}

impl RawMember {
    /// Creates a descriptor for a member of declared type `F`.
    pub fn new<F: 'static>(name: &'static str, ordinal: u32) -> Self {
        Self {
            name,
            explicit_name: None,
            ty: TypeId::of::<F>(),
            ty_path: core::any::type_name::<F>(),
            ordinal,
            get: None,
            set: None,
            custom_codec: false,
            required: false,
        }
    }

    /// Attaches the getter.
    #[inline]
    pub fn with_getter(mut self, get: GetFn) -> Self {
        self.get = Some(get);
        self
    }

    /// Attaches the setter.
    #[inline]
    pub fn with_setter(mut self, set: SetFn) -> Self {
        self.set = Some(set);
        self
    }

    /// Overrides the wire name, bypassing the naming policy.
    #[inline]
    pub fn with_explicit_name(mut self, name: &'static str) -> Self {
        self.explicit_name = Some(name);
        self
    }

    /// Marks the member as carrying a custom codec inside its accessors.
    #[inline]
    pub fn with_custom_codec(mut self) -> Self {
        self.custom_codec = true;
        self
    }

    /// Marks the member required: an incoming object that omits it is
    /// rejected.
    #[inline]
    pub fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the declared member name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the explicit wire-name override, if any.
    #[inline]
    pub const fn explicit_name(&self) -> Option<&'static str> {
        self.explicit_name
    }

    /// Returns the declared member type.
    #[inline]
    pub const fn ty(&self) -> TypeId {
        self.ty
    }

    /// Returns the full path of the declared member type.
    #[inline]
    pub const fn ty_path(&self) -> &'static str {
        self.ty_path
    }

    /// Returns the binary engine's numeric tag.
    #[inline]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Returns the compiled getter, if the member is readable.
    #[inline]
    pub const fn getter(&self) -> Option<GetFn> {
        self.get
    }

    /// Returns the compiled setter, if the member is settable.
    #[inline]
    pub const fn setter(&self) -> Option<SetFn> {
        self.set
    }

    /// Returns `true` if the member's accessors carry a custom codec.
    #[inline]
    pub const fn has_custom_codec(&self) -> bool {
        self.custom_codec
    }

    /// Returns `true` if the member is required on read.
    #[inline]
    pub const fn required(&self) -> bool {
        self.required
    }
}

impl fmt::Debug for RawMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMember")
            .field("name", &self.name)
            .field("ty", &self.ty_path)
            .field("ordinal", &self.ordinal)
            .field("readable", &self.get.is_some())
            .field("settable", &self.set.is_some())
            .finish()
    }
}
