//! The write half of the polymorphic converter.

use fastvec::FastVec;
use serde_core::ser::SerializeMap;
use serde_core::{Serialize, Serializer};

use crate::contract::{ContractRegistry, ResolvedContract};
use crate::contracted::{Contract, ContractType, Contracted, MemberValue};
use crate::error::ContractError;
use crate::serde::resolver::TypeResolution;
use crate::serde::{TypeContextGuard, make_custom_ser_error};

// -----------------------------------------------------------------------------
// ContractSerializer

/// Serializes a type-erased value against its **declared** type.
///
/// # Write protocol
///
/// 1. The value's runtime type must be declared serializable.
/// 2. When the runtime type equals the declared type, the object body is
///    written plainly: members in contract order, unreadable members
///    skipped, no discriminator.
/// 3. When it differs, the runtime type must be inside the declared type's
///    subtype set, and the subtype's cached dispatch entry writes the body
///    **including** the leading `"$type"` discriminator.
///
/// # Examples
///
/// ```
/// use polytag::{derive::Contract, ContractRegistry, ContractSerializer};
///
/// #[derive(Contract, Default)]
/// #[contract(default)]
/// struct Circle {
///     radius: f64,
/// }
///
/// let mut registry = ContractRegistry::new();
/// registry.register::<Circle>();
///
/// let circle = Circle { radius: 2.5 };
/// let json = serde_json::to_string(&ContractSerializer::new(&circle, &registry)).unwrap();
///
/// // Declared and runtime type coincide: no discriminator.
/// assert_eq!(json, r#"{"radius":2.5}"#);
/// ```
pub struct ContractSerializer<'a> {
    value: &'a dyn Contracted,
    declared: ContractType,
    registry: &'a ContractRegistry,
}

impl<'a> ContractSerializer<'a> {
    /// Creates a serializer whose declared type is `B` itself.
    #[inline]
    pub fn new<B: Contract>(value: &'a B, registry: &'a ContractRegistry) -> Self {
        Self {
            value,
            declared: B::contract_type(),
            registry,
        }
    }

    /// Creates a serializer for a type-erased value with an explicit
    /// declared type.
    #[inline]
    pub fn of(
        value: &'a dyn Contracted,
        declared: ContractType,
        registry: &'a ContractRegistry,
    ) -> Self {
        Self {
            value,
            declared,
            registry,
        }
    }
}

impl Serialize for ContractSerializer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let actual = self.value.ty();
        let _guard = TypeContextGuard::enter(actual.path());

        if !self.registry.can_serialize(actual.id()) {
            return Err(make_custom_ser_error(ContractError::NotSerializable {
                path: actual.path().to_owned(),
            }));
        }

        if actual.id() != self.declared.id() {
            let declared = self
                .registry
                .resolved_contract(self.declared.id())
                .map_err(make_custom_ser_error)?;
            if !declared.subtypes().contains(&actual.id()) {
                return Err(make_custom_ser_error(ContractError::NotDeclaredSubtype {
                    tag: actual.path().to_owned(),
                    declared: self.declared.path(),
                }));
            }

            match self.registry.resolve(actual.id()).map_err(make_custom_ser_error)? {
                TypeResolution::Object(_) => {
                    let entry = self
                        .registry
                        .dispatch_entry(actual.id())
                        .map_err(make_custom_ser_error)?;
                    entry.write_remainder(self.value, serializer, self.registry)
                }
                // List-shaped subtypes stay with the host format; there is
                // no object to carry a discriminator in.
                TypeResolution::Basic | TypeResolution::AsList => {
                    serialize_native(self.value, actual, self.registry, serializer)
                }
            }
        } else {
            match self.registry.resolve(actual.id()).map_err(make_custom_ser_error)? {
                TypeResolution::Object(resolved) => {
                    write_object(serializer, self.value, &resolved, None)
                }
                TypeResolution::Basic | TypeResolution::AsList => {
                    serialize_native(self.value, actual, self.registry, serializer)
                }
            }
        }
    }
}

/// Serializes a host-format-native value through its passthrough codec.
fn serialize_native<S: Serializer>(
    value: &dyn Contracted,
    actual: ContractType,
    registry: &ContractRegistry,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let codec = registry
        .get(actual.id())
        .and_then(|contract| contract.passthrough())
        .ok_or_else(|| {
            make_custom_ser_error(ContractError::NotContractShaped {
                path: actual.path(),
            })
        })?;
    codec.erased(value).serialize(serializer)
}

/// Writes one object body: the optional discriminator entry first, then
/// every readable member in contract order.
pub(crate) fn write_object<S: Serializer>(
    serializer: S,
    value: &dyn Contracted,
    contract: &ResolvedContract,
    discriminator: Option<(&'static str, &str)>,
) -> Result<S::Ok, S::Error> {
    let entries = contract
        .members()
        .iter()
        .filter_map(|member| {
            member
                .accessor()
                .get(value)
                .map(|view| (member.wire_name(), view))
        })
        .collect::<FastVec<(&str, MemberValue<'_>), 8>>();

    let mut map =
        serializer.serialize_map(Some(entries.len() + usize::from(discriminator.is_some())))?;
    if let Some((key, tag)) = discriminator {
        map.serialize_entry(key, tag)?;
    }
    for (name, view) in entries.as_slice() {
        map.serialize_entry(name, view)?;
    }
    map.end()
}
