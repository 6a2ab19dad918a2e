//! The read half of the polymorphic converter.

use std::sync::Arc;

use serde_core::Deserializer;
use serde_core::de::{DeserializeSeed, IgnoredAny, MapAccess, Visitor};

use crate::contract::{ContractRegistry, MemberAccessor, ResolvedContract};
use crate::contracted::{Contract, ContractType, Contracted};
use crate::error::ContractError;
use crate::serde::resolver::TypeResolution;
use crate::serde::{TypeContextGuard, make_custom_error};

// -----------------------------------------------------------------------------
// ContractDeserializer

/// A [`DeserializeSeed`] that reads an object against a **declared** type,
/// yielding a boxed value whose runtime type may be any admissible subtype.
///
/// # Read protocol
///
/// The input must be an object (map); anything else is rejected by the host
/// format as an unexpected token.
///
/// 1. If the first property is the reserved discriminator, its string value
///    is resolved to a registered type, which must be declared serializable
///    **and** a member of the declared type's subtype set. The rest of the
///    body is then consumed by that subtype's cached dispatch entry.
/// 2. Otherwise the body is read against the declared type itself: known
///    settable members are assigned onto a factory-constructed instance as
///    they arrive; unknown or unsettable properties are parsed and
///    discarded.
///
/// # Examples
///
/// ```
/// use serde_core::de::DeserializeSeed;
/// use polytag::{derive::Contract, ContractDeserializer, ContractRegistry};
///
/// #[derive(Contract, Default, PartialEq, Debug)]
/// #[contract(default)]
/// struct Circle {
///     radius: f64,
/// }
///
/// let mut registry = ContractRegistry::new();
/// registry.register::<Circle>();
///
/// let mut input = serde_json::Deserializer::from_str(r#"{"radius":2.5}"#);
/// let seed = ContractDeserializer::new::<Circle>(&registry);
/// let value = seed.deserialize(&mut input).unwrap();
///
/// assert_eq!(value.take::<Circle>().unwrap(), Circle { radius: 2.5 });
/// ```
pub struct ContractDeserializer<'a> {
    declared: ContractType,
    registry: &'a ContractRegistry,
}

impl<'a> ContractDeserializer<'a> {
    /// Creates a seed whose declared type is `B`.
    #[inline]
    pub fn new<B: Contract>(registry: &'a ContractRegistry) -> Self {
        Self {
            declared: B::contract_type(),
            registry,
        }
    }

    /// Creates a seed with an explicit declared type.
    #[inline]
    pub fn of(declared: ContractType, registry: &'a ContractRegistry) -> Self {
        Self { declared, registry }
    }
}

impl<'de> DeserializeSeed<'de> for ContractDeserializer<'_> {
    type Value = Box<dyn Contracted>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        let _guard = TypeContextGuard::enter(self.declared.path());

        if self.registry.get(self.declared.id()).is_none() {
            return Err(make_custom_error(ContractError::NotSerializable {
                path: self.declared.path().to_owned(),
            }));
        }

        match self
            .registry
            .resolve(self.declared.id())
            .map_err(make_custom_error)?
        {
            TypeResolution::Object(resolved) => deserializer.deserialize_map(ObjectVisitor {
                declared: self.declared,
                resolved,
                registry: self.registry,
            }),
            // Declared types the host format owns outright deserialize
            // through their own codec.
            TypeResolution::Basic | TypeResolution::AsList => {
                let codec = self
                    .registry
                    .get(self.declared.id())
                    .and_then(|contract| contract.passthrough())
                    .ok_or_else(|| {
                        make_custom_error(ContractError::NotContractShaped {
                            path: self.declared.path(),
                        })
                    })?;
                let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
                codec
                    .deserialize(&mut erased)
                    .map_err(serde_core::de::Error::custom)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Object visitor

struct ObjectVisitor<'a> {
    declared: ContractType,
    resolved: Arc<ResolvedContract>,
    registry: &'a ContractRegistry,
}

impl<'de> Visitor<'de> for ObjectVisitor<'_> {
    type Value = Box<dyn Contracted>;

    fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(formatter, "a contract object for `{}`", self.declared.path())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let discriminator = self.registry.config().discriminator;

        let first = map.next_key::<String>()?;
        if let Some(key) = first.as_deref()
            && key == discriminator
        {
            let tag: String = map.next_value()?;

            let actual = self
                .registry
                .contract_for_tag(&tag)
                .map_err(make_custom_error)?
                .ty();
            if !self.registry.can_serialize(actual.id()) {
                return Err(make_custom_error(ContractError::NotSerializable {
                    path: actual.path().to_owned(),
                }));
            }
            // The anti-injection check: naming a real type is not enough,
            // it must be declared as a subtype of the declared type.
            if !self.resolved.subtypes().contains(&actual.id()) {
                return Err(make_custom_error(ContractError::NotDeclaredSubtype {
                    tag,
                    declared: self.declared.path(),
                }));
            }

            let entry = self
                .registry
                .dispatch_entry(actual.id())
                .map_err(make_custom_error)?;
            let _guard = TypeContextGuard::enter(actual.path());
            return entry.read_remainder(&mut map);
        }

        read_body(&mut map, &self.resolved, first)
    }
}

// -----------------------------------------------------------------------------
// Body reader

/// Reads an object body against a resolved contract, starting from an
/// optional already-consumed first property name.
///
/// The instance is constructed up front through the contract's factory and
/// members are assigned as they arrive.
pub(crate) fn read_body<'de, A: MapAccess<'de>>(
    map: &mut A,
    contract: &ResolvedContract,
    pending: Option<String>,
) -> Result<Box<dyn Contracted>, A::Error> {
    let mut instance = contract.instantiate().map_err(make_custom_error)?;
    let mut present = vec![false; contract.members().len()];

    if let Some(key) = pending {
        read_member(map, contract, instance.as_mut(), &key, &mut present)?;
    }
    while let Some(key) = map.next_key::<String>()? {
        read_member(map, contract, instance.as_mut(), &key, &mut present)?;
    }

    for (index, member) in contract.members().iter().enumerate() {
        if member.required() && !present[index] {
            return Err(make_custom_error(format_args!(
                "missing required member `{}` of `{}`",
                member.wire_name(),
                contract.ty().path(),
            )));
        }
    }
    Ok(instance)
}

fn read_member<'de, A: MapAccess<'de>>(
    map: &mut A,
    contract: &ResolvedContract,
    instance: &mut dyn Contracted,
    key: &str,
    present: &mut [bool],
) -> Result<(), A::Error> {
    let Some(index) = contract.member_index_for(key) else {
        // Unknown properties are parsed and discarded: the payload stays
        // forward compatible.
        map.next_value::<IgnoredAny>()?;
        return Ok(());
    };
    present[index] = true;

    let member = &contract.members()[index];
    if member.accessor().is_settable() {
        map.next_value_seed(MemberSeed {
            accessor: member.accessor(),
            instance,
        })
    } else {
        // Known but unsettable: the value is parsed and discarded.
        map.next_value::<IgnoredAny>()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Member seed

struct MemberSeed<'a> {
    accessor: &'a MemberAccessor,
    instance: &'a mut dyn Contracted,
}

impl<'de> DeserializeSeed<'de> for MemberSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
        self.accessor
            .set(self.instance, &mut erased)
            .map_err(serde_core::de::Error::custom)
    }
}
