//! Wire-ready contracts: the cached product of merging a type's member
//! chain, applying the naming policy, and collecting its subtype set.

use core::any::TypeId;

use crate::contract::access::MemberAccessor;
use crate::contract::member::Factory;
use crate::contract::registry::{ContractRegistry, TypeContract};
use crate::contracted::{Contracted, ContractType};
use crate::error::ContractError;
use crate::util::{HashMap, TypeIdSet};

// -----------------------------------------------------------------------------
// PolyDescriptor

/// One admissible concrete subtype of a polymorphic base.
#[derive(Debug, Clone)]
pub struct PolyVariant {
    /// The subtype's identity.
    pub ty: ContractType,
    /// The formatted discriminator tag.
    pub tag: String,
}

/// The polymorphism options of a declared type: the reserved discriminator
/// key and one tag per admissible concrete subtype.
///
/// Absent (`None` on [`ResolvedContract::poly`]) when the type has no
/// concrete subtypes; such types read and write as plain objects.
#[derive(Debug, Clone)]
pub struct PolyDescriptor {
    /// The reserved discriminator property name.
    pub discriminator: &'static str,
    /// The admissible concrete subtypes, sorted by tag for stable output.
    pub variants: Vec<PolyVariant>,
}

// -----------------------------------------------------------------------------
// ResolvedMember

/// One member of a [`ResolvedContract`]: the declared descriptor mapped
/// through the naming policy and bound to a strategy-selected accessor.
#[derive(Debug)]
pub struct ResolvedMember {
    wire_name: String,
    declared_name: &'static str,
    ty: TypeId,
    ty_path: &'static str,
    ordinal: u32,
    accessor: MemberAccessor,
    custom_codec: bool,
    required: bool,
}

impl ResolvedMember {
    /// Returns the wire name.
    #[inline]
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Returns the declared member name.
    #[inline]
    pub const fn declared_name(&self) -> &'static str {
        self.declared_name
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

    /// Returns the accessor.
    #[inline]
    pub const fn accessor(&self) -> &MemberAccessor {
        &self.accessor
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

// -----------------------------------------------------------------------------
// ResolvedContract

/// The cached, wire-ready view of one concrete type.
///
/// Computed once per type on first use and cached for the process lifetime;
/// never mutated after insertion (see
/// [`ContractRegistry::resolved_contract`]).
#[derive(Debug)]
pub struct ResolvedContract {
    ty: ContractType,
    members: Vec<ResolvedMember>,
    lookup: HashMap<String, usize>,
    fold_case: bool,
    subtypes: TypeIdSet,
    factory: Option<Factory>,
    poly: Option<PolyDescriptor>,
}

impl ResolvedContract {
    /// Builds the resolved view of `contract`.
    ///
    /// Fails on naming-policy configuration errors (empty or duplicate wire
    /// names). Pure apart from registry reads, so concurrent duplicate
    /// builds are harmless.
    pub(crate) fn build(
        registry: &ContractRegistry,
        contract: &TypeContract,
    ) -> Result<Self, ContractError> {
        let config = registry.config();
        let ty = contract.ty();

        // Own members first, then ancestors', skipping declared names
        // already seen: the most-derived declaration wins. Only own members
        // have physical storage on this concrete type.
        let mut members: Vec<ResolvedMember> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::default();
        let mut seen_declared: Vec<&'static str> = Vec::new();

        let mut visited = TypeIdSet::default();
        let mut cursor = Some(contract);
        let mut own_level = true;
        while let Some(level) = cursor {
            if !visited.insert(level.type_id()) {
                break;
            }
            for raw in level.members() {
                if seen_declared.contains(&raw.name()) {
                    continue;
                }
                seen_declared.push(raw.name());

                let wire_name = match raw.explicit_name() {
                    Some(explicit) => explicit.to_owned(),
                    None => config.naming.apply(raw.name()).into_owned(),
                };
                if wire_name.is_empty() {
                    return Err(ContractError::EmptyWireName {
                        ty: ty.path(),
                        member: raw.name(),
                    });
                }

                let folded = if config.case_insensitive {
                    wire_name.to_lowercase()
                } else {
                    wire_name.clone()
                };
                if lookup.contains_key(&folded) {
                    return Err(ContractError::DuplicateWireName {
                        ty: ty.path(),
                        wire: wire_name,
                    });
                }
                lookup.insert(folded, members.len());

                members.push(ResolvedMember {
                    wire_name,
                    declared_name: raw.name(),
                    ty: raw.ty(),
                    ty_path: raw.ty_path(),
                    ordinal: raw.ordinal(),
                    accessor: MemberAccessor::resolve(raw, config.access_strategy, own_level),
                    custom_codec: raw.has_custom_codec(),
                    required: raw.required(),
                });
            }
            cursor = match level.parent() {
                Some(parent) => match registry.get(parent.id()) {
                    Some(parent_contract) => Some(parent_contract),
                    // A dangling parent declaration is a configuration
                    // defect; fail loudly instead of dropping its members.
                    None => {
                        return Err(ContractError::MissingParent {
                            ty: ty.path(),
                            parent: parent.path(),
                        });
                    }
                },
                None => None,
            };
            own_level = false;
        }

        let subtypes = registry.subtypes(ty.id());
        let poly = if subtypes.is_empty() {
            None
        } else {
            let mut variants: Vec<PolyVariant> = subtypes
                .iter()
                .filter_map(|id| registry.get(*id))
                .map(|sub| PolyVariant {
                    ty: sub.ty(),
                    tag: config.tag_format.format(sub.ty()),
                })
                .collect();
            variants.sort_by(|a, b| a.tag.cmp(&b.tag));
            Some(PolyDescriptor {
                discriminator: config.discriminator,
                variants,
            })
        };

        Ok(Self {
            ty,
            members,
            lookup,
            fold_case: config.case_insensitive,
            subtypes,
            factory: contract.factory(),
            poly,
        })
    }

    /// Returns the type identity.
    #[inline]
    pub const fn ty(&self) -> ContractType {
        self.ty
    }

    /// Returns the members in wire order.
    #[inline]
    pub fn members(&self) -> &[ResolvedMember] {
        &self.members
    }

    /// Looks a member index up by incoming property name, honoring the
    /// configured case sensitivity.
    pub fn member_index_for(&self, property: &str) -> Option<usize> {
        if self.fold_case {
            self.lookup.get(property.to_lowercase().as_str()).copied()
        } else {
            self.lookup.get(property).copied()
        }
    }

    /// Looks a member up by incoming property name, honoring the configured
    /// case sensitivity.
    pub fn member_for(&self, property: &str) -> Option<&ResolvedMember> {
        self.member_index_for(property)
            .and_then(|index| self.members.get(index))
    }

    /// Returns the transitive concrete subtype set.
    #[inline]
    pub const fn subtypes(&self) -> &TypeIdSet {
        &self.subtypes
    }

    /// Returns the polymorphism descriptor, if the type has any concrete
    /// subtypes.
    #[inline]
    pub const fn poly(&self) -> Option<&PolyDescriptor> {
        self.poly.as_ref()
    }

    /// Constructs a fresh instance through the declared object factory.
    pub fn instantiate(&self) -> Result<Box<dyn Contracted>, ContractError> {
        match self.factory {
            Some(factory) => Ok(factory()),
            None => Err(ContractError::NotConstructible {
                path: self.ty.path(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::config::BridgeConfig;
    use crate::contract::member::RawMember;
    use crate::contract::registry::TypeContract;
    use crate::contracted::{Contract, MemberValue};
    use crate::naming::NamingPolicy;

    #[derive(Default)]
    struct Sample {
        user_name: String,
        __: i32,
    }

    impl Contracted for Sample {
        fn ty(&self) -> ContractType {
            ContractType::introspected::<Self>()
        }
        fn member_ref(&self, name: &str) -> Option<MemberValue<'_>> {
            match name {
                "user_name" => Some(MemberValue::Borrowed(&self.user_name)),
                "__" => Some(MemberValue::Borrowed(&self.__)),
                _ => None,
            }
        }
        fn member_write(
            &mut self,
            name: &str,
            deserializer: &mut dyn erased_serde::Deserializer,
        ) -> Result<bool, erased_serde::Error> {
            match name {
                "user_name" => {
                    self.user_name = serde_core::Deserialize::deserialize(deserializer)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
        fn as_any(&self) -> &dyn core::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
        fn into_any(self: Box<Self>) -> Box<dyn core::any::Any> {
            self
        }
    }

    impl Contract for Sample {
        fn contract_type() -> ContractType {
            ContractType::introspected::<Self>()
        }
    }

    fn get_user_name(value: &dyn Contracted) -> Option<MemberValue<'_>> {
        value
            .downcast_ref::<Sample>()
            .map(|sample| MemberValue::Borrowed(&sample.user_name))
    }

    fn sample_contract(with_underscore_member: bool) -> TypeContract {
        let mut members =
            vec![RawMember::new::<String>("user_name", 1).with_getter(get_user_name)];
        if with_underscore_member {
            members.push(RawMember::new::<i32>("__", 2));
        }
        TypeContract::object(Sample::contract_type(), members)
            .with_factory(|| Box::new(Sample::default()))
    }

    #[test]
    fn camel_case_and_case_insensitive_lookup() {
        let mut registry = ContractRegistry::new();
        registry.try_insert_contract(sample_contract(false));

        let resolved = registry
            .resolved_contract(core::any::TypeId::of::<Sample>())
            .unwrap();
        assert_eq!(resolved.members()[0].wire_name(), "userName");
        assert!(resolved.member_for("USERNAME").is_some());
        assert!(resolved.member_for("username").is_some());
        assert!(resolved.member_for("nope").is_none());
    }

    #[test]
    fn empty_wire_name_is_a_hard_error() {
        let mut registry = ContractRegistry::new();
        registry.try_insert_contract(sample_contract(true));

        let err = registry
            .resolved_contract(core::any::TypeId::of::<Sample>())
            .unwrap_err();
        assert!(matches!(err, ContractError::EmptyWireName { member: "__", .. }));
    }

    #[test]
    fn colliding_wire_names_are_a_hard_error() {
        let mut registry = ContractRegistry::new();
        let contract = TypeContract::object(
            Sample::contract_type(),
            vec![
                RawMember::new::<String>("user_name", 1).with_getter(get_user_name),
                // The explicit rename collides with `user_name` after the
                // camelCase policy folds them together.
                RawMember::new::<String>("alias", 2).with_explicit_name("userName"),
            ],
        );
        registry.try_insert_contract(contract);

        let err = registry
            .resolved_contract(core::any::TypeId::of::<Sample>())
            .unwrap_err();
        assert!(matches!(err, ContractError::DuplicateWireName { .. }));
    }

    #[test]
    fn preserve_policy_keeps_declared_names() {
        let mut registry = ContractRegistry::with_config(
            BridgeConfig::new()
                .naming(NamingPolicy::Preserve)
                .case_insensitive(false),
        );
        registry.try_insert_contract(sample_contract(false));

        let resolved = registry
            .resolved_contract(core::any::TypeId::of::<Sample>())
            .unwrap();
        assert_eq!(resolved.members()[0].wire_name(), "user_name");
        assert!(resolved.member_for("USER_NAME").is_none());
    }

    #[test]
    fn concurrent_resolution_is_idempotent() {
        let mut registry = ContractRegistry::new();
        registry.try_insert_contract(sample_contract(false));
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .resolved_contract(core::any::TypeId::of::<Sample>())
                        .unwrap()
                })
            })
            .collect();

        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for window in resolved.windows(2) {
            assert!(Arc::ptr_eq(&window[0], &window[1]));
        }
    }
}
