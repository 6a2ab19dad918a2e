//! The per-type resolution step: for every type the host format asks
//! about, decide whether the host's built-in handling applies or the
//! contract converter takes over.

use core::any::TypeId;
use std::sync::Arc;

use crate::contract::{ContractRegistry, ContractShape, ListHandling, ResolvedContract};
use crate::error::ContractError;

// -----------------------------------------------------------------------------
// TypeResolution

/// The outcome of resolving one type against the registry.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use polytag::{derive::Contract, ContractRegistry, TypeResolution};
///
/// #[derive(Contract, Default)]
/// #[contract(default)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// let mut registry = ContractRegistry::new();
/// registry.register::<Point>();
///
/// // Basic types stay with the host format.
/// assert!(matches!(
///     registry.resolve(TypeId::of::<f64>()).unwrap(),
///     TypeResolution::Basic,
/// ));
///
/// // Contract objects get member-driven handling.
/// assert!(matches!(
///     registry.resolve(TypeId::of::<Point>()).unwrap(),
///     TypeResolution::Object(_),
/// ));
///
/// // Unregistered types are rejected outright.
/// assert!(registry.resolve(TypeId::of::<Vec<u8>>()).is_err());
/// ```
pub enum TypeResolution {
    /// The host format's built-in logic owns this type; the contract
    /// converter must not intercept it.
    Basic,
    /// A collection-shaped type whose contract keeps list handling: the
    /// host format's native sequence logic applies.
    AsList,
    /// Contract-driven member population applies, using this resolved
    /// contract.
    Object(Arc<ResolvedContract>),
}

impl ContractRegistry {
    /// Resolves how the given type is handled.
    ///
    /// Collection-shaped contracts with overridden list handling are forced
    /// down the object path; everything else that is not basic must be
    /// declared serializable or the resolution fails.
    pub fn resolve(&self, type_id: TypeId) -> Result<TypeResolution, ContractError> {
        let Some(contract) = self.get(type_id) else {
            return Err(ContractError::NotSerializable {
                path: format!("{type_id:?}"),
            });
        };

        match contract.shape() {
            ContractShape::Basic => Ok(TypeResolution::Basic),
            ContractShape::Collection(ListHandling::AsList) => Ok(TypeResolution::AsList),
            ContractShape::Collection(ListHandling::AsObject) | ContractShape::Object => {
                if !self.can_serialize(type_id) {
                    return Err(ContractError::NotSerializable {
                        path: contract.ty().path().to_owned(),
                    });
                }
                Ok(TypeResolution::Object(self.resolved_contract(type_id)?))
            }
        }
    }

    /// Whether the contract converter applies to the given type at all.
    ///
    /// Basic types and natively-handled collections are the host format's
    /// business; the converter only accepts contract objects (including
    /// collection-shaped contracts that override list handling).
    pub fn accepts(&self, type_id: TypeId) -> bool {
        matches!(self.resolve(type_id), Ok(TypeResolution::Object(_)))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::TypeResolution;
    use crate::contract::ContractRegistry;

    #[test]
    fn primitives_and_strings_stay_basic() {
        let registry = ContractRegistry::new();
        for resolution in [
            registry.resolve(TypeId::of::<bool>()),
            registry.resolve(TypeId::of::<f64>()),
            registry.resolve(TypeId::of::<String>()),
        ] {
            assert!(matches!(resolution.unwrap(), TypeResolution::Basic));
        }
        assert!(!registry.accepts(TypeId::of::<String>()));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let registry = ContractRegistry::new();
        assert!(registry.resolve(TypeId::of::<Vec<u8>>()).is_err());
        assert!(!registry.accepts(TypeId::of::<Vec<u8>>()));
    }
}
