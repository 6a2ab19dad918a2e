//! The contract registry: the single source of truth for which types are
//! serializable, their ordered members, and their declared subtype
//! hierarchy.

use core::any::TypeId;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use crate::config::{AccessStrategy, BridgeConfig, TagFormat};
use crate::contract::member::{Factory, PassthroughCodec, RawMember};
use crate::contract::resolved::ResolvedContract;
use crate::contracted::{Contract, ContractType, GetContract};
use crate::dispatch::DispatchEntry;
use crate::error::ContractError;
use crate::util::{HashMap, HashSet, TypeIdMap, TypeIdSet};

// -----------------------------------------------------------------------------
// ContractShape

/// How the host format should treat a contracted type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractShape {
    /// Handled entirely by the host format's built-in logic; the contract
    /// converter never touches it.
    Basic,
    /// A member-by-member contract object.
    Object,
    /// A collection-shaped type; the contract decides whether it serializes
    /// as a native list or is forced down the object path.
    Collection(ListHandling),
}

/// List handling for [`ContractShape::Collection`] contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListHandling {
    /// Serialize through the type's own `serde` implementations.
    AsList,
    /// Ignore the collection shape and serialize declared members.
    AsObject,
}

// -----------------------------------------------------------------------------
// TypeContract

/// A type's declared contract, as registered.
///
/// Built by [`GetContract::contract`] (normally derive-generated) and stored
/// in the [`ContractRegistry`]. Immutable after insertion.
pub struct TypeContract {
    ty: ContractType,
    shape: ContractShape,
    members: Vec<RawMember>,
    parent: Option<ContractType>,
    is_abstract: bool,
    serializable: bool,
    factory: Option<Factory>,
    passthrough: Option<PassthroughCodec>,
}

impl TypeContract {
    /// Creates an object-shaped contract with the given members.
    pub fn object(ty: ContractType, members: Vec<RawMember>) -> Self {
        Self {
            ty,
            shape: ContractShape::Object,
            members,
            parent: None,
            is_abstract: false,
            serializable: true,
            factory: None,
            passthrough: None,
        }
    }

    /// Creates a basic contract for `T`: the host format owns it entirely.
    pub fn basic<T: ?Sized + 'static>() -> Self {
        Self {
            ty: ContractType::introspected::<T>(),
            shape: ContractShape::Basic,
            members: Vec::new(),
            parent: None,
            is_abstract: false,
            serializable: true,
            factory: None,
            passthrough: None,
        }
    }

    /// Marks the contract collection-shaped with the given list handling.
    #[inline]
    pub fn collection(mut self, handling: ListHandling) -> Self {
        self.shape = ContractShape::Collection(handling);
        self
    }

    /// Declares the parent type, creating a subtype edge at registration.
    #[inline]
    pub fn extends<P: Contract>(mut self) -> Self {
        self.parent = Some(P::contract_type());
        self
    }

    /// Marks the type abstract: excluded from subtype sets, never
    /// constructed from a discriminator.
    #[inline]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Attaches the no-argument object factory.
    #[inline]
    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Attaches the native-serde passthrough codec (list-shaped contracts).
    #[inline]
    pub fn with_passthrough(mut self, codec: PassthroughCodec) -> Self {
        self.passthrough = Some(codec);
        self
    }

    /// Withdraws the serializable marker; the type stays registered but any
    /// serialization attempt fails.
    #[inline]
    pub fn not_serializable(mut self) -> Self {
        self.serializable = false;
        self
    }

    /// Returns the type identity.
    #[inline]
    pub const fn ty(&self) -> ContractType {
        self.ty
    }

    /// Returns the [`TypeId`].
    #[inline]
    pub const fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    /// Returns the shape.
    #[inline]
    pub const fn shape(&self) -> ContractShape {
        self.shape
    }

    /// Returns the declared members, in declaration order.
    #[inline]
    pub fn members(&self) -> &[RawMember] {
        &self.members
    }

    /// Returns the declared parent identity, if any.
    #[inline]
    pub const fn parent(&self) -> Option<ContractType> {
        self.parent
    }

    /// Returns `true` if the type is declared abstract.
    #[inline]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Returns the explicit serializable marker.
    #[inline]
    pub const fn serializable(&self) -> bool {
        self.serializable
    }

    /// Returns the object factory, if one is declared.
    #[inline]
    pub const fn factory(&self) -> Option<Factory> {
        self.factory
    }

    /// Returns the passthrough codec, if one is declared.
    #[inline]
    pub const fn passthrough(&self) -> Option<&PassthroughCodec> {
        self.passthrough.as_ref()
    }
}

// -----------------------------------------------------------------------------
// ContractRegistry

/// A registry of [contracted] types.
///
/// The central store for [`TypeContract`]s, plus identity indexes (full
/// path, short name with ambiguity tracking) and the declared subtype
/// edges. [Registering] a type stores the contract produced by its
/// [`GetContract`] implementation.
///
/// The registry also owns the process-lifetime resolution caches
/// ([`ResolvedContract`], [`DispatchEntry`]): entries are computed lazily,
/// inserted idempotently (first published wins), and never mutated after
/// insertion, so concurrent readers race only on the insert itself.
///
/// # Example
///
/// ```
/// use polytag::{derive::Contract, ContractRegistry};
///
/// #[derive(Contract, Default)]
/// #[contract(default)]
/// struct Marker;
///
/// let mut registry = ContractRegistry::new();
/// registry.register::<Marker>();
///
/// let contract = registry.get_by_name("Marker").unwrap();
/// assert!(contract.ty().path().ends_with("::Marker"));
/// ```
///
/// [contracted]: crate::Contracted
/// [Registering]: ContractRegistry::register
pub struct ContractRegistry {
    config: BridgeConfig,
    contracts: TypeIdMap<TypeContract>,
    path_index: HashMap<&'static str, TypeId>,
    name_index: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
    direct_subtypes: TypeIdMap<Vec<TypeId>>,
    resolved: RwLock<TypeIdMap<Arc<ResolvedContract>>>,
    dispatch: RwLock<TypeIdMap<Arc<DispatchEntry>>>,
}

impl Default for ContractRegistry {
    /// See [`ContractRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRegistry {
    /// Creates an empty registry with the given configuration, without the
    /// default basic registrations.
    pub fn empty(config: BridgeConfig) -> Self {
        Self {
            config,
            contracts: TypeIdMap::new(),
            path_index: HashMap::default(),
            name_index: HashMap::default(),
            ambiguous_names: HashSet::default(),
            direct_subtypes: TypeIdMap::new(),
            resolved: RwLock::new(TypeIdMap::new()),
            dispatch: RwLock::new(TypeIdMap::new()),
        }
    }

    /// Creates a registry with the default configuration and the default
    /// basic registrations. See [`ContractRegistry::with_config`].
    #[inline]
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Creates a registry with basic registrations for the types the host
    /// format owns outright:
    ///
    /// - `()` `bool` `char`
    /// - `i8 - i128` `isize`
    /// - `u8 - u128` `usize`
    /// - `f32` `f64`
    /// - `String` `&'static str`
    /// - `std::path::PathBuf` `core::time::Duration`
    pub fn with_config(config: BridgeConfig) -> Self {
        let mut registry = Self::empty(config);
        registry.register_basic::<()>();
        registry.register_basic::<bool>();
        registry.register_basic::<char>();
        registry.register_basic::<u8>();
        registry.register_basic::<u16>();
        registry.register_basic::<u32>();
        registry.register_basic::<u64>();
        registry.register_basic::<u128>();
        registry.register_basic::<usize>();
        registry.register_basic::<i8>();
        registry.register_basic::<i16>();
        registry.register_basic::<i32>();
        registry.register_basic::<i64>();
        registry.register_basic::<i128>();
        registry.register_basic::<isize>();
        registry.register_basic::<f32>();
        registry.register_basic::<f64>();
        registry.register_basic::<String>();
        registry.register_basic::<&'static str>();
        registry.register_basic::<std::path::PathBuf>();
        registry.register_basic::<core::time::Duration>();
        registry
    }

    /// Returns the configuration this registry was built with.
    #[inline]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // # Validity
    // The type must **not** already exist.
    fn add_new_indices(
        contract: &TypeContract,
        path_index: &mut HashMap<&'static str, TypeId>,
        name_index: &mut HashMap<&'static str, TypeId>,
        ambiguous_names: &mut HashSet<&'static str>,
        direct_subtypes: &mut TypeIdMap<Vec<TypeId>>,
    ) {
        let ty = contract.ty();
        let name = ty.name();

        // Short names may collide across modules; collided names resolve to
        // neither type.
        if !ambiguous_names.contains(name) {
            if name_index.contains_key(name) {
                name_index.remove(name);
                ambiguous_names.insert(name);
            } else {
                name_index.insert(name, ty.id());
            }
        }

        // Full paths are assumed unique for new types.
        path_index.insert(ty.path(), ty.id());

        if let Some(parent) = contract.parent() {
            let children = match direct_subtypes.get_mut(&parent.id()) {
                Some(children) => children,
                None => {
                    direct_subtypes.insert(parent.id(), Vec::new());
                    direct_subtypes.get_mut(&parent.id()).unwrap()
                }
            };
            if !children.contains(&ty.id()) {
                children.push(ty.id());
            }
        }
    }

    // - If the key already exists, does nothing and returns `false`.
    // - Otherwise inserts the produced contract and returns `true`.
    fn register_internal(
        &mut self,
        type_id: TypeId,
        get_contract: impl FnOnce() -> TypeContract,
    ) -> bool {
        self.contracts.try_insert(type_id, || {
            let contract = get_contract();
            Self::add_new_indices(
                &contract,
                &mut self.path_index,
                &mut self.name_index,
                &mut self.ambiguous_names,
                &mut self.direct_subtypes,
            );
            contract
        })
    }

    /// Attempts to register the type `T` if it has not been registered yet.
    ///
    /// Also registers `T`'s declared dependencies (its parent chain) through
    /// [`GetContract::register_dependencies`]. Re-registration is a cheap
    /// no-op, so redundant calls are tolerated rather than an error.
    pub fn register<T: GetContract>(&mut self) {
        if self.register_internal(TypeId::of::<T>(), T::contract) {
            T::register_dependencies(self);
        }
    }

    /// Registers `T` as a basic type: the host format owns it entirely and
    /// the contract converter must never intercept it.
    pub fn register_basic<T: ?Sized + 'static>(&mut self) {
        self.register_internal(TypeId::of::<T>(), TypeContract::basic::<T>);
    }

    /// Inserts a hand-built contract if its type is not registered yet.
    ///
    /// Returns `false` (and keeps the existing entry) when it is.
    pub fn try_insert_contract(&mut self, contract: TypeContract) -> bool {
        let type_id = contract.type_id();
        let mut slot = Some(contract);
        self.contracts.try_insert(type_id, || {
            let contract = slot.take().unwrap();
            Self::add_new_indices(
                &contract,
                &mut self.path_index,
                &mut self.name_index,
                &mut self.ambiguous_names,
                &mut self.direct_subtypes,
            );
            contract
        })
    }

    /// Registers every type submitted through the `auto_register` feature.
    ///
    /// Equivalent to calling [`register`](Self::register) for each submitted
    /// type; repeated calls are cheap and insert no duplicates.
    ///
    /// Returns `true` if static registration is supported on the current
    /// platform (detected through a probe entry this crate submits itself).
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) -> bool {
        for entry in inventory::iter::<AutoRegistration> {
            (entry.register)(self);
        }
        self.contains(TypeId::of::<AutoRegisterProbe>())
    }

    /// Whether the type with the given [`TypeId`] has been registered.
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.contracts.contains(&type_id)
    }

    /// Returns the [`TypeContract`] of the type with the given [`TypeId`].
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeContract> {
        self.contracts.get(&type_id)
    }

    /// Returns the [`TypeContract`] with the given full type path.
    pub fn get_by_path(&self, path: &str) -> Option<&TypeContract> {
        match self.path_index.get(path) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns the [`TypeContract`] with the given unqualified name.
    ///
    /// Returns `None` when the name is ambiguous or unknown.
    pub fn get_by_name(&self, name: &str) -> Option<&TypeContract> {
        match self.name_index.get(name) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns `true` if the given unqualified name matches more than one
    /// registered type.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous_names.contains(name)
    }

    /// Returns an iterator over the registered contracts.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeContract> {
        self.contracts.values()
    }

    // -------------------------------------------------------------------------
    // Contract queries

    /// Returns the full ordered member list of a type: its own members
    /// followed by its ancestors', skipping declared names already seen so
    /// the most-derived declaration wins.
    ///
    /// Basic and unknown types yield an empty list.
    pub fn members(&self, type_id: TypeId) -> Vec<&RawMember> {
        let mut out: Vec<&RawMember> = Vec::new();
        let Some(contract) = self.get(type_id) else {
            return out;
        };
        if contract.shape() == ContractShape::Basic {
            return out;
        }

        let mut cursor = Some(contract);
        let mut visited = TypeIdSet::default();
        while let Some(contract) = cursor {
            if !visited.insert(contract.type_id()) {
                break;
            }
            for member in contract.members() {
                if !out.iter().any(|m| m.name() == member.name()) {
                    out.push(member);
                }
            }
            cursor = contract.parent().and_then(|parent| self.get(parent.id()));
        }
        out
    }

    /// Returns the transitive set of concrete, non-abstract subtypes of a
    /// type, by depth-first traversal of the declared subtype edges.
    ///
    /// A visited set guards against re-declared or cyclic edges; traversal
    /// order is irrelevant, only completeness. Basic and unknown types
    /// yield an empty set.
    pub fn subtypes(&self, type_id: TypeId) -> TypeIdSet {
        let mut found = TypeIdSet::default();
        let Some(contract) = self.get(type_id) else {
            return found;
        };
        if contract.shape() == ContractShape::Basic {
            return found;
        }

        let mut visited = TypeIdSet::default();
        let mut stack: Vec<TypeId> = vec![type_id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(children) = self.direct_subtypes.get(&current) {
                for &child in children {
                    if let Some(child_contract) = self.get(child) {
                        if !child_contract.is_abstract() {
                            found.insert(child);
                        }
                        stack.push(child);
                    }
                }
            }
        }
        found
    }

    /// Whether a type may be serialized at all.
    ///
    /// Under the [`Compiled`](AccessStrategy::Compiled) strategy this is the
    /// full contract answer: registered, marked serializable, and with its
    /// declared parent chain registered. Under
    /// [`Dynamic`](AccessStrategy::Dynamic) only the registration marker is
    /// consulted — a conservative approximation that skips the deeper
    /// introspection.
    pub fn can_serialize(&self, type_id: TypeId) -> bool {
        match self.config.access_strategy {
            AccessStrategy::Dynamic => self.contains(type_id),
            AccessStrategy::Compiled => {
                let Some(contract) = self.get(type_id) else {
                    return false;
                };
                if !contract.serializable() {
                    return false;
                }
                // Walk the parent chain; a dangling parent declaration is a
                // configuration defect, not a serializable type.
                let mut visited = TypeIdSet::default();
                let mut cursor = contract.parent();
                while let Some(parent) = cursor {
                    if !visited.insert(parent.id()) {
                        break;
                    }
                    match self.get(parent.id()) {
                        Some(parent_contract) => cursor = parent_contract.parent(),
                        None => return false,
                    }
                }
                true
            }
        }
    }

    /// Resolves a discriminator tag to the contract it names.
    ///
    /// Tries the full-path index, then the short-name index (rejecting
    /// ambiguous names), then — for custom tag formats — a linear scan
    /// formatting each registered identity.
    pub fn contract_for_tag(&self, tag: &str) -> Result<&TypeContract, ContractError> {
        if let Some(contract) = self.get_by_path(tag) {
            return Ok(contract);
        }
        if self.is_ambiguous(tag) {
            return Err(ContractError::AmbiguousTypeTag { tag: tag.to_owned() });
        }
        if let Some(contract) = self.get_by_name(tag) {
            return Ok(contract);
        }
        if let TagFormat::Custom(format) = self.config.tag_format {
            if let Some(contract) = self.iter().find(|c| format(c.ty()) == tag) {
                return Ok(contract);
            }
        }
        Err(ContractError::UnknownTypeTag { tag: tag.to_owned() })
    }

    // -------------------------------------------------------------------------
    // Resolution caches

    /// Returns the cached [`ResolvedContract`] for a type, computing it on
    /// first use.
    ///
    /// Concurrent first-use races are tolerated: the contract is computed
    /// outside the lock and the first published value wins.
    pub fn resolved_contract(
        &self,
        type_id: TypeId,
    ) -> Result<Arc<ResolvedContract>, ContractError> {
        if let Some(resolved) = self
            .resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(resolved.clone());
        }

        let contract = self.get(type_id).ok_or_else(|| {
            ContractError::NotSerializable {
                path: format!("{type_id:?}"),
            }
        })?;
        let built = Arc::new(ResolvedContract::build(self, contract)?);

        let mut cache = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = cache.get(&type_id) {
            return Ok(existing.clone());
        }
        cache.insert(type_id, built.clone());
        Ok(built)
    }

    /// Returns the cached [`DispatchEntry`] for a concrete subtype,
    /// building it on first use.
    pub fn dispatch_entry(&self, type_id: TypeId) -> Result<Arc<DispatchEntry>, ContractError> {
        if let Some(entry) = self
            .dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(entry.clone());
        }

        let resolved = self.resolved_contract(type_id)?;
        let tag = self.config.tag_format.format(resolved.ty());
        let built = Arc::new(DispatchEntry::new(resolved, tag));

        let mut cache = self.dispatch.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = cache.get(&type_id) {
            return Ok(existing.clone());
        }
        cache.insert(type_id, built.clone());
        Ok(built)
    }
}

// -----------------------------------------------------------------------------
// auto_register

/// A static registration entry, submitted by
/// [`#[derive(Contract)]`](crate::derive::Contract) under the
/// `auto_register` feature and collected by
/// [`ContractRegistry::auto_register`].
#[cfg(feature = "auto_register")]
pub struct AutoRegistration {
    register: fn(&mut ContractRegistry),
}

#[cfg(feature = "auto_register")]
impl AutoRegistration {
    /// Creates the registration entry for `T`.
    pub const fn of<T: GetContract>() -> Self {
        Self {
            register: |registry| registry.register::<T>(),
        }
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

/// Probe registered by this crate itself; its presence after
/// [`ContractRegistry::auto_register`] proves the platform collects
/// inventory submissions.
#[cfg(feature = "auto_register")]
struct AutoRegisterProbe;

#[cfg(feature = "auto_register")]
inventory::submit! {
    AutoRegistration {
        register: |registry| {
            registry.register_basic::<AutoRegisterProbe>();
        },
    }
}

// -----------------------------------------------------------------------------
// Global host

static GLOBAL: OnceLock<ContractRegistry> = OnceLock::new();
static PENDING_CONFIG: Mutex<Option<BridgeConfig>> = Mutex::new(None);

/// Installs the configuration the global host will be built with.
///
/// Must run during startup, before the first use of [`global`] (the first
/// (de)serialization of a [`Poly`] value counts). Installing twice, or
/// after first use, fails with [`ContractError::AlreadyInstalled`] — a loud
/// configuration error rather than a silently ignored one.
///
/// [`Poly`]: crate::Poly
pub fn install(config: BridgeConfig) -> Result<(), ContractError> {
    if GLOBAL.get().is_some() {
        return Err(ContractError::AlreadyInstalled);
    }
    let mut pending = PENDING_CONFIG.lock().unwrap_or_else(PoisonError::into_inner);
    if pending.is_some() {
        return Err(ContractError::AlreadyInstalled);
    }
    *pending = Some(config);
    Ok(())
}

/// Returns the process-global registry, building it on first use from the
/// installed configuration (default otherwise) and the `auto_register`
/// submissions.
pub fn global() -> &'static ContractRegistry {
    GLOBAL.get_or_init(|| {
        let config = PENDING_CONFIG
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        #[allow(unused_mut)]
        let mut registry = ContractRegistry::with_config(config);
        #[cfg(feature = "auto_register")]
        registry.auto_register();
        registry
    })
}

// -----------------------------------------------------------------------------
// Tests
