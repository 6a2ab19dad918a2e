//! Bridge-wide configuration, fixed at registry construction.

use crate::contracted::ContractType;
use crate::naming::NamingPolicy;

// -----------------------------------------------------------------------------
// AccessStrategy

/// How member accessors reach into container instances.
///
/// The strategy is selected **once**, when the [`BridgeConfig`] is built,
/// and applies to every contract resolved by that registry.
///
/// [`BridgeConfig`]: crate::BridgeConfig
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessStrategy {
    /// Cached per-member function pointers out of the derive-generated
    /// member table. Lowest per-call overhead.
    #[default]
    Compiled,
    /// Per-call name-based dispatch through the object-safe
    /// [`Contracted`](crate::Contracted) member methods. Functionally
    /// identical to [`Compiled`](Self::Compiled), slower, and usable when
    /// cached accessor tables must not be built up front.
    Dynamic,
}

// -----------------------------------------------------------------------------
// TagFormat

/// How a type identity is rendered into a discriminator tag.
///
/// Tags must be stable and unambiguous; the format is part of the wire
/// contract shared with already-written payloads.
#[derive(Clone, Copy, Debug)]
pub enum TagFormat {
    /// The fully qualified type path, e.g. `my_crate::shapes::Circle`.
    Path,
    /// The unqualified type name, e.g. `Circle`. More compact and stable
    /// across module reshuffles; rejected at read time when two registered
    /// types share a name.
    Short,
    /// A caller-supplied formatter.
    Custom(fn(ContractType) -> String),
}

impl TagFormat {
    /// Renders the tag for a type identity.
    pub fn format(&self, ty: ContractType) -> String {
        match self {
            Self::Path => ty.path().to_owned(),
            Self::Short => ty.name().to_owned(),
            Self::Custom(f) => f(ty),
        }
    }
}

impl Default for TagFormat {
    #[inline]
    fn default() -> Self {
        Self::Path
    }
}

// -----------------------------------------------------------------------------
// BridgeConfig

/// Immutable configuration for one [`ContractRegistry`].
///
/// Created once at startup and owned by the registry; every component reads
/// it from there. There are no global mutable switches.
///
/// # Examples
///
/// ```
/// use polytag::{AccessStrategy, BridgeConfig, ContractRegistry, TagFormat};
///
/// let config = BridgeConfig::new()
///     .tag_format(TagFormat::Short)
///     .access_strategy(AccessStrategy::Dynamic);
///
/// let registry = ContractRegistry::with_config(config);
/// assert_eq!(registry.config().discriminator, "$type");
/// ```
///
/// [`ContractRegistry`]: crate::ContractRegistry
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// The reserved discriminator property name.
    pub discriminator: &'static str,
    /// How discriminator tags are rendered.
    pub tag_format: TagFormat,
    /// The declared-name to wire-name mapping.
    pub naming: NamingPolicy,
    /// Whether incoming property names match members case-insensitively.
    pub case_insensitive: bool,
    /// The member access strategy.
    pub access_strategy: AccessStrategy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            discriminator: "$type",
            tag_format: TagFormat::default(),
            naming: NamingPolicy::default(),
            case_insensitive: true,
            access_strategy: AccessStrategy::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates the default configuration: `"$type"` discriminator, full-path
    /// tags, camelCase naming, case-insensitive matching, compiled accessors.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tag format.
    #[inline]
    pub fn tag_format(mut self, format: TagFormat) -> Self {
        self.tag_format = format;
        self
    }

    /// Replaces the naming policy.
    #[inline]
    pub fn naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Sets whether read-side member matching ignores case.
    #[inline]
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Replaces the member access strategy.
    #[inline]
    pub fn access_strategy(mut self, strategy: AccessStrategy) -> Self {
        self.access_strategy = strategy;
        self
    }
}
