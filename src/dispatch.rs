//! Per-subtype dispatch entries.
//!
//! When a discriminator forces a hand-off to a more specific type, the
//! caller has no static knowledge of that type. A [`DispatchEntry`] is the
//! cached, type-erased pair of entry points that lets the converter resume
//! reading or writing an object body as the concrete subtype anyway: the
//! member loops are data-driven over the subtype's resolved contract, and
//! the accessors inside it are already erased.
//!
//! Entries are built once per type and cached by the registry
//! ([`ContractRegistry::dispatch_entry`](crate::ContractRegistry::dispatch_entry)).

use std::sync::Arc;

use serde_core::Serializer;
use serde_core::de::MapAccess;

use crate::contract::{ContractRegistry, ResolvedContract};
use crate::contracted::Contracted;

// -----------------------------------------------------------------------------
// DispatchEntry

/// The cached dispatch entry for one concrete subtype.
pub struct DispatchEntry {
    contract: Arc<ResolvedContract>,
    tag: String,
}

impl DispatchEntry {
    pub(crate) fn new(contract: Arc<ResolvedContract>, tag: String) -> Self {
        Self { contract, tag }
    }

    /// Returns the subtype's resolved contract.
    #[inline]
    pub fn contract(&self) -> &Arc<ResolvedContract> {
        &self.contract
    }

    /// Returns the formatted discriminator tag for the subtype.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Resumes parsing an already-opened object as this entry's type.
    ///
    /// The discriminator property has been consumed by the caller; this
    /// reads every remaining property against the subtype's member table.
    pub(crate) fn read_remainder<'de, A: MapAccess<'de>>(
        &self,
        map: &mut A,
    ) -> Result<Box<dyn Contracted>, A::Error> {
        crate::serde::de::read_body(map, &self.contract, None)
    }

    /// Writes an object body as this entry's type, **including** the
    /// discriminator property.
    pub(crate) fn write_remainder<S: Serializer>(
        &self,
        value: &dyn Contracted,
        serializer: S,
        registry: &ContractRegistry,
    ) -> Result<S::Ok, S::Error> {
        crate::serde::ser::write_object(
            serializer,
            value,
            &self.contract,
            Some((registry.config().discriminator, &self.tag)),
        )
    }
}
