//! Re-exports for derive-generated code. Not public API.
//!
//! The derive refers to everything through this module so that generated
//! code never depends on the user's own dependency graph.

pub use erased_serde;
pub use serde_core;

#[cfg(feature = "auto_register")]
pub use inventory;

#[cfg(feature = "auto_register")]
pub use crate::contract::AutoRegistration;

pub use crate::contract::{ListHandling, PassthroughCodec};
