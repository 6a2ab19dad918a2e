#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Modules

mod contracted;
mod util;

pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod naming;
pub mod poly;
pub mod serde;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use config::{AccessStrategy, BridgeConfig, TagFormat};
pub use contract::{ContractRegistry, RawMember, TypeContract, global, install};
pub use contracted::{Contract, ContractType, Contracted, GetContract, MemberValue};
pub use error::ContractError;
pub use naming::NamingPolicy;
pub use poly::Poly;
pub use crate::serde::{ContractDeserializer, ContractSerializer, TypeResolution};

pub use polytag_derive as derive;
