//! `clinicbill-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the billing crates
//! (identifiers, money, errors). No infrastructure concerns live here.

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{BillId, EventId, PatientId, ProviderId, TenantId};
pub use money::{Money, TaxRate};
