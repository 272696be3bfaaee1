//! `invoiceflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the invoicing
//! rules and the client (no IO, no async).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{InvoiceId, TenantId, UserId};
pub use value_object::ValueObject;
