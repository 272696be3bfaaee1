//! `invoiceflow-client`
//!
//! **Responsibility:** drive the invoice backend and keep a local view of it.
//!
//! This crate provides:
//! - Request lifecycle tracking per operation (`Idle → Pending → Succeeded | Failed`)
//! - The invoice store (fetched list, single-invoice detail, last created invoice)
//! - The backend interface, an in-memory backend and an HTTP backend (`http` feature)
//! - Client configuration from the environment
//!
//! The backend is the authority; the store only caches what it returned.

pub mod backend;
pub mod client;
pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod operation;
pub mod session;
pub mod store;

pub use backend::{BackendError, InvoiceBackend};
pub use client::{ClientError, ClientState, InvoiceClient, ListPage};
pub use config::{ClientConfig, ConfigError, DispatchPolicy};
#[cfg(feature = "http")]
pub use http::HttpBackend;
pub use memory::{Fault, InMemoryBackend};
pub use operation::{OperationKind, OperationState, Operations, Phase};
pub use session::{Session, UserProfile};
pub use store::InvoiceStore;
