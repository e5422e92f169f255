//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing
//! concrete implementations of the domain port traits:
//!
//! - **memory**: in-process document store, object store and identity
//!   provider
//!
//! Adapters are thin translators between domain types and the storage
//! representation. They contain no business logic.

pub mod memory;
