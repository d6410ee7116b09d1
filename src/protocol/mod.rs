//! # Protocol Layer
//!
//! Schemas, packet instances, and the envelope codec that ties them to the
//! wire formats in [`crate::core`].
//!
//! ## Components
//! - **Schema**: field layouts and schema IR loaders
//! - **Registry**: type id → schema lookup, plus the process-wide registry
//! - **Catalog**: the built-in reference packets
//! - **Packet**: immutable instances and their builder
//! - **Envelope**: type stamping, encode, and total decode projection
//! - **Dispatcher**: routes decoded packets to handlers by type id
//!
//! ## Envelope Layout
//! ```text
//! { "packetType": "/domain/Name", <declared fields in schema order>, <extras> }
//! ```

pub mod catalog;
pub mod dispatcher;
pub mod envelope;
pub mod packet;
pub mod registry;
pub mod schema;
