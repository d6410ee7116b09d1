//! # Core Codec Components
//!
//! The value model and the two wire codecs that carry it.
//!
//! Nothing in this module knows about packet schemas: it turns value trees
//! into bytes and back. Envelope handling lives in [`crate::protocol`].
//!
//! ## Components
//! - **Value**: the closed set of kinds a field can hold
//! - **Text**: JSON-compatible codec with the safe-integer policy
//! - **Binary**: MessagePack-compatible codec with hostile-input guards
//! - **Serialization**: the [`WireFormat`](serialization::WireFormat) selector
//! - **Frame**: length-prefixed framing for byte streams
//!
//! ## Frame Format
//! ```text
//! [Magic(4)] [Version(1)] [Format(1)] [Length(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Nesting depth is bounded in every encoder and decoder
//! - Length fields are validated before allocation

pub mod binary;
pub mod frame;
pub mod serialization;
pub mod text;
pub mod value;
