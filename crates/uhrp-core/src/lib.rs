//! # UHRP Core
//!
//! Core types, codecs, and traits for the Universal Hash Resolution
//! Protocol overlay: on-chain tokens asserting that content with a given
//! hash can be fetched from a URL until an expiry time.
//!
//! ## Key Types
//!
//! - [`PushDropToken`]: the token wire codec (ordered byte fields)
//! - [`CommitmentToken`]: validated view of a token's fields
//! - [`CommitmentRecord`]: the row kept per live commitment
//! - [`UtxoReference`]: `(txid, output index)` key
//! - [`LookupQuery`]: parsed lookup request
//!
//! ## Key Traits
//!
//! - [`TopicManager`]: admission decision for a topic
//! - [`TransactionDecoder`]: raw transaction parsing
//! - [`Clock`]: time abstraction for testability

pub mod commitment;
pub mod error;
pub mod event;
pub mod outpoint;
pub mod pushdrop;
pub mod query;
pub mod traits;
pub mod transaction;

// Re-export main types
pub use commitment::*;
pub use error::*;
pub use event::*;
pub use outpoint::*;
pub use pushdrop::PushDropToken;
pub use query::*;
pub use traits::*;
pub use transaction::*;
