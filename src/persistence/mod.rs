//! The `persistence` module keeps inbound payloads that could not be
//! decoded, for subscriptions configured with the dead-letter policy.
//!
//! It uses `sled` as an embedded key-value store.

pub mod dead_letter;

pub use dead_letter::{DeadLetter, DeadLetterStore};
