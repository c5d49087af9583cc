//! In-process test doubles for the store and notifier.
//!
//! Enabled by the `test-utils` feature (on by default).

pub mod notifier;
pub mod store;

pub use notifier::MockNotifier;
pub use store::InMemoryRegistrationStore;
