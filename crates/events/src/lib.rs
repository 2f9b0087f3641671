//! `acadledger-events` — event plumbing shared by the domain modules.
//!
//! Events are append-only facts; read models are disposable views built from
//! them. Nothing in this crate performs IO.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
