//! Infrastructure layer: event persistence, dispatch, read models, and the
//! registrar service that fronts the academic ledger.

pub mod catalog_store;
pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod registrar;


pub use catalog_store::CatalogStore;
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use read_model::{InMemoryReadStore, ReadStore};
pub use registrar::{Registrar, RegistrarError};
