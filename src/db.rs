pub mod store;
pub use store::{CatalogLookup, PaymentInstrumentLookup, UnitOfWork, WorkflowStore};
pub mod workflow_repo;
pub use workflow_repo::PgWorkflowStore;
pub mod catalog_repo;
pub use catalog_repo::PgCatalog;
pub mod memory_repo;
pub use memory_repo::{InMemoryCatalog, InMemoryStore};
