pub mod ledger;
pub mod lifecycle;
pub mod settlement;
pub mod workflow;
pub use workflow::WorkflowCoordinator;
