pub mod appointment;
pub mod catalog;
pub mod commanda;
pub mod workflow;
