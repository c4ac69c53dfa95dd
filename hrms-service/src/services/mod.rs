//! Services layer for hrms-service.
//!
//! Storage adapters behind the [`NodeRepository`] seam, plus metrics.

mod database;
mod memory;
pub mod metrics;
mod repository;

pub use database::PgNodeRepository;
pub use memory::InMemoryNodeRepository;
pub use repository::{NodeRepository, RepositoryError};
