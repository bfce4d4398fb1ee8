pub mod datapoint_repository;
pub mod error;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod station_repository;
pub mod store;

pub use datapoint_repository::DatapointRepository;
pub use error::DbError;
pub use memory_store::MemoryClimateStore;
pub use models::*;
pub use pg_store::PgClimateStore;
pub use station_repository::StationRepository;
pub use store::ClimateStore;
