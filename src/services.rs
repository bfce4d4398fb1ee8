pub mod climate_query_service;
pub mod ingest_service;

pub use climate_query_service::{ClimateQueryService, NearbyStation, QueryError, TemperatureHistory};
pub use ingest_service::{
    CatalogIngest, DatapointIngest, IngestError, IngestOptions, IngestService, IngestStats,
    StationIngest,
};
