pub mod aggregation;
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod fetch_error;
pub mod fetcher;
pub mod geo;
pub mod ghcn;
pub mod services;
