// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_interchange;
pub mod html_report;
pub mod http_response;
pub mod memory_repository;
pub mod sqlite_repository;
