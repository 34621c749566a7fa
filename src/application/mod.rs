// Application layer - Use cases over the domain and the repository port
pub mod assessment_service;
pub mod interchange_service;
pub mod measurement_repository;
pub mod report_service;
