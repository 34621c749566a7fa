// Domain layer - Pure AQI computation and value types
pub mod aqi;
pub mod history;
pub mod measurement;
pub mod record;
