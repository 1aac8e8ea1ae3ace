pub mod error;
pub mod field_settings;
pub mod kpi;
