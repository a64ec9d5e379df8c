pub mod analysis_model;
pub mod dashboard_model;
pub mod fleet_model;
