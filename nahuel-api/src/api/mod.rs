//! HTTP API handlers for nahuel-api

pub mod catalog;
pub mod health;
pub mod hierarchy;
pub mod resolutions;
pub mod titles;

pub use catalog::{
    list_academic_units, list_career_types, list_careers, list_institutions,
    list_resolution_types, list_title_modes, list_title_types,
};
pub use health::health_routes;
pub use hierarchy::academic_units_hierarchy;
pub use resolutions::{create_resolution, list_resolutions};
pub use titles::{list_titles, update_title};
