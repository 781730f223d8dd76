pub mod calc;
pub mod error;
pub mod geo;
pub mod map;
pub mod models;
pub mod planner;
