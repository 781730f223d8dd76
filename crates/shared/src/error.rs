//! Error types for the map core and the mission planner.

use thiserror::Error;

use crate::map::MarkerKind;
use crate::models::DroneStatus;
use crate::planner::PlannerState;

/// Errors raised by the map renderer and the layers drawn on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("map initialization failed: {0}")]
    Init(String),

    #[error("map is not ready and pre-ready buffering is disabled")]
    NotReady,

    #[error("invalid camera: zoom {zoom}, pitch {pitch}")]
    InvalidCamera { zoom: f64, pitch: f64 },

    #[error("cannot fit the camera to an empty set of points")]
    EmptyBounds,

    #[error("invalid location for {entity}: ({lat}, {lng})")]
    InvalidLocation { entity: String, lat: f64, lng: f64 },

    #[error("duplicate {kind} id {id} in snapshot")]
    DuplicateEntity { kind: MarkerKind, id: String },
}

/// Why a drone cannot be picked for a mission.
#[derive(Debug, Clone, PartialEq)]
pub enum UnavailableReason {
    NotFound,
    Status(DroneStatus),
    LowBattery { level: u8, reserve_pct: f64 },
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::NotFound => write!(f, "not in the current snapshot"),
            UnavailableReason::Status(s) => write!(f, "status is {s}, must be idle"),
            UnavailableReason::LowBattery { level, reserve_pct } => {
                write!(f, "battery {level}% is at or below the {reserve_pct}% reserve")
            }
        }
    }
}

/// Errors raised by [`crate::planner::MissionPlanner`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MissionError {
    #[error("invalid location ({lat}, {lng})")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("drone {id} is unavailable: {reason}")]
    DroneUnavailable { id: String, reason: UnavailableReason },

    #[error("a drone, a start point and an end point are required")]
    IncompleteSelection,

    #[error("cannot commit from the {0} state")]
    InvalidTransition(PlannerState),

    #[error("mission commit failed: {0}")]
    Commit(String),
}
