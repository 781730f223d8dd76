//! Mission selection state and feasibility estimates.

use crate::calc::{self, PlannerConfig};
use crate::error::{MapError, MissionError, UnavailableReason};
use crate::map::{MapProvider, MapRenderer, RouteOverlay};
use crate::models::{
    DroneRecord, DroneStatus, GeoPoint, MissionCommitted, MissionEstimate, StationRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Empty,
    PartialSelection,
    FullySelected,
    Committed,
}

impl std::fmt::Display for PlannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerState::Empty => write!(f, "empty"),
            PlannerState::PartialSelection => write!(f, "partial selection"),
            PlannerState::FullySelected => write!(f, "fully selected"),
            PlannerState::Committed => write!(f, "committed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedDrone {
    pub id: String,
    pub battery_level: u8,
}

/// Receiver of committed missions (the mission history collaborator).
pub trait MissionSink {
    fn mission_committed(&mut self, event: &MissionCommitted) -> Result<(), String>;
}

/// Collecting sink, used as an outbox by hosts that deliver asynchronously.
impl MissionSink for Vec<MissionCommitted> {
    fn mission_committed(&mut self, event: &MissionCommitted) -> Result<(), String> {
        self.push(event.clone());
        Ok(())
    }
}

/// Whether `drone` may be picked for a new mission.
pub fn check_drone_available(drone: &DroneRecord, config: &PlannerConfig) -> Result<(), MissionError> {
    if drone.status != DroneStatus::Idle {
        return Err(MissionError::DroneUnavailable {
            id: drone.id.clone(),
            reason: UnavailableReason::Status(drone.status),
        });
    }
    if drone.battery_level as f64 <= config.minimum_reserve_pct {
        return Err(MissionError::DroneUnavailable {
            id: drone.id.clone(),
            reason: UnavailableReason::LowBattery {
                level: drone.battery_level,
                reserve_pct: config.minimum_reserve_pct,
            },
        });
    }
    Ok(())
}

/// Holds the drone, start and end picked for the next mission.
///
/// The state is derived from which fields are set. Changing any field after
/// a commit starts a new draft.
#[derive(Debug, Clone, Default)]
pub struct MissionPlanner {
    config: PlannerConfig,
    drone: Option<SelectedDrone>,
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
    station_id: Option<String>,
    fast_charge: bool,
    committed: Option<MissionCommitted>,
}

impl MissionPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        MissionPlanner {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn state(&self) -> PlannerState {
        if self.committed.is_some() {
            return PlannerState::Committed;
        }
        let set = [self.drone.is_some(), self.start.is_some(), self.end.is_some()]
            .iter()
            .filter(|s| **s)
            .count();
        match set {
            0 => PlannerState::Empty,
            3 => PlannerState::FullySelected,
            _ => PlannerState::PartialSelection,
        }
    }

    pub fn drone(&self) -> Option<&SelectedDrone> {
        self.drone.as_ref()
    }

    pub fn start(&self) -> Option<GeoPoint> {
        self.start
    }

    pub fn end(&self) -> Option<GeoPoint> {
        self.end
    }

    pub fn station_id(&self) -> Option<&str> {
        self.station_id.as_deref()
    }

    pub fn fast_charge(&self) -> bool {
        self.fast_charge
    }

    /// The last committed mission, while still in the committed state.
    pub fn committed(&self) -> Option<&MissionCommitted> {
        self.committed.as_ref()
    }

    pub fn select_drone(&mut self, id: &str, drones: &[DroneRecord]) -> Result<(), MissionError> {
        let drone = drones
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| MissionError::DroneUnavailable {
                id: id.to_string(),
                reason: UnavailableReason::NotFound,
            })?;
        check_drone_available(drone, &self.config)?;
        self.committed = None;
        self.drone = Some(SelectedDrone {
            id: drone.id.clone(),
            battery_level: drone.battery_level,
        });
        Ok(())
    }

    pub fn set_start(&mut self, point: GeoPoint) -> Result<(), MissionError> {
        validate(point)?;
        self.committed = None;
        self.start = Some(point);
        Ok(())
    }

    pub fn set_end(&mut self, point: GeoPoint) -> Result<(), MissionError> {
        validate(point)?;
        self.committed = None;
        self.end = Some(point);
        Ok(())
    }

    pub fn clear_drone(&mut self) {
        self.committed = None;
        self.drone = None;
    }

    pub fn clear_start(&mut self) {
        self.committed = None;
        self.start = None;
    }

    pub fn clear_end(&mut self) {
        self.committed = None;
        self.end = None;
    }

    /// Charge at this station instead of the one nearest the destination.
    pub fn select_station(&mut self, id: &str) {
        self.committed = None;
        self.station_id = Some(id.to_string());
    }

    pub fn clear_station(&mut self) {
        self.committed = None;
        self.station_id = None;
    }

    pub fn set_fast_charge(&mut self, on: bool) {
        if self.fast_charge != on {
            self.committed = None;
            self.fast_charge = on;
        }
    }

    pub fn reset(&mut self) {
        *self = MissionPlanner::new(self.config.clone());
    }

    /// Return to the fully-selected state after a commit whose delivery
    /// failed downstream, so it can be committed again.
    pub fn reopen(&mut self) -> bool {
        self.committed.take().is_some()
    }

    /// Station whose rate prices the mission.
    pub fn charging_station<'a>(&self, stations: &'a [StationRecord]) -> Option<&'a StationRecord> {
        if let Some(id) = &self.station_id {
            if let Some(s) = stations.iter().find(|s| &s.id == id) {
                return Some(s);
            }
        }
        calc::nearest_station(stations, self.end?)
    }

    pub fn estimate(&self, stations: &[StationRecord]) -> Result<MissionEstimate, MissionError> {
        let (Some(drone), Some(start), Some(end)) = (&self.drone, self.start, self.end) else {
            return Err(MissionError::IncompleteSelection);
        };
        let rate = self.charging_station(stations).map(|s| s.price_per_kwh);
        Ok(calc::mission_estimate(
            start,
            end,
            drone.battery_level,
            rate,
            self.fast_charge,
            &self.config,
        ))
    }

    /// Hand the mission to `sink`. Only valid when fully selected; a sink
    /// failure leaves the planner fully selected so the caller can retry.
    pub fn commit(
        &mut self,
        sink: &mut impl MissionSink,
        stations: &[StationRecord],
    ) -> Result<&MissionCommitted, MissionError> {
        let state = self.state();
        if state != PlannerState::FullySelected {
            return Err(MissionError::InvalidTransition(state));
        }
        let estimate = self.estimate(stations)?;
        let (Some(drone), Some(start), Some(end)) = (&self.drone, self.start, self.end) else {
            return Err(MissionError::IncompleteSelection);
        };
        let event = MissionCommitted {
            drone_id: drone.id.clone(),
            start,
            end,
            station_id: self.charging_station(stations).map(|s| s.id.clone()),
            estimate,
        };

        if let Err(e) = sink.mission_committed(&event) {
            tracing::warn!(drone = %event.drone_id, error = %e, "mission sink rejected commit");
            return Err(MissionError::Commit(e));
        }
        tracing::info!(
            drone = %event.drone_id,
            distance_km = event.estimate.distance_km,
            feasible = event.estimate.feasible,
            "mission committed"
        );
        Ok(self.committed.insert(event))
    }

    /// Mirror the selected start/end onto `overlay`: draw the route when
    /// both are set, clear it otherwise.
    pub fn render_route<P: MapProvider>(
        &self,
        overlay: &mut RouteOverlay,
        renderer: &mut MapRenderer<P>,
    ) -> Result<(), MapError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let unchanged = overlay
                    .active()
                    .is_some_and(|r| r.start == start && r.end == end);
                if unchanged {
                    return Ok(());
                }
                overlay.show_route(renderer, start, end)
            }
            _ => overlay.clear_route(renderer).map(|_| ()),
        }
    }
}

fn validate(point: GeoPoint) -> Result<(), MissionError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(MissionError::InvalidLocation {
            lat: point.lat,
            lng: point.lng,
        })
    }
}
