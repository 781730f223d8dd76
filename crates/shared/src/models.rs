use serde::{Deserialize, Serialize};
#[cfg(feature = "uuid-support")]
use uuid::Uuid;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn approx_eq(&self, other: &GeoPoint, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lng - other.lng).abs() <= eps
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Occupied,
    Maintenance,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Occupied => write!(f, "occupied"),
            Availability::Maintenance => write!(f, "maintenance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub price_per_kwh: f64,
    pub availability: Availability,
    pub total_slots: u32,
    pub available_slots: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub rating: f64,
}

impl StationRecord {
    /// Check the record-level invariants. Location problems are reported
    /// separately by the map layer so one bad pin never hides a station list.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("station id must not be empty".to_string());
        }
        if !(self.price_per_kwh.is_finite() && self.price_per_kwh >= 0.0) {
            return Err(format!(
                "station {}: price per kWh must be >= 0, got {}",
                self.id, self.price_per_kwh
            ));
        }
        if self.total_slots == 0 {
            return Err(format!("station {}: total slots must be > 0", self.id));
        }
        if self.available_slots > self.total_slots {
            return Err(format!(
                "station {}: {} available slots exceeds {} total",
                self.id, self.available_slots, self.total_slots
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    Idle,
    Flying,
    Charging,
    Maintenance,
}

impl std::fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DroneStatus::Idle => write!(f, "idle"),
            DroneStatus::Flying => write!(f, "flying"),
            DroneStatus::Charging => write!(f, "charging"),
            DroneStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// Coarse battery band used for marker styling and list badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryBand {
    High,
    Medium,
    Low,
}

impl BatteryBand {
    pub fn from_level(level: u8) -> Self {
        if level > 60 {
            BatteryBand::High
        } else if level > 30 {
            BatteryBand::Medium
        } else {
            BatteryBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryBand::High => "high",
            BatteryBand::Medium => "medium",
            BatteryBand::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    pub battery_level: u8,
    pub status: DroneStatus,
    #[serde(default)]
    pub flight_time_min: u32,
    /// Absent while the drone is not being tracked.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl DroneRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("drone id must not be empty".to_string());
        }
        if self.battery_level > 100 {
            return Err(format!(
                "drone {}: battery level {} is above 100",
                self.id, self.battery_level
            ));
        }
        Ok(())
    }

    pub fn battery_band(&self) -> BatteryBand {
        BatteryBand::from_level(self.battery_level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionEstimate {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub battery_used_pct: f64,
    pub cost_usd: f64,
    pub feasible: bool,
}

/// Event handed to the mission sink when a plan is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionCommitted {
    pub drone_id: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub station_id: Option<String>,
    pub estimate: MissionEstimate,
}

/// The latest stations/drones as supplied by the data collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stations: Vec<StationRecord>,
    pub drones: Vec<DroneRecord>,
}

/// Anything that can hand out the current entity snapshot on demand.
pub trait SnapshotSource {
    fn snapshot(&self) -> Snapshot;
}

#[cfg(feature = "uuid-support")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub id: Uuid,
    pub committed_at: String,
    pub mission: MissionCommitted,
}
