use dronenet_shared::calc::PlannerConfig;
use dronenet_shared::models::{
    Availability, DroneRecord, DroneStatus, GeoPoint, MissionCommitted, MissionEstimate, Snapshot,
    StationRecord,
};
use serde::{Deserialize, Serialize};

/// Build the variables JSON for the estimate query and the commit mutation.
pub fn build_mission_variables(
    drone_id: &str,
    start: GeoPoint,
    end: GeoPoint,
    station_id: Option<&str>,
    fast_charge: bool,
) -> serde_json::Value {
    serde_json::json!({
        "input": {
            "droneId": drone_id,
            "start": { "lat": start.lat, "lng": start.lng },
            "end": { "lat": end.lat, "lng": end.lng },
            "stationId": station_id,
            "fastCharge": fast_charge
        }
    })
}

/// Shareable link that opens the planner with a drone preselected.
pub fn build_mission_url(origin: &str, drone_id: &str) -> String {
    format!("{}/mission/{}", origin, drone_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

pub fn origin() -> Result<String, String> {
    let window = web_sys::window().ok_or("no window")?;
    window
        .location()
        .origin()
        .map_err(|_| "location origin unavailable".to_string())
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(format!("{}/graphql", origin()?))
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(errors) = gql_resp.errors {
        if let Some(first) = errors.into_iter().next() {
            return Err(first.message);
        }
    }

    gql_resp.data.ok_or_else(|| "No data returned".to_string())
}

// Types mirroring the GraphQL schema

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointData {
    pub lat: f64,
    pub lng: f64,
}

impl From<PointData> for GeoPoint {
    fn from(p: PointData) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationData {
    pub id: String,
    pub name: String,
    pub location: PointData,
    pub price_per_kwh: f64,
    pub availability: String,
    pub total_slots: u32,
    pub available_slots: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub rating: f64,
}

impl StationData {
    pub fn into_record(self) -> Result<StationRecord, String> {
        let availability = match self.availability.as_str() {
            "AVAILABLE" => Availability::Available,
            "OCCUPIED" => Availability::Occupied,
            "MAINTENANCE" => Availability::Maintenance,
            other => return Err(format!("unknown availability {}", other)),
        };
        Ok(StationRecord {
            id: self.id,
            name: self.name,
            location: self.location.into(),
            price_per_kwh: self.price_per_kwh,
            availability,
            total_slots: self.total_slots,
            available_slots: self.available_slots,
            owner: self.owner,
            rating: self.rating,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneData {
    pub id: String,
    pub name: String,
    pub model: String,
    pub battery_level: u8,
    pub status: String,
    pub flight_time_min: u32,
    pub location: Option<PointData>,
}

impl DroneData {
    pub fn into_record(self) -> Result<DroneRecord, String> {
        let status = match self.status.as_str() {
            "IDLE" => DroneStatus::Idle,
            "FLYING" => DroneStatus::Flying,
            "CHARGING" => DroneStatus::Charging,
            "MAINTENANCE" => DroneStatus::Maintenance,
            other => return Err(format!("unknown drone status {}", other)),
        };
        Ok(DroneRecord {
            id: self.id,
            name: self.name,
            model: self.model,
            battery_level: self.battery_level,
            status,
            flight_time_min: self.flight_time_min,
            location: self.location.map(GeoPoint::from),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionData {
    pub id: String,
    pub committed_at: String,
    pub drone_id: String,
    pub station_id: Option<String>,
    pub estimate: MissionEstimate,
}

// API functions

#[derive(Deserialize)]
pub struct SnapshotData {
    pub stations: Vec<StationData>,
    pub drones: Vec<DroneData>,
}

impl SnapshotData {
    pub fn into_snapshot(self) -> Result<Snapshot, String> {
        Ok(Snapshot {
            stations: self
                .stations
                .into_iter()
                .map(StationData::into_record)
                .collect::<Result<_, _>>()?,
            drones: self
                .drones
                .into_iter()
                .map(DroneData::into_record)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Deserialize)]
pub struct SnapshotResponse {
    pub snapshot: SnapshotData,
}

pub async fn fetch_snapshot() -> Result<Snapshot, String> {
    let resp: SnapshotResponse = query(
        r#"query {
            snapshot {
                stations { id name location { lat lng } pricePerKwh availability totalSlots availableSlots owner rating }
                drones { id name model batteryLevel status flightTimeMin location { lat lng } }
            }
        }"#,
        None,
    )
    .await?;
    resp.snapshot.into_snapshot()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfigResponse {
    pub planner_config: PlannerConfig,
}

pub async fn fetch_planner_config() -> Result<PlannerConfig, String> {
    let resp: PlannerConfigResponse = query(
        r#"query {
            plannerConfig {
                averageSpeedKmh batteryBurnPctPerKm minimumReservePct
                batteryCapacityKwh fastChargePremiumUsd
            }
        }"#,
        None,
    )
    .await?;
    Ok(resp.planner_config)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMissionResponse {
    pub commit_mission: MissionData,
}

pub async fn commit_mission(
    mission: &MissionCommitted,
    fast_charge: bool,
) -> Result<MissionData, String> {
    let variables = build_mission_variables(
        &mission.drone_id,
        mission.start,
        mission.end,
        mission.station_id.as_deref(),
        fast_charge,
    );

    let resp: CommitMissionResponse = query(
        r#"mutation CommitMission($input: MissionInput!) {
            commitMission(input: $input) {
                id committedAt droneId stationId
                estimate { distanceKm etaMinutes batteryUsedPct costUsd feasible }
            }
        }"#,
        Some(variables),
    )
    .await?;
    Ok(resp.commit_mission)
}

#[derive(Deserialize)]
pub struct MissionsResponse {
    pub missions: Vec<MissionData>,
}

pub async fn fetch_missions(drone_id: &str) -> Result<Vec<MissionData>, String> {
    let variables = serde_json::json!({ "droneId": drone_id });
    let resp: MissionsResponse = query(
        r#"query Missions($droneId: String) {
            missions(droneId: $droneId, limit: 5) {
                id committedAt droneId stationId
                estimate { distanceKm etaMinutes batteryUsedPct costUsd feasible }
            }
        }"#,
        Some(variables),
    )
    .await?;
    Ok(resp.missions)
}
