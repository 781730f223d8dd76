use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Object, SimpleObject, ID};
use dronenet_shared::{
    calc::PlannerConfig,
    models::{
        self, Availability, DroneStatus, GeoPoint, MissionEstimate, MissionRecord, SnapshotSource,
    },
    planner::MissionPlanner,
};

use crate::assets::Assets;
use crate::storage::{LogSink, MissionLog};

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlAvailability {
    Available,
    Occupied,
    Maintenance,
}

impl From<Availability> for GqlAvailability {
    fn from(a: Availability) -> Self {
        match a {
            Availability::Available => GqlAvailability::Available,
            Availability::Occupied => GqlAvailability::Occupied,
            Availability::Maintenance => GqlAvailability::Maintenance,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlDroneStatus {
    Idle,
    Flying,
    Charging,
    Maintenance,
}

impl From<DroneStatus> for GqlDroneStatus {
    fn from(s: DroneStatus) -> Self {
        match s {
            DroneStatus::Idle => GqlDroneStatus::Idle,
            DroneStatus::Flying => GqlDroneStatus::Flying,
            DroneStatus::Charging => GqlDroneStatus::Charging,
            DroneStatus::Maintenance => GqlDroneStatus::Maintenance,
        }
    }
}

impl From<GqlDroneStatus> for DroneStatus {
    fn from(s: GqlDroneStatus) -> Self {
        match s {
            GqlDroneStatus::Idle => DroneStatus::Idle,
            GqlDroneStatus::Flying => DroneStatus::Flying,
            GqlDroneStatus::Charging => DroneStatus::Charging,
            GqlDroneStatus::Maintenance => DroneStatus::Maintenance,
        }
    }
}

// GraphQL output types

#[derive(SimpleObject, Clone, Copy)]
pub struct GqlGeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPoint> for GqlGeoPoint {
    fn from(p: GeoPoint) -> Self {
        GqlGeoPoint { lat: p.lat, lng: p.lng }
    }
}

#[derive(SimpleObject)]
pub struct GqlStation {
    pub id: ID,
    pub name: String,
    pub location: GqlGeoPoint,
    pub price_per_kwh: f64,
    pub availability: GqlAvailability,
    pub total_slots: u32,
    pub available_slots: u32,
    pub owner: String,
    pub rating: f64,
}

impl From<&models::StationRecord> for GqlStation {
    fn from(s: &models::StationRecord) -> Self {
        GqlStation {
            id: ID(s.id.clone()),
            name: s.name.clone(),
            location: s.location.into(),
            price_per_kwh: s.price_per_kwh,
            availability: s.availability.into(),
            total_slots: s.total_slots,
            available_slots: s.available_slots,
            owner: s.owner.clone(),
            rating: s.rating,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlDrone {
    pub id: ID,
    pub name: String,
    pub model: String,
    pub battery_level: u32,
    pub battery_band: String,
    pub status: GqlDroneStatus,
    pub flight_time_min: u32,
    pub location: Option<GqlGeoPoint>,
}

impl From<&models::DroneRecord> for GqlDrone {
    fn from(d: &models::DroneRecord) -> Self {
        GqlDrone {
            id: ID(d.id.clone()),
            name: d.name.clone(),
            model: d.model.clone(),
            battery_level: d.battery_level as u32,
            battery_band: d.battery_band().as_str().to_string(),
            status: d.status.into(),
            flight_time_min: d.flight_time_min,
            location: d.location.map(GqlGeoPoint::from),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlSnapshot {
    pub stations: Vec<GqlStation>,
    pub drones: Vec<GqlDrone>,
}

#[derive(SimpleObject)]
pub struct GqlEstimate {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub battery_used_pct: f64,
    pub cost_usd: f64,
    pub feasible: bool,
}

impl From<MissionEstimate> for GqlEstimate {
    fn from(e: MissionEstimate) -> Self {
        GqlEstimate {
            distance_km: e.distance_km,
            eta_minutes: e.eta_minutes,
            battery_used_pct: e.battery_used_pct,
            cost_usd: e.cost_usd,
            feasible: e.feasible,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlMission {
    pub id: ID,
    pub committed_at: String,
    pub drone_id: String,
    pub start: GqlGeoPoint,
    pub end: GqlGeoPoint,
    pub station_id: Option<String>,
    pub estimate: GqlEstimate,
}

impl From<MissionRecord> for GqlMission {
    fn from(r: MissionRecord) -> Self {
        GqlMission {
            id: ID(r.id.to_string()),
            committed_at: r.committed_at,
            drone_id: r.mission.drone_id,
            start: r.mission.start.into(),
            end: r.mission.end.into(),
            station_id: r.mission.station_id,
            estimate: r.mission.estimate.into(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlPlannerConfig {
    pub average_speed_kmh: f64,
    pub battery_burn_pct_per_km: f64,
    pub minimum_reserve_pct: f64,
    pub battery_capacity_kwh: f64,
    pub fast_charge_premium_usd: f64,
}

// Input types

#[derive(InputObject)]
pub struct GeoPointInput {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPointInput> for GeoPoint {
    fn from(p: GeoPointInput) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

#[derive(InputObject)]
pub struct MissionInput {
    pub drone_id: String,
    pub start: GeoPointInput,
    pub end: GeoPointInput,
    /// Charge here instead of at the station nearest the destination.
    pub station_id: Option<String>,
    pub fast_charge: Option<bool>,
}

/// Run the input through a fresh planner so the server applies exactly the
/// rules the browser does.
fn plan_mission(
    input: MissionInput,
    assets: &Assets,
    config: &PlannerConfig,
) -> async_graphql::Result<MissionPlanner> {
    let mut planner = MissionPlanner::new(config.clone());
    planner
        .select_drone(&input.drone_id, &assets.drones)
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    planner
        .set_start(input.start.into())
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    planner
        .set_end(input.end.into())
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    if let Some(station_id) = input.station_id {
        if assets.find_station(&station_id).is_none() {
            return Err(async_graphql::Error::new(format!(
                "Unknown station: {}",
                station_id
            )));
        }
        planner.select_station(&station_id);
    }
    planner.set_fast_charge(input.fast_charge.unwrap_or(false));
    Ok(planner)
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn stations(
        &self,
        ctx: &Context<'_>,
        available_only: Option<bool>,
    ) -> async_graphql::Result<Vec<GqlStation>> {
        let assets = ctx.data::<Arc<Assets>>()?;
        Ok(assets
            .stations
            .iter()
            .filter(|s| !available_only.unwrap_or(false) || s.availability == Availability::Available)
            .map(GqlStation::from)
            .collect())
    }

    async fn drones(
        &self,
        ctx: &Context<'_>,
        status: Option<GqlDroneStatus>,
    ) -> async_graphql::Result<Vec<GqlDrone>> {
        let assets = ctx.data::<Arc<Assets>>()?;
        let status: Option<DroneStatus> = status.map(Into::into);
        Ok(assets
            .drones
            .iter()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .map(GqlDrone::from)
            .collect())
    }

    /// Everything the map needs in one round trip.
    async fn snapshot(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlSnapshot> {
        let snap = ctx.data::<Arc<Assets>>()?.snapshot();
        Ok(GqlSnapshot {
            stations: snap.stations.iter().map(GqlStation::from).collect(),
            drones: snap.drones.iter().map(GqlDrone::from).collect(),
        })
    }

    async fn planner_config(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlPlannerConfig> {
        let c = ctx.data::<Arc<PlannerConfig>>()?;
        Ok(GqlPlannerConfig {
            average_speed_kmh: c.average_speed_kmh,
            battery_burn_pct_per_km: c.battery_burn_pct_per_km,
            minimum_reserve_pct: c.minimum_reserve_pct,
            battery_capacity_kwh: c.battery_capacity_kwh,
            fast_charge_premium_usd: c.fast_charge_premium_usd,
        })
    }

    async fn estimate(
        &self,
        ctx: &Context<'_>,
        input: MissionInput,
    ) -> async_graphql::Result<GqlEstimate> {
        let assets = ctx.data::<Arc<Assets>>()?;
        let config = ctx.data::<Arc<PlannerConfig>>()?;
        let planner = plan_mission(input, assets, config)?;
        let estimate = planner
            .estimate(&assets.stations)
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        Ok(estimate.into())
    }

    async fn missions(
        &self,
        ctx: &Context<'_>,
        drone_id: Option<String>,
        limit: Option<u32>,
    ) -> async_graphql::Result<Vec<GqlMission>> {
        let log = ctx.data::<Arc<MissionLog>>()?;
        let limit = limit.unwrap_or(50) as usize;
        let records = match drone_id {
            Some(id) => log.for_drone(&id).map_err(async_graphql::Error::new)?,
            None => log.recent(limit).map_err(async_graphql::Error::new)?,
        };
        Ok(records.into_iter().take(limit).map(GqlMission::from).collect())
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn commit_mission(
        &self,
        ctx: &Context<'_>,
        input: MissionInput,
    ) -> async_graphql::Result<GqlMission> {
        let assets = ctx.data::<Arc<Assets>>()?;
        let config = ctx.data::<Arc<PlannerConfig>>()?;
        let log = ctx.data::<Arc<MissionLog>>()?;

        let mut planner = plan_mission(input, assets, config)?;
        let mut sink = LogSink::new(log);
        planner
            .commit(&mut sink, &assets.stations)
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        let record = sink
            .stored
            .ok_or_else(|| async_graphql::Error::new("Mission was not recorded"))?;

        Ok(GqlMission::from(record))
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(
    assets: Arc<Assets>,
    planner_config: PlannerConfig,
    missions: Arc<MissionLog>,
) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(assets)
        .data(Arc::new(planner_config))
        .data(missions)
        .finish()
}
