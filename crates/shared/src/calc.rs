use serde::{Deserialize, Serialize};

use crate::geo;
use crate::models::{GeoPoint, MissionEstimate, StationRecord};

/// Fixed flight and pricing constants fed into every estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    pub average_speed_kmh: f64,
    pub battery_burn_pct_per_km: f64,
    /// Charge that must remain after landing, in percent.
    pub minimum_reserve_pct: f64,
    pub battery_capacity_kwh: f64,
    pub fast_charge_premium_usd: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            average_speed_kmh: 21.0,
            battery_burn_pct_per_km: 8.2,
            minimum_reserve_pct: 30.0,
            // 77 Wh pack of a DJI Mavic 3
            battery_capacity_kwh: 0.077,
            fast_charge_premium_usd: 0.50,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(format!(
                "averageSpeedKmh must be > 0, got {}",
                self.average_speed_kmh
            ));
        }
        for (name, value) in [
            ("batteryBurnPctPerKm", self.battery_burn_pct_per_km),
            ("minimumReservePct", self.minimum_reserve_pct),
            ("batteryCapacityKwh", self.battery_capacity_kwh),
            ("fastChargePremiumUsd", self.fast_charge_premium_usd),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} must be >= 0, got {value}"));
            }
        }
        if self.minimum_reserve_pct > 100.0 {
            return Err(format!(
                "minimumReservePct must be <= 100, got {}",
                self.minimum_reserve_pct
            ));
        }
        Ok(())
    }
}

/// Battery percentage burned over `distance_km`, capped at a full pack.
pub fn battery_used_pct(distance_km: f64, config: &PlannerConfig) -> f64 {
    (distance_km * config.battery_burn_pct_per_km).min(100.0)
}

/// Whether the drone lands with at least the reserve left.
pub fn is_feasible(battery_used_pct: f64, battery_level: u8, minimum_reserve_pct: f64) -> bool {
    battery_used_pct <= battery_level as f64 - minimum_reserve_pct
}

/// Cost of recharging what the flight burned at `rate_per_kwh`.
pub fn charging_cost(
    battery_used_pct: f64,
    rate_per_kwh: f64,
    fast_charge: bool,
    config: &PlannerConfig,
) -> f64 {
    let energy_kwh = battery_used_pct / 100.0 * config.battery_capacity_kwh;
    let premium = if fast_charge {
        config.fast_charge_premium_usd
    } else {
        0.0
    };
    energy_kwh * rate_per_kwh + premium
}

/// Station closest to `point`, ignoring stations with unusable coordinates.
pub fn nearest_station(stations: &[StationRecord], point: GeoPoint) -> Option<&StationRecord> {
    stations
        .iter()
        .filter(|s| s.location.is_valid())
        .map(|s| (s, geo::haversine_km(s.location, point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s)
}

/// Compute a full mission estimate.
///
/// `rate_per_kwh` is the charging station's price; without one the cost is
/// zero and no fast-charge premium applies.
pub fn mission_estimate(
    start: GeoPoint,
    end: GeoPoint,
    battery_level: u8,
    rate_per_kwh: Option<f64>,
    fast_charge: bool,
    config: &PlannerConfig,
) -> MissionEstimate {
    let distance_km = geo::haversine_km(start, end);
    let eta_minutes = distance_km / config.average_speed_kmh * 60.0;
    let used = battery_used_pct(distance_km, config);
    let cost_usd = match rate_per_kwh {
        Some(rate) => charging_cost(used, rate, fast_charge, config),
        None => 0.0,
    };

    MissionEstimate {
        distance_km,
        eta_minutes,
        battery_used_pct: used,
        cost_usd,
        feasible: is_feasible(used, battery_level, config.minimum_reserve_pct),
    }
}
