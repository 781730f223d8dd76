use std::collections::{BTreeMap, HashSet};

use super::provider::{MapProvider, MarkerContent, MarkerKind, Popup};
use super::renderer::{MapRenderer, MarkerId};
use crate::error::MapError;
use crate::models::{DroneRecord, GeoPoint, StationRecord};

/// Registry key: entity kind plus the entity's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: MarkerKind,
    pub id: String,
}

/// One rendered entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub entity_id: String,
    pub kind: MarkerKind,
    pub handle: MarkerId,
    pub point: GeoPoint,
    pub content: MarkerContent,
}

/// What a [`EntityLayerManager::sync`] call changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entities skipped because of bad data. The rest of the sync still ran.
    pub warnings: Vec<MapError>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Marker styling for a charging station.
pub fn station_content(station: &StationRecord) -> MarkerContent {
    MarkerContent {
        kind: MarkerKind::Station,
        class_name: format!("station-marker station-{}", station.availability),
        popup: Some(Popup {
            title: station.name.clone(),
            lines: vec![
                station.availability.to_string(),
                format!("${:.2}/kWh", station.price_per_kwh),
                format!(
                    "{}/{} slots free",
                    station.available_slots, station.total_slots
                ),
            ],
        }),
    }
}

/// Marker styling for a drone. Battery level only matters by band.
pub fn drone_content(drone: &DroneRecord) -> MarkerContent {
    MarkerContent {
        kind: MarkerKind::Drone,
        class_name: format!(
            "drone-marker drone-{} battery-{}",
            drone.status,
            drone.battery_band().as_str()
        ),
        popup: None,
    }
}

/// Keeps the markers on a [`MapRenderer`] equal to the latest snapshot.
///
/// The registry here is the only record of what is drawn; markers are keyed
/// by entity so a changed entity is updated in place rather than redrawn.
#[derive(Debug, Default)]
pub struct EntityLayerManager {
    registry: BTreeMap<EntityKey, MarkerEntry>,
    session: Option<u64>,
}

impl EntityLayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.registry.len()
    }

    pub fn entry(&self, kind: MarkerKind, id: &str) -> Option<&MarkerEntry> {
        self.registry.get(&EntityKey {
            kind,
            id: id.to_string(),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.registry.values()
    }

    /// Reconcile the drawn markers with `stations` and `drones`.
    pub fn sync<P: MapProvider>(
        &mut self,
        renderer: &mut MapRenderer<P>,
        stations: &[StationRecord],
        drones: &[DroneRecord],
    ) -> Result<SyncReport, MapError> {
        if !renderer.accepts_commands() {
            return Err(MapError::NotReady);
        }
        self.adopt_session(renderer);

        let mut report = SyncReport::default();
        let mut seen = HashSet::new();
        let mut desired: Vec<(EntityKey, GeoPoint, MarkerContent)> =
            Vec::with_capacity(stations.len() + drones.len());

        let stations = stations
            .iter()
            .map(|s| (MarkerKind::Station, &s.id, Some(s.location), station_content(s)));
        let drones = drones
            .iter()
            .map(|d| (MarkerKind::Drone, &d.id, d.location, drone_content(d)));

        for (kind, id, location, content) in stations.chain(drones) {
            // Untracked drones have nothing to draw.
            let Some(point) = location else { continue };
            if !point.is_valid() {
                report.warnings.push(MapError::InvalidLocation {
                    entity: format!("{kind} {id}"),
                    lat: point.lat,
                    lng: point.lng,
                });
                continue;
            }
            let key = EntityKey {
                kind,
                id: id.clone(),
            };
            if !seen.insert(key.clone()) {
                report.warnings.push(MapError::DuplicateEntity {
                    kind,
                    id: id.clone(),
                });
                continue;
            }
            desired.push((key, point, content));
        }

        let stale: Vec<EntityKey> = self
            .registry
            .keys()
            .filter(|k| !seen.contains(*k))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = self.registry.remove(&key) {
                renderer.remove_marker(entry.handle)?;
                report.removed += 1;
            }
        }

        for (key, point, content) in desired {
            match self.registry.get_mut(&key) {
                Some(entry) => {
                    let moved = entry.point != point;
                    let restyled = entry.content != content;
                    if !moved && !restyled {
                        continue;
                    }
                    renderer.update_marker(
                        entry.handle,
                        moved.then_some(point),
                        restyled.then(|| content.clone()),
                    )?;
                    entry.point = point;
                    entry.content = content;
                    report.updated += 1;
                }
                None => {
                    let handle = renderer.add_marker(point, content.clone())?;
                    self.registry.insert(
                        key.clone(),
                        MarkerEntry {
                            entity_id: key.id,
                            kind: key.kind,
                            handle,
                            point,
                            content,
                        },
                    );
                    report.added += 1;
                }
            }
        }

        for warning in &report.warnings {
            tracing::warn!(%warning, "skipped entity during marker sync");
        }
        if !report.is_noop() {
            tracing::debug!(
                added = report.added,
                updated = report.updated,
                removed = report.removed,
                total = self.registry.len(),
                "markers synced"
            );
        }
        Ok(report)
    }

    /// Remove every marker this manager owns.
    pub fn clear<P: MapProvider>(&mut self, renderer: &mut MapRenderer<P>) -> Result<usize, MapError> {
        if !renderer.accepts_commands() {
            return Err(MapError::NotReady);
        }
        self.adopt_session(renderer);
        let removed = self.registry.len();
        for (_, entry) in std::mem::take(&mut self.registry) {
            renderer.remove_marker(entry.handle)?;
        }
        Ok(removed)
    }

    /// A torn-down map took its markers with it; start from scratch.
    fn adopt_session<P: MapProvider>(&mut self, renderer: &MapRenderer<P>) {
        if self.session != Some(renderer.session()) {
            self.registry.clear();
            self.session = Some(renderer.session());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::renderer::MapConfig;
    use crate::map::testing::{container, Call, RecordingProvider};
    use crate::models::{Availability, DroneStatus};

    fn station(id: &str, lat: f64, lng: f64) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            name: format!("{id} name"),
            location: GeoPoint::new(lat, lng),
            price_per_kwh: 0.15,
            availability: Availability::Available,
            total_slots: 4,
            available_slots: 2,
            owner: String::new(),
            rating: 0.0,
        }
    }

    fn drone(id: &str, location: Option<GeoPoint>, status: DroneStatus) -> DroneRecord {
        DroneRecord {
            id: id.to_string(),
            name: String::new(),
            model: String::new(),
            battery_level: 85,
            status,
            flight_time_min: 0,
            location,
        }
    }

    fn sample() -> (Vec<StationRecord>, Vec<DroneRecord>) {
        (
            vec![
                station("station-1", 40.7812, -73.9665),
                station("station-2", 40.7061, -73.9969),
                station("station-3", 40.7580, -73.9855),
            ],
            vec![
                drone("drone-1", Some(GeoPoint::new(40.7831, -73.9712)), DroneStatus::Idle),
                drone("drone-2", Some(GeoPoint::new(40.7689, -73.9441)), DroneStatus::Flying),
                drone("drone-3", None, DroneStatus::Charging),
            ],
        )
    }

    fn ready() -> MapRenderer<RecordingProvider> {
        let mut r = MapRenderer::new(RecordingProvider::loading_immediately(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        r
    }

    #[test]
    fn test_sync_adds_one_marker_per_renderable_entity() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(report.added, 5);
        assert_eq!(layers.marker_count(), 5);
        assert_eq!(r.marker_count(), 5);
        assert!(layers.entry(MarkerKind::Drone, "drone-3").is_none());
        let popup = layers
            .entry(MarkerKind::Station, "station-1")
            .and_then(|e| e.content.popup.clone())
            .unwrap();
        assert_eq!(popup.title, "station-1 name");
        assert!(popup.lines.contains(&"$0.15/kWh".to_string()));
    }

    #[test]
    fn test_sync_twice_issues_no_provider_calls() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        let calls = r.provider().calls.len();
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert!(report.is_noop());
        assert_eq!(r.provider().calls.len(), calls);
    }

    #[test]
    fn test_changed_entity_is_updated_in_place() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, mut drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        let handle = layers.entry(MarkerKind::Drone, "drone-1").unwrap().handle;

        drones[0].location = Some(GeoPoint::new(40.7800, -73.9700));
        drones[0].status = DroneStatus::Flying;
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!((report.added, report.updated, report.removed), (0, 1, 0));
        let entry = layers.entry(MarkerKind::Drone, "drone-1").unwrap();
        assert_eq!(entry.handle, handle);
        assert!(entry.content.class_name.contains("drone-flying"));
        assert!(matches!(
            r.provider().calls.last(),
            Some(Call::UpdateMarker { point: Some(_), class: Some(_), .. })
        ));
        assert_eq!(r.provider().count(|c| matches!(c, Call::RemoveMarker { .. })), 0);
    }

    #[test]
    fn test_restyle_only_sends_content() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (mut stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        stations[1].availability = Availability::Maintenance;
        layers.sync(&mut r, &stations, &drones).unwrap();
        assert!(matches!(
            r.provider().calls.last(),
            Some(Call::UpdateMarker { point: None, class: Some(c), .. }) if c.contains("station-maintenance")
        ));
    }

    #[test]
    fn test_omitted_entity_is_removed() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (mut stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        stations.remove(1);
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(report.removed, 1);
        assert!(layers.entry(MarkerKind::Station, "station-2").is_none());
        assert_eq!(layers.marker_count(), 4);
        assert_eq!(r.provider().live_markers.len(), 4);
    }

    #[test]
    fn test_empty_station_list_leaves_only_drones() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        layers.sync(&mut r, &[], &drones).unwrap();
        assert_eq!(layers.marker_count(), 2);
        assert!(layers.entries().all(|e| e.kind == MarkerKind::Drone));
    }

    #[test]
    fn test_drone_losing_location_is_removed() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, mut drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        drones[1].location = None;
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(report.removed, 1);
        assert!(report.warnings.is_empty());
        assert!(layers.entry(MarkerKind::Drone, "drone-2").is_none());
    }

    #[test]
    fn test_invalid_location_is_skipped_and_reported() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (mut stations, drones) = sample();
        stations[0].location = GeoPoint::new(200.0, 0.0);
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(report.added, 4);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            MapError::InvalidLocation { entity, .. } if entity == "station station-1"
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let stations = vec![
            station("dup", 40.0, -73.0),
            station("dup", 41.0, -74.0),
        ];
        let report = layers.sync(&mut r, &stations, &[]).unwrap();
        assert_eq!(layers.marker_count(), 1);
        assert_eq!(
            layers.entry(MarkerKind::Station, "dup").unwrap().point,
            GeoPoint::new(40.0, -73.0)
        );
        assert!(matches!(report.warnings[0], MapError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_station_and_drone_may_share_an_id() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let stations = vec![station("x", 40.0, -73.0)];
        let drones = vec![drone("x", Some(GeoPoint::new(40.1, -73.1)), DroneStatus::Idle)];
        layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(layers.marker_count(), 2);
    }

    #[test]
    fn test_sync_before_ready_is_buffered() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(r.provider().marker_calls(), 0);

        r.provider().fire_load();
        r.poll_ready();
        assert_eq!(r.provider().live_markers.len(), 5);
        let calls = r.provider().calls.len();
        layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(r.provider().calls.len(), calls);
    }

    #[test]
    fn test_sync_not_ready_without_buffering() {
        let config = MapConfig {
            buffer_before_ready: false,
            ..MapConfig::default()
        };
        let mut r = MapRenderer::new(RecordingProvider::default(), config.clone());
        r.initialize(Some(&container()), config).unwrap();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        assert_eq!(
            layers.sync(&mut r, &stations, &drones),
            Err(MapError::NotReady)
        );
        assert_eq!(layers.marker_count(), 0);
    }

    #[test]
    fn test_registry_resets_after_teardown() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        r.teardown();
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let report = layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(report.added, 5);
        assert_eq!(r.provider().live_markers.len(), 5);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut r = ready();
        let mut layers = EntityLayerManager::new();
        let (stations, drones) = sample();
        layers.sync(&mut r, &stations, &drones).unwrap();
        assert_eq!(layers.clear(&mut r).unwrap(), 5);
        assert_eq!(layers.marker_count(), 0);
        assert!(r.provider().live_markers.is_empty());
    }
}
