//! In-memory provider that records every call, for unit tests.

use super::provider::{
    LineStyle, MapContainer, MapHandle, MapProvider, MapStyle, MarkerContent, ProviderMarker,
    ReadySignal,
};
use crate::geo::BoundingBox;
use crate::models::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateMap,
    OnLoad,
    AddMarker { point: GeoPoint, class: String },
    UpdateMarker { marker: ProviderMarker, point: Option<GeoPoint>, class: Option<String> },
    RemoveMarker { marker: ProviderMarker },
    AddLineLayer { id: String, points: Vec<GeoPoint> },
    RemoveLineLayer { id: String },
    FitBounds { bounds: BoundingBox, padding: f64 },
    SetCamera { center: GeoPoint, zoom: f64 },
    RemoveMap,
}

#[derive(Default)]
pub struct RecordingProvider {
    pub calls: Vec<Call>,
    pub fail_create: bool,
    fire_on_load: bool,
    signal: Option<ReadySignal>,
    next_marker: u64,
    pub live_markers: Vec<ProviderMarker>,
    pub live_layers: Vec<String>,
}

impl RecordingProvider {
    /// A provider whose map reports loaded as soon as it is created.
    pub fn loading_immediately() -> Self {
        RecordingProvider {
            fire_on_load: true,
            ..Default::default()
        }
    }

    pub fn fire_load(&self) {
        if let Some(s) = &self.signal {
            s.fire();
        }
    }

    pub fn marker_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::AddMarker { .. } | Call::UpdateMarker { .. } | Call::RemoveMarker { .. }
                )
            })
            .count()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl MapProvider for RecordingProvider {
    fn create_map(
        &mut self,
        _container: &MapContainer,
        _style: &MapStyle<'_>,
        _center: GeoPoint,
        _zoom: f64,
        _pitch: f64,
    ) -> Result<MapHandle, String> {
        if self.fail_create {
            return Err("provider unavailable".to_string());
        }
        self.calls.push(Call::CreateMap);
        Ok(MapHandle(1))
    }

    fn on_load(&mut self, _map: MapHandle, signal: ReadySignal) {
        self.calls.push(Call::OnLoad);
        if self.fire_on_load {
            signal.fire();
        }
        self.signal = Some(signal);
    }

    fn add_marker(&mut self, _map: MapHandle, point: GeoPoint, content: &MarkerContent) -> ProviderMarker {
        self.next_marker += 1;
        let m = ProviderMarker(self.next_marker);
        self.live_markers.push(m);
        self.calls.push(Call::AddMarker {
            point,
            class: content.class_name.clone(),
        });
        m
    }

    fn update_marker(
        &mut self,
        marker: ProviderMarker,
        point: Option<GeoPoint>,
        content: Option<&MarkerContent>,
    ) {
        self.calls.push(Call::UpdateMarker {
            marker,
            point,
            class: content.map(|c| c.class_name.clone()),
        });
    }

    fn remove_marker(&mut self, marker: ProviderMarker) {
        self.live_markers.retain(|m| *m != marker);
        self.calls.push(Call::RemoveMarker { marker });
    }

    fn add_line_layer(&mut self, _map: MapHandle, id: &str, points: &[GeoPoint], _style: &LineStyle) {
        self.live_layers.push(id.to_string());
        self.calls.push(Call::AddLineLayer {
            id: id.to_string(),
            points: points.to_vec(),
        });
    }

    fn remove_line_layer(&mut self, _map: MapHandle, id: &str) {
        self.live_layers.retain(|l| l != id);
        self.calls.push(Call::RemoveLineLayer { id: id.to_string() });
    }

    fn fit_bounds(&mut self, _map: MapHandle, bounds: BoundingBox, padding_px: f64) {
        self.calls.push(Call::FitBounds {
            bounds,
            padding: padding_px,
        });
    }

    fn set_camera(&mut self, _map: MapHandle, center: GeoPoint, zoom: f64, _pitch: f64) {
        self.calls.push(Call::SetCamera { center, zoom });
    }

    fn remove_map(&mut self, _map: MapHandle) {
        self.live_markers.clear();
        self.live_layers.clear();
        self.calls.push(Call::RemoveMap);
    }
}

pub fn container() -> MapContainer {
    MapContainer {
        id: "mission-map".to_string(),
        width_px: 800.0,
        height_px: 600.0,
    }
}
