//! The boundary to whatever actually draws the map.
//!
//! Only [`super::MapRenderer`] talks to a [`MapProvider`]; layers and the
//! route overlay go through the renderer.

use std::cell::Cell;
use std::rc::Rc;

use crate::geo::BoundingBox;
use crate::models::GeoPoint;

/// Provider-side identifier of a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapHandle(pub u64);

/// Provider-side identifier of a single marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderMarker(pub u64);

/// The element the map is mounted into.
#[derive(Debug, Clone, PartialEq)]
pub struct MapContainer {
    pub id: String,
    pub width_px: f64,
    pub height_px: f64,
}

/// Basemap style and the credential needed to fetch it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle<'a> {
    pub url: &'a str,
    pub access_token: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
    Station,
    Drone,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerKind::Station => write!(f, "station"),
            MarkerKind::Drone => write!(f, "drone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

/// Everything a provider needs to style a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerContent {
    pub kind: MarkerKind,
    /// Space separated icon classes, e.g. `"station-marker station-available"`.
    pub class_name: String,
    pub popup: Option<Popup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    pub round_caps: bool,
}

impl LineStyle {
    pub fn route() -> Self {
        LineStyle {
            color: "#06b6d4".to_string(),
            width: 4.0,
            opacity: 0.8,
            round_caps: true,
        }
    }
}

/// One-shot "the map finished loading" flag shared between a provider and
/// the renderer. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct ReadySignal(Rc<Cell<bool>>);

impl ReadySignal {
    pub fn new() -> Self {
        ReadySignal::default()
    }

    pub fn fire(&self) {
        self.0.set(true);
    }

    pub fn is_fired(&self) -> bool {
        self.0.get()
    }
}

/// Operations a map backend has to support.
///
/// Calls arrive strictly in the order the renderer issues them. Removing a
/// marker or layer that does not exist must be harmless.
pub trait MapProvider {
    fn create_map(
        &mut self,
        container: &MapContainer,
        style: &MapStyle<'_>,
        center: GeoPoint,
        zoom: f64,
        pitch: f64,
    ) -> Result<MapHandle, String>;

    /// Fire `signal` once the map has finished loading. May fire immediately.
    fn on_load(&mut self, map: MapHandle, signal: ReadySignal);

    fn add_marker(&mut self, map: MapHandle, point: GeoPoint, content: &MarkerContent)
        -> ProviderMarker;

    fn update_marker(
        &mut self,
        marker: ProviderMarker,
        point: Option<GeoPoint>,
        content: Option<&MarkerContent>,
    );

    fn remove_marker(&mut self, marker: ProviderMarker);

    fn add_line_layer(&mut self, map: MapHandle, id: &str, points: &[GeoPoint], style: &LineStyle);

    fn remove_line_layer(&mut self, map: MapHandle, id: &str);

    fn fit_bounds(&mut self, map: MapHandle, bounds: BoundingBox, padding_px: f64);

    fn set_camera(&mut self, map: MapHandle, center: GeoPoint, zoom: f64, pitch: f64);

    /// Release the map and everything drawn on it.
    fn remove_map(&mut self, map: MapHandle);
}
