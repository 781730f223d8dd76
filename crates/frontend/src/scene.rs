//! Retained in-memory map backend that draws to an SVG string.
//!
//! The renderer owns the camera, so projection is passed in at draw time.

use std::collections::BTreeMap;

use dronenet_shared::geo::BoundingBox;
use dronenet_shared::map::{
    LineStyle, MapContainer, MapHandle, MapProvider, MapStyle, MarkerContent, MarkerKind, Popup,
    ProviderMarker, ReadySignal,
};
use dronenet_shared::models::GeoPoint;

/// Marker hit radius for popups, in screen pixels.
pub const HIT_RADIUS_PX: f64 = 14.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneMarker {
    pub point: GeoPoint,
    pub content: MarkerContent,
}

#[derive(Debug, Clone, PartialEq)]
struct SceneLine {
    id: String,
    points: Vec<GeoPoint>,
    style: LineStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneMap {
    pub handle: MapHandle,
    pub container: MapContainer,
    pub style_url: String,
}

#[derive(Debug, Default)]
pub struct SceneProvider {
    map: Option<SceneMap>,
    next_id: u64,
    markers: BTreeMap<u64, SceneMarker>,
    lines: Vec<SceneLine>,
    load_signal: Option<ReadySignal>,
    loaded: bool,
}

impl SceneProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self) -> Option<&SceneMap> {
        self.map.as_ref()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Called by the host once the canvas is mounted. Fires the signal
    /// registered through `on_load`, or the next one if none is registered yet.
    pub fn complete_load(&mut self) {
        if self.map.is_none() {
            return;
        }
        self.loaded = true;
        if let Some(signal) = self.load_signal.take() {
            signal.fire();
        }
    }

    /// Topmost marker within [`HIT_RADIUS_PX`] of a screen point.
    pub fn marker_at(
        &self,
        project: impl Fn(GeoPoint) -> Option<(f64, f64)>,
        x: f64,
        y: f64,
    ) -> Option<&SceneMarker> {
        let mut best: Option<(&SceneMarker, f64)> = None;
        for m in self.markers.values() {
            let Some((mx, my)) = project(m.point) else {
                continue;
            };
            let d = ((mx - x).powi(2) + (my - y).powi(2)).sqrt();
            // Later markers draw on top, so ties go to them.
            if d <= HIT_RADIUS_PX && best.map_or(true, |(_, bd)| d <= bd) {
                best = Some((m, d));
            }
        }
        best.map(|(m, _)| m)
    }

    /// Full SVG for the current scene. Markers use their class names so the
    /// stylesheet decides colors.
    pub fn render_svg(
        &self,
        project: impl Fn(GeoPoint) -> Option<(f64, f64)>,
        width: f64,
        height: f64,
    ) -> String {
        let mut svg = String::with_capacity(4096);
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" class="scene">"#
        ));
        svg.push_str(&format!(
            r#"<rect class="scene-bg" x="0" y="0" width="{width}" height="{height}"/>"#
        ));
        if self.map.is_none() {
            svg.push_str("</svg>");
            return svg;
        }

        for line in &self.lines {
            build_line(&mut svg, line, &project);
        }
        for m in self.markers.values() {
            if let Some((x, y)) = project(m.point) {
                build_marker(&mut svg, m, x, y);
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

fn build_line(svg: &mut String, line: &SceneLine, project: &impl Fn(GeoPoint) -> Option<(f64, f64)>) {
    let pts: Vec<String> = line
        .points
        .iter()
        .filter_map(|p| project(*p))
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect();
    if pts.len() < 2 {
        return;
    }
    let cap = if line.style.round_caps { "round" } else { "butt" };
    let join = if line.style.round_caps { "round" } else { "miter" };
    svg.push_str(&format!(
        r#"<polyline data-layer="{}" points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-linecap="{cap}" stroke-linejoin="{join}"/>"#,
        escape(&line.id),
        pts.join(" "),
        escape(&line.style.color),
        line.style.width,
        line.style.opacity,
    ));
}

fn build_marker(svg: &mut String, m: &SceneMarker, x: f64, y: f64) {
    let class = escape(&m.content.class_name);
    svg.push_str(r#"<g role="img">"#);
    if let Some(popup) = &m.content.popup {
        svg.push_str(&format!("<title>{}</title>", escape(&popup_text(popup))));
    }
    match m.content.kind {
        MarkerKind::Station => svg.push_str(&format!(
            r#"<rect class="{class}" x="{:.1}" y="{:.1}" width="16" height="16" rx="4"/>"#,
            x - 8.0,
            y - 8.0
        )),
        MarkerKind::Drone => svg.push_str(&format!(
            r#"<circle class="{class}" cx="{x:.1}" cy="{y:.1}" r="7"/>"#
        )),
    }
    svg.push_str("</g>");
}

fn popup_text(popup: &Popup) -> String {
    let mut text = popup.title.clone();
    for line in &popup.lines {
        text.push('\n');
        text.push_str(line);
    }
    text
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl MapProvider for SceneProvider {
    fn create_map(
        &mut self,
        container: &MapContainer,
        style: &MapStyle<'_>,
        _center: GeoPoint,
        _zoom: f64,
        _pitch: f64,
    ) -> Result<MapHandle, String> {
        if self.map.is_some() {
            return Err("scene already holds a map".to_string());
        }
        self.next_id += 1;
        let handle = MapHandle(self.next_id);
        self.map = Some(SceneMap {
            handle,
            container: container.clone(),
            style_url: style.url.to_string(),
        });
        self.loaded = false;
        Ok(handle)
    }

    fn on_load(&mut self, _map: MapHandle, signal: ReadySignal) {
        if self.loaded {
            signal.fire();
        } else {
            self.load_signal = Some(signal);
        }
    }

    fn add_marker(&mut self, _map: MapHandle, point: GeoPoint, content: &MarkerContent) -> ProviderMarker {
        self.next_id += 1;
        self.markers.insert(
            self.next_id,
            SceneMarker {
                point,
                content: content.clone(),
            },
        );
        ProviderMarker(self.next_id)
    }

    fn update_marker(
        &mut self,
        marker: ProviderMarker,
        point: Option<GeoPoint>,
        content: Option<&MarkerContent>,
    ) {
        if let Some(m) = self.markers.get_mut(&marker.0) {
            if let Some(p) = point {
                m.point = p;
            }
            if let Some(c) = content {
                m.content = c.clone();
            }
        }
    }

    fn remove_marker(&mut self, marker: ProviderMarker) {
        self.markers.remove(&marker.0);
    }

    fn add_line_layer(&mut self, _map: MapHandle, id: &str, points: &[GeoPoint], style: &LineStyle) {
        self.lines.retain(|l| l.id != id);
        self.lines.push(SceneLine {
            id: id.to_string(),
            points: points.to_vec(),
            style: style.clone(),
        });
    }

    fn remove_line_layer(&mut self, _map: MapHandle, id: &str) {
        self.lines.retain(|l| l.id != id);
    }

    // The camera lives in the renderer and is applied at draw time.
    fn fit_bounds(&mut self, _map: MapHandle, _bounds: BoundingBox, _padding_px: f64) {}

    fn set_camera(&mut self, _map: MapHandle, _center: GeoPoint, _zoom: f64, _pitch: f64) {}

    fn remove_map(&mut self, _map: MapHandle) {
        self.map = None;
        self.markers.clear();
        self.lines.clear();
        self.load_signal = None;
        self.loaded = false;
    }
}
