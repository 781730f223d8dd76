use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::logger::tracing;
use dioxus::prelude::*;
use dronenet_shared::error::MapError;
use dronenet_shared::map::{
    EntityLayerManager, MapConfig, MapContainer, MapRenderer, Popup, RouteOverlay, SyncReport,
};
use dronenet_shared::models::{GeoPoint, Snapshot};
use dronenet_shared::planner::MissionPlanner;

use crate::coords;
use crate::scene::SceneProvider;

pub const MAP_CONTAINER_ID: &str = "mission-map";

/// Movement below this many pixels is a click, not a drag.
const DRAG_THRESHOLD: f64 = 3.0;

/// Zoom levels per wheel notch.
const ZOOM_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementMode {
    Start,
    End,
}

/// Everything drawn on the mission map, kept together so layers and the
/// route can borrow the renderer mutably.
pub struct MapState {
    pub renderer: MapRenderer<SceneProvider>,
    pub layers: EntityLayerManager,
    pub route: RouteOverlay,
    config: MapConfig,
}

impl MapState {
    pub fn new(config: MapConfig) -> Self {
        MapState {
            renderer: MapRenderer::new(SceneProvider::new(), config.clone()),
            layers: EntityLayerManager::new(),
            route: RouteOverlay::new(),
            config,
        }
    }

    /// Create the map in a laid-out container. The scene has nothing to
    /// download, so loading completes straight away.
    pub fn mount(&mut self, width_px: f64, height_px: f64) -> Result<(), MapError> {
        let container = MapContainer {
            id: MAP_CONTAINER_ID.to_string(),
            width_px,
            height_px,
        };
        self.renderer
            .initialize(Some(&container), self.config.clone())?;
        self.renderer.provider_mut().complete_load();
        self.renderer.poll_ready();
        Ok(())
    }

    /// Mount on the first call with a laid-out size, track resizes after.
    pub fn fit_container(&mut self, width_px: f64, height_px: f64) -> Result<(), MapError> {
        if self.renderer.container().is_some() {
            self.renderer.resize(width_px, height_px);
            Ok(())
        } else {
            self.mount(width_px, height_px)
        }
    }

    pub fn sync(&mut self, snapshot: &Snapshot) -> Result<SyncReport, MapError> {
        let report = self
            .layers
            .sync(&mut self.renderer, &snapshot.stations, &snapshot.drones)?;
        for w in &report.warnings {
            tracing::warn!("{}", w);
        }
        Ok(report)
    }

    pub fn show_selection(&mut self, planner: &MissionPlanner) -> Result<(), MapError> {
        planner.render_route(&mut self.route, &mut self.renderer)
    }

    pub fn size(&self) -> Option<(f64, f64)> {
        self.renderer
            .container()
            .map(|c| (c.width_px, c.height_px))
    }
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn zoom_after_wheel(zoom: f64, delta_y: f64) -> f64 {
    if delta_y < 0.0 {
        zoom + ZOOM_STEP
    } else if delta_y > 0.0 {
        zoom - ZOOM_STEP
    } else {
        zoom
    }
}

/// New camera center after dragging the content by `(dx, dy)` pixels.
fn dragged_center(renderer: &MapRenderer<SceneProvider>, dx: f64, dy: f64) -> Option<GeoPoint> {
    let c = renderer.container()?;
    renderer.unproject(c.width_px / 2.0 - dx, c.height_px / 2.0 - dy)
}

/// Start/end pins drawn over the scene.
fn build_pins_svg(
    project: impl Fn(GeoPoint) -> Option<(f64, f64)>,
    width: f64,
    height: f64,
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" class="pins">"#
    );
    for (label, class, point) in [("A", "pin pin-start", start), ("B", "pin pin-end", end)] {
        let Some((x, y)) = point.and_then(&project) else {
            continue;
        };
        svg.push_str(&format!(
            r#"<g class="{class}"><circle cx="{x:.1}" cy="{y:.1}" r="10"/><text x="{x:.1}" y="{y:.1}" text-anchor="middle" dominant-baseline="central">{label}</text></g>"#
        ));
    }
    svg.push_str("</svg>");
    svg
}

#[component]
pub fn MapView(
    map: Signal<MapState>,
    placement: Signal<PlacementMode>,
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
    on_pick: EventHandler<GeoPoint>,
) -> Element {
    let mut popup = use_signal(|| None::<(f64, f64, Popup)>);

    // Drag state
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut last_drag = use_signal(|| (0.0_f64, 0.0_f64));

    // Runs on mount and again on every layout change of the container, so a
    // container without size at first mount is picked up once it has one.
    let mut fit_to_container = move || {
        let Some((w, h)) = coords::container_size(MAP_CONTAINER_ID) else {
            tracing::debug!("map container is not laid out yet");
            return;
        };
        if let Err(e) = map.write().fit_container(w, h) {
            tracing::warn!("{}", e);
        }
    };

    use_effect(move || fit_to_container());

    use_drop(move || {
        if let Ok(mut m) = map.try_write() {
            m.renderer.teardown();
        }
    });

    let state = map.read();
    let (scene_svg, pins_svg) = match state.size() {
        Some((w, h)) => {
            let r = &state.renderer;
            (
                r.provider().render_svg(|p| r.project(p), w, h),
                build_pins_svg(|p| r.project(p), w, h, start, end),
            )
        }
        None => (String::new(), String::new()),
    };
    let view = state.renderer.view();
    drop(state);

    let mode = *placement.read();
    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else {
        "map-container"
    };

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",
            onmounted: move |_| fit_to_container(),
            onresize: move |_| fit_to_container(),

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let delta_y = wheel_delta_y(evt.data().delta());
                let view = map.read().renderer.view();
                let zoom = zoom_after_wheel(view.zoom, delta_y);
                if let Err(e) = map.write().renderer.set_camera(view.center, zoom, view.pitch) {
                    tracing::warn!("{}", e);
                }
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                last_drag.set((client.x, client.y));
            },

            onmousemove: move |evt: Event<MouseData>| {
                if !*is_dragging.read() {
                    return;
                }
                let client = evt.client_coordinates();
                let (lx, ly) = *last_drag.read();
                let (dx, dy) = (client.x - lx, client.y - ly);
                if !*did_drag.read() && (dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                if *did_drag.read() {
                    let center = dragged_center(&map.read().renderer, dx, dy);
                    if let Some(center) = center {
                        let view = map.read().renderer.view();
                        if let Err(e) = map.write().renderer.set_camera(center, view.zoom, view.pitch) {
                            tracing::warn!("{}", e);
                        }
                    }
                    last_drag.set((client.x, client.y));
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);
                if !was_dragging || was_drag {
                    return;
                }

                let client = evt.client_coordinates();
                let Some((x, y)) = coords::click_to_container(client.x, client.y, MAP_CONTAINER_ID) else {
                    return;
                };
                if popup.read().is_some() {
                    popup.set(None);
                    return;
                }
                let hit = {
                    let state = map.read();
                    let r = &state.renderer;
                    r.provider()
                        .marker_at(|p| r.project(p), x, y)
                        .and_then(|m| m.content.popup.clone())
                };
                if let Some(p) = hit {
                    popup.set(Some((x, y, p)));
                    return;
                }
                let point = map.read().renderer.unproject(x, y);
                if let Some(point) = point {
                    on_pick.call(point);
                }
            },

            onmouseleave: move |_| is_dragging.set(false),

            div { class: "scene-layer", dangerous_inner_html: "{scene_svg}" }
            div { class: "scene-layer pins-layer", dangerous_inner_html: "{pins_svg}" }

            if let Some((x, y, p)) = popup.read().clone() {
                div {
                    class: "map-popup",
                    style: "left: {x}px; top: {y}px;",
                    strong { "{p.title}" }
                    for line in p.lines.iter() {
                        div { "{line}" }
                    }
                }
            }

            div { class: "map-hud",
                span {
                    if mode == PlacementMode::Start { "Click to set start" } else { "Click to set destination" }
                }
                span { class: "map-zoom", "z{view.zoom:.1}" }
            }
        }
    }
}
