use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::provider::{
    LineStyle, MapContainer, MapHandle, MapProvider, MapStyle, MarkerContent, ProviderMarker,
    ReadySignal,
};
use crate::error::MapError;
use crate::geo::{self, BoundingBox, Camera, Viewport};
use crate::models::GeoPoint;

/// Float tolerance for camera comparisons.
const CAMERA_EPSILON: f64 = 1e-9;

/// Steepest pitch map providers accept, in degrees.
pub const MAX_PITCH: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub style: String,
    pub access_token: Option<String>,
    pub center: GeoPoint,
    pub zoom: f64,
    pub pitch: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Queue marker/overlay/camera commands until the map is loaded. When
    /// off, those commands fail with [`MapError::NotReady`] instead.
    pub buffer_before_ready: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            style: "mapbox://styles/mapbox/dark-v11".to_string(),
            access_token: None,
            center: GeoPoint::new(40.7831, -73.9712),
            zoom: 12.0,
            pitch: 45.0,
            min_zoom: 0.0,
            max_zoom: 22.0,
            buffer_before_ready: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewState {
    pub center: GeoPoint,
    pub zoom: f64,
    pub pitch: f64,
    pub loaded: bool,
}

/// Generational index of a marker owned by a [`MapRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
enum SlotState {
    Vacant,
    /// Allocated before the map was ready; its add command is still queued.
    Pending,
    Live(ProviderMarker),
}

#[derive(Debug)]
struct MarkerSlot {
    generation: u32,
    state: SlotState,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    AddMarker {
        id: MarkerId,
        point: GeoPoint,
        content: MarkerContent,
    },
    UpdateMarker {
        id: MarkerId,
        point: Option<GeoPoint>,
        content: Option<MarkerContent>,
    },
    AddLineLayer {
        id: String,
        points: Vec<GeoPoint>,
        style: LineStyle,
    },
    RemoveLineLayer {
        id: String,
    },
    FitBounds {
        bounds: BoundingBox,
        padding_px: f64,
    },
    SetCamera {
        center: GeoPoint,
        zoom: f64,
        pitch: f64,
    },
}

impl Command {
    fn targets(&self, marker: MarkerId) -> bool {
        match self {
            Command::AddMarker { id, .. } | Command::UpdateMarker { id, .. } => *id == marker,
            _ => false,
        }
    }
}

/// Camera the command queue will leave behind once flushed.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CameraTarget {
    /// Nothing camera-related is queued; the view is the target.
    Current,
    Queued {
        center: GeoPoint,
        zoom: f64,
        pitch: f64,
    },
    /// A fit is queued that cannot be resolved without a container.
    Unresolved,
}

enum Phase {
    Idle,
    Loading { map: MapHandle, signal: ReadySignal },
    Ready { map: MapHandle },
}

type ReadyCallback<P> = Box<dyn FnOnce(&mut MapRenderer<P>)>;

/// Owns one map instance: camera, readiness, and every marker and line
/// layer drawn on it.
pub struct MapRenderer<P: MapProvider> {
    provider: P,
    config: MapConfig,
    phase: Phase,
    container: Option<MapContainer>,
    view: MapViewState,
    session: u64,
    markers: Vec<MarkerSlot>,
    free: Vec<u32>,
    line_layers: BTreeSet<String>,
    queue: VecDeque<Command>,
    target: CameraTarget,
    ready_callbacks: Vec<ReadyCallback<P>>,
}

impl<P: MapProvider> MapRenderer<P> {
    pub fn new(provider: P, config: MapConfig) -> Self {
        let view = MapViewState {
            center: config.center,
            zoom: config.zoom,
            pitch: config.pitch,
            loaded: false,
        };
        MapRenderer {
            provider,
            config,
            phase: Phase::Idle,
            container: None,
            view,
            session: 0,
            markers: Vec::new(),
            free: Vec::new(),
            line_layers: BTreeSet::new(),
            queue: VecDeque::new(),
            target: CameraTarget::Current,
            ready_callbacks: Vec::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn view(&self) -> MapViewState {
        self.view
    }

    pub fn container(&self) -> Option<&MapContainer> {
        self.container.as_ref()
    }

    /// Incremented by every [`MapRenderer::teardown`] that released a map.
    /// Layers compare it to notice that their markers are gone.
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready { .. })
    }

    /// Number of markers currently allocated (drawn or waiting to be drawn).
    pub fn marker_count(&self) -> usize {
        self.markers
            .iter()
            .filter(|s| !matches!(s.state, SlotState::Vacant))
            .count()
    }

    pub fn line_layer_ids(&self) -> impl Iterator<Item = &str> {
        self.line_layers.iter().map(String::as_str)
    }

    /// Number of commands waiting for the map to load.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Mount the map. Returns as soon as the provider has started loading.
    pub fn initialize(
        &mut self,
        container: Option<&MapContainer>,
        config: MapConfig,
    ) -> Result<(), MapError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(MapError::Init("map is already initialized".to_string()));
        }
        let container =
            container.ok_or_else(|| MapError::Init("map container is missing".to_string()))?;
        if container.id.is_empty() {
            return Err(MapError::Init("map container has no id".to_string()));
        }
        if !(container.width_px > 0.0 && container.height_px > 0.0) {
            return Err(MapError::Init(format!(
                "map container {} has no area ({}x{})",
                container.id, container.width_px, container.height_px
            )));
        }
        if !config.center.is_valid() {
            return Err(MapError::Init(format!(
                "initial center {} is out of range",
                config.center
            )));
        }

        let style = MapStyle {
            url: &config.style,
            access_token: config.access_token.as_deref(),
        };
        let map = self
            .provider
            .create_map(container, &style, config.center, config.zoom, config.pitch)
            .map_err(MapError::Init)?;

        let signal = ReadySignal::new();
        self.provider.on_load(map, signal.clone());

        self.view = MapViewState {
            center: config.center,
            zoom: config.zoom,
            pitch: config.pitch,
            loaded: false,
        };
        self.config = config;
        self.container = Some(container.clone());
        self.phase = Phase::Loading { map, signal };
        tracing::debug!(container = %container.id, "map initializing");

        self.poll_ready();
        Ok(())
    }

    /// Run `callback` once the map is loaded; right away if it already is.
    pub fn on_ready(&mut self, callback: impl FnOnce(&mut MapRenderer<P>) + 'static) {
        if self.poll_ready() {
            callback(self);
        } else {
            self.ready_callbacks.push(Box::new(callback));
        }
    }

    /// Observe the provider's load signal. On the first observation the
    /// buffered commands are replayed in order, then ready callbacks run.
    pub fn poll_ready(&mut self) -> bool {
        let map = match &self.phase {
            Phase::Ready { .. } => return true,
            Phase::Idle => return false,
            Phase::Loading { map, signal } => {
                if !signal.is_fired() {
                    return false;
                }
                *map
            }
        };

        self.phase = Phase::Ready { map };
        self.view.loaded = true;
        let flushed = self.queue.len();
        while let Some(cmd) = self.queue.pop_front() {
            self.execute(map, cmd);
        }
        self.target = CameraTarget::Current;
        tracing::debug!(flushed, "map ready");

        for callback in std::mem::take(&mut self.ready_callbacks) {
            callback(self);
        }
        true
    }

    pub fn set_camera(&mut self, center: GeoPoint, zoom: f64, pitch: f64) -> Result<(), MapError> {
        if !center.is_valid() {
            return Err(MapError::InvalidLocation {
                entity: "camera".to_string(),
                lat: center.lat,
                lng: center.lng,
            });
        }
        if !zoom.is_finite() || !pitch.is_finite() {
            return Err(MapError::InvalidCamera { zoom, pitch });
        }
        let zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        let pitch = pitch.clamp(0.0, MAX_PITCH);
        let current = match self.target {
            CameraTarget::Current => Some((self.view.center, self.view.zoom, self.view.pitch)),
            CameraTarget::Queued {
                center,
                zoom,
                pitch,
            } => Some((center, zoom, pitch)),
            CameraTarget::Unresolved => None,
        };
        if let Some((c, z, p)) = current {
            if c.approx_eq(&center, CAMERA_EPSILON)
                && (z - zoom).abs() <= CAMERA_EPSILON
                && (p - pitch).abs() <= CAMERA_EPSILON
            {
                return Ok(());
            }
        }
        self.submit(Command::SetCamera {
            center,
            zoom,
            pitch,
        })
    }

    /// Move the camera so every point is visible with `padding_px` to spare.
    pub fn fit_bounds(
        &mut self,
        points: &[GeoPoint],
        padding_px: f64,
    ) -> Result<BoundingBox, MapError> {
        let bounds = BoundingBox::from_points(points).ok_or(MapError::EmptyBounds)?;
        if let Some(p) = points.iter().find(|p| !p.is_valid()) {
            return Err(MapError::InvalidLocation {
                entity: "bounds".to_string(),
                lat: p.lat,
                lng: p.lng,
            });
        }
        self.submit(Command::FitBounds {
            bounds,
            padding_px: padding_px.max(0.0),
        })?;
        Ok(bounds)
    }

    /// Geographic footprint of the current camera, once mounted.
    pub fn visible_bounds(&self) -> Option<BoundingBox> {
        let vp = self.viewport()?;
        Some(self.camera().visible_bounds(vp))
    }

    /// Container pixel position of `point` under the current camera.
    pub fn project(&self, point: GeoPoint) -> Option<(f64, f64)> {
        let vp = self.viewport()?;
        Some(self.camera().project(vp, point))
    }

    /// Geographic point under container pixel `(x, y)`.
    pub fn unproject(&self, x: f64, y: f64) -> Option<GeoPoint> {
        let vp = self.viewport()?;
        Some(self.camera().unproject(vp, x, y))
    }

    /// Track a new container size (window resize).
    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        if let Some(c) = self.container.as_mut() {
            if width_px > 0.0 && height_px > 0.0 {
                c.width_px = width_px;
                c.height_px = height_px;
            }
        }
    }

    /// Release the map and drop everything waiting for it. Safe to call
    /// repeatedly.
    pub fn teardown(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.target = CameraTarget::Current;
        self.ready_callbacks.clear();

        let map = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Loading { map, .. } | Phase::Ready { map } => Some(map),
        };
        let had_markers = self.marker_count() > 0;
        for (index, slot) in self.markers.iter_mut().enumerate() {
            if !matches!(slot.state, SlotState::Vacant) {
                slot.state = SlotState::Vacant;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.line_layers.clear();
        self.view.loaded = false;
        self.container = None;

        if map.is_some() || had_markers || dropped > 0 {
            self.session += 1;
        }
        if let Some(map) = map {
            self.provider.remove_map(map);
            tracing::debug!(dropped, "map torn down");
        }
    }

    // -- crate-private drawing API used by the layers -------------------------

    /// Whether a drawing command issued now would be accepted.
    pub(crate) fn accepts_commands(&mut self) -> bool {
        self.poll_ready() || self.config.buffer_before_ready
    }

    pub(crate) fn add_marker(
        &mut self,
        point: GeoPoint,
        content: MarkerContent,
    ) -> Result<MarkerId, MapError> {
        if !self.accepts_commands() {
            return Err(MapError::NotReady);
        }
        let id = self.alloc_slot();
        match self.phase {
            Phase::Ready { map } => {
                let handle = self.provider.add_marker(map, point, &content);
                self.markers[id.index as usize].state = SlotState::Live(handle);
            }
            _ => self.queue.push_back(Command::AddMarker { id, point, content }),
        }
        Ok(id)
    }

    pub(crate) fn update_marker(
        &mut self,
        id: MarkerId,
        point: Option<GeoPoint>,
        content: Option<MarkerContent>,
    ) -> Result<bool, MapError> {
        if !self.accepts_commands() {
            return Err(MapError::NotReady);
        }
        if point.is_none() && content.is_none() {
            return Ok(self.slot(id).is_some());
        }
        match self.slot(id).map(|s| &s.state) {
            Some(SlotState::Live(handle)) => {
                let handle = *handle;
                self.provider.update_marker(handle, point, content.as_ref());
                Ok(true)
            }
            Some(SlotState::Pending) => {
                self.queue
                    .push_back(Command::UpdateMarker { id, point, content });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn remove_marker(&mut self, id: MarkerId) -> Result<bool, MapError> {
        if !self.accepts_commands() {
            return Err(MapError::NotReady);
        }
        let Some(slot) = self.slot(id) else {
            return Ok(false);
        };
        match slot.state {
            SlotState::Live(handle) => self.provider.remove_marker(handle),
            // Never reached the provider: cancel its queued commands instead.
            SlotState::Pending => self.queue.retain(|c| !c.targets(id)),
            SlotState::Vacant => return Ok(false),
        }
        let slot = &mut self.markers[id.index as usize];
        slot.state = SlotState::Vacant;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Ok(true)
    }

    pub(crate) fn add_line_layer(
        &mut self,
        id: &str,
        points: Vec<GeoPoint>,
        style: LineStyle,
    ) -> Result<(), MapError> {
        if !self.accepts_commands() {
            return Err(MapError::NotReady);
        }
        if self.line_layers.contains(id) {
            self.submit(Command::RemoveLineLayer { id: id.to_string() })?;
        }
        self.line_layers.insert(id.to_string());
        self.submit(Command::AddLineLayer {
            id: id.to_string(),
            points,
            style,
        })
    }

    pub(crate) fn remove_line_layer(&mut self, id: &str) -> Result<bool, MapError> {
        if !self.accepts_commands() {
            return Err(MapError::NotReady);
        }
        if !self.line_layers.remove(id) {
            return Ok(false);
        }
        self.submit(Command::RemoveLineLayer { id: id.to_string() })?;
        Ok(true)
    }

    // -- internals ------------------------------------------------------------

    fn viewport(&self) -> Option<Viewport> {
        self.container.as_ref().map(|c| Viewport {
            width: c.width_px,
            height: c.height_px,
        })
    }

    fn camera(&self) -> Camera {
        Camera {
            center: self.view.center,
            zoom: self.view.zoom,
        }
    }

    fn slot(&self, id: MarkerId) -> Option<&MarkerSlot> {
        self.markers
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
    }

    fn alloc_slot(&mut self) -> MarkerId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.markers[index as usize];
            slot.state = SlotState::Pending;
            return MarkerId {
                index,
                generation: slot.generation,
            };
        }
        self.markers.push(MarkerSlot {
            generation: 0,
            state: SlotState::Pending,
        });
        MarkerId {
            index: (self.markers.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Execute now when ready, buffer when allowed, reject otherwise.
    fn submit(&mut self, cmd: Command) -> Result<(), MapError> {
        if self.poll_ready() {
            if let Phase::Ready { map } = self.phase {
                self.execute(map, cmd);
            }
            Ok(())
        } else if self.config.buffer_before_ready {
            self.track_target(&cmd);
            self.queue.push_back(cmd);
            Ok(())
        } else {
            Err(MapError::NotReady)
        }
    }

    /// Record where a queued camera command will leave the view.
    fn track_target(&mut self, cmd: &Command) {
        let pitch = match self.target {
            CameraTarget::Queued { pitch, .. } => pitch,
            _ => self.view.pitch,
        };
        match cmd {
            Command::SetCamera {
                center,
                zoom,
                pitch,
            } => {
                self.target = CameraTarget::Queued {
                    center: *center,
                    zoom: *zoom,
                    pitch: *pitch,
                };
            }
            Command::FitBounds { bounds, padding_px } => {
                self.target = match self.viewport() {
                    Some(vp) => {
                        let cam = geo::fit_camera(
                            *bounds,
                            vp,
                            *padding_px,
                            self.config.min_zoom,
                            self.config.max_zoom,
                        );
                        CameraTarget::Queued {
                            center: cam.center,
                            zoom: cam.zoom,
                            pitch,
                        }
                    }
                    None => CameraTarget::Unresolved,
                };
            }
            _ => {}
        }
    }

    fn execute(&mut self, map: MapHandle, cmd: Command) {
        match cmd {
            Command::AddMarker { id, point, content } => {
                if self.slot(id).is_some() {
                    let handle = self.provider.add_marker(map, point, &content);
                    self.markers[id.index as usize].state = SlotState::Live(handle);
                }
            }
            Command::UpdateMarker { id, point, content } => {
                if let Some(SlotState::Live(handle)) = self.slot(id).map(|s| &s.state) {
                    let handle = *handle;
                    self.provider.update_marker(handle, point, content.as_ref());
                }
            }
            Command::AddLineLayer { id, points, style } => {
                self.provider.add_line_layer(map, &id, &points, &style);
            }
            Command::RemoveLineLayer { id } => {
                self.provider.remove_line_layer(map, &id);
            }
            Command::FitBounds { bounds, padding_px } => {
                if let Some(vp) = self.viewport() {
                    let cam = geo::fit_camera(
                        bounds,
                        vp,
                        padding_px,
                        self.config.min_zoom,
                        self.config.max_zoom,
                    );
                    self.view.center = cam.center;
                    self.view.zoom = cam.zoom;
                }
                self.provider.fit_bounds(map, bounds, padding_px);
            }
            Command::SetCamera {
                center,
                zoom,
                pitch,
            } => {
                self.view.center = center;
                self.view.zoom = zoom;
                self.view.pitch = pitch;
                self.provider.set_camera(map, center, zoom, pitch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::map::testing::{container, Call, RecordingProvider};
    use crate::map::MarkerKind;

    fn content(class: &str) -> MarkerContent {
        MarkerContent {
            kind: MarkerKind::Station,
            class_name: class.to_string(),
            popup: None,
        }
    }

    fn ready_renderer() -> MapRenderer<RecordingProvider> {
        let mut r = MapRenderer::new(RecordingProvider::loading_immediately(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        assert!(r.is_ready());
        r
    }

    #[test]
    fn test_initialize_rejects_missing_container() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        let err = r.initialize(None, MapConfig::default()).unwrap_err();
        assert!(matches!(err, MapError::Init(_)));
        assert!(r.provider().calls.is_empty());
    }

    #[test]
    fn test_initialize_rejects_zero_sized_container() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        let c = MapContainer {
            id: "map".to_string(),
            width_px: 0.0,
            height_px: 400.0,
        };
        assert!(matches!(
            r.initialize(Some(&c), MapConfig::default()),
            Err(MapError::Init(_))
        ));
        // Still usable after the failure.
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        assert!(!r.is_ready());
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut r = ready_renderer();
        assert!(matches!(
            r.initialize(Some(&container()), MapConfig::default()),
            Err(MapError::Init(_))
        ));
    }

    #[test]
    fn test_initialize_is_non_blocking() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        assert!(!r.is_ready());
        assert!(!r.view().loaded);
        r.provider().fire_load();
        assert!(r.poll_ready());
        assert!(r.view().loaded);
    }

    #[test]
    fn test_provider_failure_is_init_error() {
        let mut provider = RecordingProvider::default();
        provider.fail_create = true;
        let mut r = MapRenderer::new(provider, MapConfig::default());
        assert!(matches!(
            r.initialize(Some(&container()), MapConfig::default()),
            Err(MapError::Init(_))
        ));
    }

    #[test]
    fn test_on_ready_fires_exactly_once() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        r.on_ready(move |_| c.set(c.get() + 1));
        assert_eq!(count.get(), 0);
        r.provider().fire_load();
        r.poll_ready();
        r.poll_ready();
        assert_eq!(count.get(), 1);

        let c = count.clone();
        r.on_ready(move |_| c.set(c.get() + 10));
        assert_eq!(count.get(), 11);
    }

    #[test]
    fn test_pre_ready_commands_flush_in_order() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let a = r.add_marker(GeoPoint::new(1.0, 1.0), content("a")).unwrap();
        r.add_marker(GeoPoint::new(2.0, 2.0), content("b")).unwrap();
        r.update_marker(a, Some(GeoPoint::new(1.5, 1.5)), None).unwrap();
        r.add_line_layer("route", vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)], LineStyle::route())
            .unwrap();
        assert_eq!(r.pending_commands(), 4);
        let before = r.provider().calls.len();

        r.provider().fire_load();
        assert!(r.poll_ready());
        assert_eq!(r.pending_commands(), 0);
        let flushed: Vec<&Call> = r.provider().calls[before..].iter().collect();
        assert!(matches!(flushed[0], Call::AddMarker { class, .. } if class == "a"));
        assert!(matches!(flushed[1], Call::AddMarker { class, .. } if class == "b"));
        assert!(matches!(flushed[2], Call::UpdateMarker { .. }));
        assert!(matches!(flushed[3], Call::AddLineLayer { id, .. } if id == "route"));
    }

    #[test]
    fn test_removing_pending_marker_cancels_its_commands() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let a = r.add_marker(GeoPoint::new(1.0, 1.0), content("a")).unwrap();
        r.update_marker(a, None, Some(content("a2"))).unwrap();
        assert!(r.remove_marker(a).unwrap());
        assert_eq!(r.pending_commands(), 0);
        assert_eq!(r.marker_count(), 0);
        r.provider().fire_load();
        r.poll_ready();
        assert_eq!(r.provider().marker_calls(), 0);
    }

    #[test]
    fn test_not_ready_when_buffering_disabled() {
        let config = MapConfig {
            buffer_before_ready: false,
            ..MapConfig::default()
        };
        let mut r = MapRenderer::new(RecordingProvider::default(), config.clone());
        r.initialize(Some(&container()), config).unwrap();
        assert_eq!(
            r.add_marker(GeoPoint::new(0.0, 0.0), content("x")),
            Err(MapError::NotReady)
        );
        assert_eq!(
            r.fit_bounds(&[GeoPoint::new(0.0, 0.0)], 10.0),
            Err(MapError::NotReady)
        );
        assert_eq!(r.marker_count(), 0);
    }

    #[test]
    fn test_set_camera_is_idempotent() {
        let mut r = ready_renderer();
        let before = r.provider().calls.len();
        let v = r.view();
        r.set_camera(v.center, v.zoom, v.pitch).unwrap();
        assert_eq!(r.provider().calls.len(), before);

        r.set_camera(GeoPoint::new(40.75, -73.99), 14.0, 0.0).unwrap();
        r.set_camera(GeoPoint::new(40.75, -73.99), 14.0 + 1e-12, 0.0).unwrap();
        assert_eq!(r.provider().calls.len(), before + 1);
        assert_eq!(r.view().zoom, 14.0);
        assert_eq!(r.view().pitch, 0.0);
    }

    #[test]
    fn test_queued_camera_move_back_home_is_kept() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let home = r.view();
        r.set_camera(GeoPoint::new(40.70, -74.00), 15.0, 0.0).unwrap();
        r.set_camera(home.center, home.zoom, home.pitch).unwrap();
        assert_eq!(r.pending_commands(), 2);

        r.provider().fire_load();
        r.poll_ready();
        let v = r.view();
        assert!(v.center.approx_eq(&home.center, 1e-12));
        assert_eq!(v.zoom, home.zoom);
        assert_eq!(v.pitch, home.pitch);
    }

    #[test]
    fn test_repeated_queued_camera_is_sent_once() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let target = GeoPoint::new(40.75, -73.99);
        r.set_camera(target, 14.0, 0.0).unwrap();
        r.set_camera(target, 14.0, 0.0).unwrap();
        assert_eq!(r.pending_commands(), 1);

        r.provider().fire_load();
        r.poll_ready();
        assert_eq!(r.provider().count(|c| matches!(c, Call::SetCamera { .. })), 1);
    }

    #[test]
    fn test_camera_after_queued_fit_compares_to_fitted_view() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let a = GeoPoint::new(40.7831, -73.9712);
        let b = GeoPoint::new(40.7505, -73.9934);
        r.fit_bounds(&[a, b], 50.0).unwrap();
        let home = r.view();
        // The fit will move the camera away, so returning home must be queued.
        r.set_camera(home.center, home.zoom, home.pitch).unwrap();
        assert_eq!(r.pending_commands(), 2);

        r.provider().fire_load();
        r.poll_ready();
        assert!(r.view().center.approx_eq(&home.center, 1e-12));
        assert_eq!(r.view().zoom, home.zoom);
    }

    #[test]
    fn test_set_camera_rejects_non_finite_zoom_and_pitch() {
        let mut r = ready_renderer();
        let before = r.view();
        let c = before.center;
        assert!(matches!(
            r.set_camera(c, f64::NAN, 0.0),
            Err(MapError::InvalidCamera { .. })
        ));
        assert!(matches!(
            r.set_camera(c, 12.0, f64::INFINITY),
            Err(MapError::InvalidCamera { .. })
        ));
        assert_eq!(r.view(), before);
        assert!(r.project(c).is_some_and(|(x, y)| x.is_finite() && y.is_finite()));
    }

    #[test]
    fn test_set_camera_clamps_pitch() {
        let mut r = ready_renderer();
        let c = r.view().center;
        r.set_camera(c, 12.0, 120.0).unwrap();
        assert_eq!(r.view().pitch, MAX_PITCH);
        r.set_camera(c, 12.0, -10.0).unwrap();
        assert_eq!(r.view().pitch, 0.0);
    }

    #[test]
    fn test_fit_bounds_empty() {
        let mut r = ready_renderer();
        assert_eq!(r.fit_bounds(&[], 50.0), Err(MapError::EmptyBounds));
        // Component stays usable.
        assert!(r.fit_bounds(&[GeoPoint::new(40.0, -74.0)], 50.0).is_ok());
    }

    #[test]
    fn test_fit_bounds_contains_points_within_padding() {
        let mut r = ready_renderer();
        let a = GeoPoint::new(40.7831, -73.9712);
        let b = GeoPoint::new(40.7505, -73.9934);
        r.fit_bounds(&[a, b], 50.0).unwrap();
        let c = container();
        for p in [a, b] {
            let (x, y) = r.project(p).unwrap();
            assert!(x >= 50.0 - 1e-6 && x <= c.width_px - 50.0 + 1e-6, "x = {x}");
            assert!(y >= 50.0 - 1e-6 && y <= c.height_px - 50.0 + 1e-6, "y = {y}");
        }
        let vb = r.visible_bounds().unwrap();
        assert!(vb.contains(a) && vb.contains(b));
        assert!(matches!(r.provider().calls.last(), Some(Call::FitBounds { padding, .. }) if *padding == 50.0));
    }

    #[test]
    fn test_teardown_is_idempotent_and_cancels_queue() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        r.on_ready(move |_| f.set(true));
        r.add_marker(GeoPoint::new(1.0, 1.0), content("a")).unwrap();
        let session = r.session();

        r.teardown();
        let calls = r.provider().calls.len();
        r.teardown();
        assert_eq!(r.provider().calls.len(), calls);
        assert!(matches!(r.provider().calls.last(), Some(Call::RemoveMap)));
        assert_eq!(r.pending_commands(), 0);
        assert_eq!(r.marker_count(), 0);
        assert_eq!(r.session(), session + 1);

        r.provider().fire_load();
        assert!(!r.poll_ready());
        assert!(!fired.get());
    }

    #[test]
    fn test_stale_marker_ids_are_rejected() {
        let mut r = ready_renderer();
        let a = r.add_marker(GeoPoint::new(1.0, 1.0), content("a")).unwrap();
        assert!(r.remove_marker(a).unwrap());
        let b = r.add_marker(GeoPoint::new(2.0, 2.0), content("b")).unwrap();
        assert_ne!(a, b);
        assert!(!r.remove_marker(a).unwrap());
        assert!(!r.update_marker(a, Some(GeoPoint::new(3.0, 3.0)), None).unwrap());
        assert_eq!(r.marker_count(), 1);
    }

    #[test]
    fn test_unproject_round_trip() {
        let r = ready_renderer();
        let p = GeoPoint::new(40.76, -73.98);
        let (x, y) = r.project(p).unwrap();
        let back = r.unproject(x, y).unwrap();
        assert!(back.approx_eq(&p, 1e-9));
    }
}
