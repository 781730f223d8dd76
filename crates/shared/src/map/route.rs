use super::provider::{LineStyle, MapProvider};
use super::renderer::MapRenderer;
use crate::error::MapError;
use crate::models::GeoPoint;

/// Layer id of the planned-mission line.
pub const ROUTE_LAYER_ID: &str = "route";

/// Padding kept around the route when the camera is fitted to it.
pub const ROUTE_PADDING_PX: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteState {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub layer_id: String,
}

/// Draws at most one straight start-to-end line and keeps the camera on it.
///
/// The straight segment stands in for a real flight path; no obstacle or
/// airspace routing happens here.
#[derive(Debug)]
pub struct RouteOverlay {
    active: Option<RouteState>,
    style: LineStyle,
    session: Option<u64>,
}

impl Default for RouteOverlay {
    fn default() -> Self {
        RouteOverlay {
            active: None,
            style: LineStyle::route(),
            session: None,
        }
    }
}

impl RouteOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&RouteState> {
        self.active.as_ref()
    }

    pub fn show_route<P: MapProvider>(
        &mut self,
        renderer: &mut MapRenderer<P>,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<(), MapError> {
        for (name, p) in [("route start", start), ("route end", end)] {
            if !p.is_valid() {
                return Err(MapError::InvalidLocation {
                    entity: name.to_string(),
                    lat: p.lat,
                    lng: p.lng,
                });
            }
        }
        if !renderer.accepts_commands() {
            return Err(MapError::NotReady);
        }
        self.adopt_session(renderer);

        if let Some(prev) = self.active.take() {
            renderer.remove_line_layer(&prev.layer_id)?;
        }
        renderer.add_line_layer(ROUTE_LAYER_ID, vec![start, end], self.style.clone())?;
        self.active = Some(RouteState {
            start,
            end,
            layer_id: ROUTE_LAYER_ID.to_string(),
        });
        renderer.fit_bounds(&[start, end], ROUTE_PADDING_PX)?;
        tracing::debug!(%start, %end, "route shown");
        Ok(())
    }

    /// Remove the route if one is drawn. Returns whether anything was removed.
    pub fn clear_route<P: MapProvider>(
        &mut self,
        renderer: &mut MapRenderer<P>,
    ) -> Result<bool, MapError> {
        if !renderer.accepts_commands() {
            return Err(MapError::NotReady);
        }
        self.adopt_session(renderer);
        match self.active.take() {
            Some(prev) => renderer.remove_line_layer(&prev.layer_id),
            None => Ok(false),
        }
    }

    fn adopt_session<P: MapProvider>(&mut self, renderer: &MapRenderer<P>) {
        if self.session != Some(renderer.session()) {
            self.active = None;
            self.session = Some(renderer.session());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::renderer::MapConfig;
    use crate::map::testing::{container, Call, RecordingProvider};

    const A: GeoPoint = GeoPoint::new(40.7831, -73.9712);
    const B: GeoPoint = GeoPoint::new(40.7505, -73.9934);
    const C: GeoPoint = GeoPoint::new(40.7061, -73.9969);

    fn ready() -> MapRenderer<RecordingProvider> {
        let mut r = MapRenderer::new(RecordingProvider::loading_immediately(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        r
    }

    #[test]
    fn test_show_route_draws_and_fits() {
        let mut r = ready();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, B).unwrap();
        assert_eq!(r.provider().live_layers, vec!["route".to_string()]);
        assert!(matches!(
            r.provider().calls.last(),
            Some(Call::FitBounds { padding, .. }) if *padding == ROUTE_PADDING_PX
        ));
        assert_eq!(route.active().unwrap().start, A);
    }

    #[test]
    fn test_show_route_twice_keeps_single_line() {
        let mut r = ready();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, B).unwrap();
        route.show_route(&mut r, B, C).unwrap();
        assert_eq!(r.provider().live_layers.len(), 1);
        assert_eq!(r.line_layer_ids().count(), 1);
        assert_eq!(route.active().unwrap().end, C);
        let adds = r.provider().count(|c| matches!(c, Call::AddLineLayer { .. }));
        let removes = r.provider().count(|c| matches!(c, Call::RemoveLineLayer { .. }));
        assert_eq!(adds - removes, 1);
    }

    #[test]
    fn test_route_camera_contains_endpoints() {
        let mut r = ready();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, C).unwrap();
        let c = container();
        for p in [A, C] {
            let (x, y) = r.project(p).unwrap();
            assert!(x >= ROUTE_PADDING_PX - 1e-6 && x <= c.width_px - ROUTE_PADDING_PX + 1e-6);
            assert!(y >= ROUTE_PADDING_PX - 1e-6 && y <= c.height_px - ROUTE_PADDING_PX + 1e-6);
        }
    }

    #[test]
    fn test_clear_route_is_idempotent() {
        let mut r = ready();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, B).unwrap();
        assert!(route.clear_route(&mut r).unwrap());
        let calls = r.provider().calls.len();
        assert!(!route.clear_route(&mut r).unwrap());
        assert_eq!(r.provider().calls.len(), calls);
        assert!(r.provider().live_layers.is_empty());
        assert!(route.active().is_none());
    }

    #[test]
    fn test_invalid_endpoint_leaves_route_alone() {
        let mut r = ready();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, B).unwrap();
        let err = route.show_route(&mut r, A, GeoPoint::new(0.0, 500.0)).unwrap_err();
        assert!(matches!(err, MapError::InvalidLocation { .. }));
        assert_eq!(route.active().unwrap().end, B);
        assert_eq!(r.provider().live_layers.len(), 1);
    }

    #[test]
    fn test_route_before_ready_is_buffered() {
        let mut r = MapRenderer::new(RecordingProvider::default(), MapConfig::default());
        r.initialize(Some(&container()), MapConfig::default()).unwrap();
        let mut route = RouteOverlay::new();
        route.show_route(&mut r, A, B).unwrap();
        route.show_route(&mut r, A, C).unwrap();
        assert!(r.provider().live_layers.is_empty());
        r.provider().fire_load();
        r.poll_ready();
        assert_eq!(r.provider().live_layers, vec!["route".to_string()]);
        let c = container();
        let (x, _) = r.project(C).unwrap();
        assert!(x >= ROUTE_PADDING_PX - 1e-6 && x <= c.width_px - ROUTE_PADDING_PX + 1e-6);
    }
}
