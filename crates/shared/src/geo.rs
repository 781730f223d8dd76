//! Geodesy and Web-Mercator helpers.
//!
//! Distances use a spherical earth (haversine). Screen math uses the
//! Web-Mercator tiling scheme with a 512 px zoom-0 world, which is what the
//! vector-tile map providers use.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Side length of the whole world in pixels at zoom 0.
pub const WORLD_TILE_PX: f64 = 512.0;

/// Latitude at which Web-Mercator turns the world into a square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Axis-aligned lat/lng box. Does not wrap the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bb = BoundingBox {
            south_west: *first,
            north_east: *first,
        };
        for p in &points[1..] {
            bb.extend(*p);
        }
        Some(bb)
    }

    pub fn extend(&mut self, p: GeoPoint) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }
}

/// Normalized Web-Mercator x in [0, 1] (west to east).
pub fn mercator_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

/// Normalized Web-Mercator y in [0, 1] (north to south).
pub fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let sin = lat.to_radians().sin();
    0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)
}

pub fn lng_from_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

pub fn lat_from_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Size in CSS pixels of the map canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Camera position as seen from directly above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: GeoPoint,
    pub zoom: f64,
}

fn world_size(zoom: f64) -> f64 {
    WORLD_TILE_PX * zoom.exp2()
}

impl Camera {
    /// Screen position of `p` relative to the viewport's top-left corner.
    pub fn project(&self, viewport: Viewport, p: GeoPoint) -> (f64, f64) {
        let ws = world_size(self.zoom);
        let x = (mercator_x(p.lng) - mercator_x(self.center.lng)) * ws + viewport.width / 2.0;
        let y = (mercator_y(p.lat) - mercator_y(self.center.lat)) * ws + viewport.height / 2.0;
        (x, y)
    }

    /// Inverse of [`Camera::project`].
    pub fn unproject(&self, viewport: Viewport, x: f64, y: f64) -> GeoPoint {
        let ws = world_size(self.zoom);
        let mx = mercator_x(self.center.lng) + (x - viewport.width / 2.0) / ws;
        let my = mercator_y(self.center.lat) + (y - viewport.height / 2.0) / ws;
        GeoPoint::new(
            lat_from_mercator_y(my.clamp(0.0, 1.0)),
            lng_from_mercator_x(mx.clamp(0.0, 1.0)),
        )
    }

    /// Geographic footprint of the viewport (ignores pitch).
    pub fn visible_bounds(&self, viewport: Viewport) -> BoundingBox {
        let nw = self.unproject(viewport, 0.0, 0.0);
        let se = self.unproject(viewport, viewport.width, viewport.height);
        BoundingBox {
            south_west: GeoPoint::new(se.lat, nw.lng),
            north_east: GeoPoint::new(nw.lat, se.lng),
        }
    }
}

/// Camera that shows `bounds` inside `viewport` with `padding_px` on every side.
///
/// A degenerate box (single point) gets `max_zoom`. When the padding leaves
/// less than a pixel the fit is done against a 1 px square.
pub fn fit_camera(
    bounds: BoundingBox,
    viewport: Viewport,
    padding_px: f64,
    min_zoom: f64,
    max_zoom: f64,
) -> Camera {
    let x0 = mercator_x(bounds.south_west.lng);
    let x1 = mercator_x(bounds.north_east.lng);
    let y0 = mercator_y(bounds.north_east.lat);
    let y1 = mercator_y(bounds.south_west.lat);

    let avail_w = (viewport.width - 2.0 * padding_px).max(1.0);
    let avail_h = (viewport.height - 2.0 * padding_px).max(1.0);

    let span_x = (x1 - x0) * WORLD_TILE_PX;
    let span_y = (y1 - y0) * WORLD_TILE_PX;

    let zoom_x = if span_x > 0.0 { (avail_w / span_x).log2() } else { f64::INFINITY };
    let zoom_y = if span_y > 0.0 { (avail_h / span_y).log2() } else { f64::INFINITY };
    let zoom = zoom_x.min(zoom_y).clamp(min_zoom, max_zoom);

    let center = GeoPoint::new(
        lat_from_mercator_y((y0 + y1) / 2.0),
        lng_from_mercator_x((x0 + x1) / 2.0),
    );
    Camera { center, zoom }
}
