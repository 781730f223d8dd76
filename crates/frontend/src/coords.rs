use dronenet_shared::models::GeoPoint;

/// Preset destinations offered next to the map.
pub const QUICK_LOCATIONS: [(&str, GeoPoint); 4] = [
    ("Central Park", GeoPoint::new(40.7812, -73.9665)),
    ("Brooklyn Bridge", GeoPoint::new(40.7061, -73.9969)),
    ("Times Square", GeoPoint::new(40.7580, -73.9855)),
    ("Statue of Liberty", GeoPoint::new(40.6892, -74.0445)),
];

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

/// Size of the element with `id`, or `None` before it is laid out.
pub fn container_size(id: &str) -> Option<(f64, f64)> {
    let rect = web_sys::window()?
        .document()?
        .get_element_by_id(id)?
        .get_bounding_client_rect();
    if rect.width() > 0.0 && rect.height() > 0.0 {
        Some((rect.width(), rect.height()))
    } else {
        None
    }
}

/// Container-relative position of a click inside the element with `id`.
pub fn click_to_container(client_x: f64, client_y: f64, id: &str) -> Option<(f64, f64)> {
    let rect = web_sys::window()?
        .document()?
        .get_element_by_id(id)?
        .get_bounding_client_rect();
    Some(client_to_container(client_x, client_y, rect.left(), rect.top()))
}

/// `40.7812° N, 73.9665° W`
pub fn format_point(p: GeoPoint) -> String {
    let ns = if p.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if p.lng >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}° {}, {:.4}° {}", p.lat.abs(), ns, p.lng.abs(), ew)
}

/// Name of the quick location at `p`, if it is one.
pub fn quick_location_name(p: GeoPoint) -> Option<&'static str> {
    QUICK_LOCATIONS
        .iter()
        .find(|(_, q)| q.approx_eq(&p, 1e-9))
        .map(|(name, _)| *name)
}

pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{:.1} km", km)
    }
}

pub fn format_duration(minutes: f64) -> String {
    let total = minutes.round() as u64;
    if total < 60 {
        format!("{} min", total)
    } else {
        format!("{} h {:02} min", total / 60, total % 60)
    }
}
