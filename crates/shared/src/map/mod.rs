//! Live map of stations, drones and the planned route.
//!
//! [`MapRenderer`] owns the provider and the camera. [`EntityLayerManager`]
//! and [`RouteOverlay`] draw through it and are the only code allowed to
//! create or remove markers and line layers.

pub mod layers;
pub mod provider;
pub mod renderer;
pub mod route;

#[cfg(test)]
pub(crate) mod testing;

pub use layers::{drone_content, station_content, EntityKey, EntityLayerManager, MarkerEntry, SyncReport};
pub use provider::{
    LineStyle, MapContainer, MapHandle, MapProvider, MapStyle, MarkerContent, MarkerKind, Popup,
    ProviderMarker, ReadySignal,
};
pub use renderer::{MapConfig, MapRenderer, MapViewState, MarkerId};
pub use route::{RouteOverlay, RouteState, ROUTE_LAYER_ID, ROUTE_PADDING_PX};
