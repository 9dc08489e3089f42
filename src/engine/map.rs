use serde::Serialize;

use crate::geo::Bounds;
use crate::models::driver::{DriverView, GeoPoint, RuntimeStatus};

/// Default view when no driver has reported a position (Metro Manila).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    latitude: 14.5995,
    longitude: 120.9842,
};
pub const DEFAULT_ZOOM: u8 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub driver_id: String,
    pub name: String,
    pub runtime_status: RuntimeStatus,
    pub position: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    pub markers: Vec<MapMarker>,
}

/// One marker per driver with a known position.
pub fn map_view(drivers: &[DriverView]) -> MapView {
    let markers: Vec<MapMarker> = drivers
        .iter()
        .filter_map(|driver| {
            driver.location().map(|position| MapMarker {
                driver_id: driver.record.id.clone(),
                name: driver.record.name.clone(),
                runtime_status: driver.runtime_status,
                position,
            })
        })
        .collect();

    let bounds = Bounds::fit(markers.iter().map(|marker| &marker.position));

    MapView {
        center: bounds.map(|b| b.center()).unwrap_or(DEFAULT_CENTER),
        zoom: DEFAULT_ZOOM,
        bounds,
        markers,
    }
}
