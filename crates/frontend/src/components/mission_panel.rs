use dioxus::prelude::*;
use dronenet_shared::calc::PlannerConfig;
use dronenet_shared::error::{MissionError, UnavailableReason};
use dronenet_shared::models::{DroneRecord, GeoPoint, StationRecord};
use dronenet_shared::planner::{check_drone_available, MissionPlanner};

use crate::components::map_view::PlacementMode;
use crate::coords;

/// Option text for a drone and whether it can be picked.
fn drone_option(drone: &DroneRecord, config: &PlannerConfig) -> (String, bool) {
    let base = format!("{} ({}%)", drone.name, drone.battery_level);
    match check_drone_available(drone, config) {
        Ok(()) => (base, true),
        Err(MissionError::DroneUnavailable { reason, .. }) => {
            let why = match reason {
                UnavailableReason::Status(s) => s.to_string(),
                UnavailableReason::LowBattery { .. } => "low battery".to_string(),
                UnavailableReason::NotFound => "unknown".to_string(),
            };
            (format!("{base} - {why}"), false)
        }
        Err(_) => (base, false),
    }
}

fn point_label(point: Option<GeoPoint>) -> String {
    match point {
        Some(p) => match coords::quick_location_name(p) {
            Some(name) => name.to_string(),
            None => coords::format_point(p),
        },
        None => "not set".to_string(),
    }
}

#[component]
pub fn MissionPanel(
    drones: Vec<DroneRecord>,
    stations: Vec<StationRecord>,
    planner: Signal<MissionPlanner>,
    placement: Signal<PlacementMode>,
    notice: Signal<Option<String>>,
) -> Element {
    let p = planner.read();
    let config = p.config().clone();
    let selected_drone = p.drone().map(|d| d.id.clone()).unwrap_or_default();
    let selected_station = p.station_id().map(str::to_string).unwrap_or_default();
    let start_label = point_label(p.start());
    let end_label = point_label(p.end());
    let has_start = p.start().is_some();
    let has_end = p.end().is_some();
    let fast_charge = p.fast_charge();
    let state = p.state();
    drop(p);

    let mode = *placement.read();
    let start_cls = if mode == PlacementMode::Start { "point-row active" } else { "point-row" };
    let end_cls = if mode == PlacementMode::End { "point-row active" } else { "point-row" };

    let drones_for_select = drones.clone();

    rsx! {
        div { class: "panel",
            h3 { "Mission" }
            p { class: "planner-state", "State: {state}" }

            label { "Drone" }
            select {
                value: "{selected_drone}",
                onchange: move |evt: Event<FormData>| {
                    let id = evt.value();
                    if id.is_empty() {
                        planner.write().clear_drone();
                        return;
                    }
                    let result = planner.write().select_drone(&id, &drones_for_select);
                    notice.set(result.err().map(|e| e.to_string()));
                },
                option { value: "", "Select a drone..." }
                for d in drones.iter() {
                    {
                        let (text, enabled) = drone_option(d, &config);
                        rsx! {
                            option {
                                value: "{d.id}",
                                disabled: !enabled,
                                selected: d.id == selected_drone,
                                "{text}"
                            }
                        }
                    }
                }
            }

            div {
                class: "{start_cls}",
                onclick: move |_| placement.set(PlacementMode::Start),
                span { class: "coord-info start-coord", "Start: {start_label}" }
                if has_start {
                    button {
                        class: "secondary small",
                        onclick: move |evt| {
                            evt.stop_propagation();
                            planner.write().clear_start();
                        },
                        "Clear"
                    }
                }
            }
            div {
                class: "{end_cls}",
                onclick: move |_| placement.set(PlacementMode::End),
                span { class: "coord-info end-coord", "Destination: {end_label}" }
                if has_end {
                    button {
                        class: "secondary small",
                        onclick: move |evt| {
                            evt.stop_propagation();
                            planner.write().clear_end();
                        },
                        "Clear"
                    }
                }
            }

            div { class: "quick-locations",
                for (name, point) in coords::QUICK_LOCATIONS {
                    button {
                        class: "secondary small",
                        onclick: move |_| {
                            let result = match *placement.read() {
                                PlacementMode::Start => planner.write().set_start(point),
                                PlacementMode::End => planner.write().set_end(point),
                            };
                            notice.set(result.err().map(|e| e.to_string()));
                        },
                        "{name}"
                    }
                }
            }

            label { "Charging station" }
            select {
                value: "{selected_station}",
                onchange: move |evt: Event<FormData>| {
                    let id = evt.value();
                    if id.is_empty() {
                        planner.write().clear_station();
                    } else {
                        planner.write().select_station(&id);
                    }
                },
                option { value: "", "Nearest to destination" }
                for s in stations.iter() {
                    option {
                        value: "{s.id}",
                        selected: s.id == selected_station,
                        "{s.name} (${s.price_per_kwh:.2}/kWh)"
                    }
                }
            }

            label { class: "checkbox",
                input {
                    r#type: "checkbox",
                    checked: fast_charge,
                    onchange: move |evt: Event<FormData>| {
                        planner.write().set_fast_charge(evt.checked());
                    },
                }
                "Fast charge"
            }

            div { style: "margin-top: 8px;",
                button {
                    class: "secondary",
                    onclick: move |_| {
                        planner.write().reset();
                        placement.set(PlacementMode::Start);
                        notice.set(None);
                    },
                    "Reset"
                }
            }
        }
    }
}
