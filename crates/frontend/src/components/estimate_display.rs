use dioxus::prelude::*;
use dronenet_shared::models::MissionEstimate;

use crate::coords;

/// Charge left on landing, clamped at zero.
fn battery_after(level: u8, used_pct: f64) -> f64 {
    (level as f64 - used_pct).max(0.0)
}

fn feasibility_label(estimate: &MissionEstimate, reserve_pct: f64) -> String {
    if estimate.feasible {
        "Feasible".to_string()
    } else {
        format!("Not feasible: below the {reserve_pct:.0}% reserve")
    }
}

#[component]
pub fn EstimateDisplay(
    estimate: Option<MissionEstimate>,
    battery_level: Option<u8>,
    reserve_pct: f64,
    station_name: Option<String>,
    fast_charge: bool,
) -> Element {
    let Some(est) = estimate else {
        return rsx! {
            div { class: "panel",
                h3 { "Estimate" }
                p { style: "color: var(--text-dim); font-size: 13px;",
                    "Pick a drone, a start and a destination to estimate the mission."
                }
            }
        };
    };

    let verdict_class = if est.feasible { "verdict ok" } else { "verdict bad" };
    let verdict = feasibility_label(&est, reserve_pct);

    rsx! {
        div { class: "panel",
            h3 { "Estimate" }
            div { class: "solution-grid",
                div { class: "solution-item",
                    div { class: "label", "Distance" }
                    div { class: "value", "{coords::format_distance(est.distance_km)}" }
                }
                div { class: "solution-item",
                    div { class: "label", "Flight time" }
                    div { class: "value", "{coords::format_duration(est.eta_minutes)}" }
                }
                div { class: "solution-item",
                    div { class: "label", "Battery used" }
                    div { class: "value", "{est.battery_used_pct:.1}%" }
                }
                if let Some(level) = battery_level {
                    div { class: "solution-item",
                        div { class: "label", "On landing" }
                        div { class: "value", "{battery_after(level, est.battery_used_pct):.1}%" }
                    }
                }
                div { class: "solution-item",
                    div { class: "label", "Charging cost" }
                    div { class: "value", "${est.cost_usd:.2}" }
                }
            }
            if let Some(name) = station_name {
                p { class: "estimate-note",
                    "Priced at {name}"
                    if fast_charge { " with fast charge" }
                }
            }
            div { class: "{verdict_class}", "{verdict}" }
        }
    }
}
