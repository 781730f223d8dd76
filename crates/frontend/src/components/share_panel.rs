use dioxus::prelude::*;

use crate::api::MissionData;
use crate::coords;

/// `2026-03-01T14:05:09+00:00` -> `2026-03-01 14:05`
fn short_timestamp(rfc3339: &str) -> String {
    match (rfc3339.get(..10), rfc3339.get(11..16)) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        _ => rfc3339.to_string(),
    }
}

#[component]
pub fn SharePanel(mission_url: Option<String>, missions: Vec<MissionData>) -> Element {
    rsx! {
        div { class: "panel",
            h3 { "Missions" }
            if let Some(url) = mission_url {
                div { class: "plan-url",
                    input {
                        r#type: "text",
                        readonly: true,
                        value: "{url}",
                    }
                    button {
                        class: "secondary",
                        onclick: {
                            let url = url.clone();
                            move |_| {
                                let url = url.clone();
                                wasm_bindgen_futures::spawn_local(async move {
                                    if let Some(window) = web_sys::window() {
                                        let clipboard = window.navigator().clipboard();
                                        let _ = wasm_bindgen_futures::JsFuture::from(
                                            clipboard.write_text(&url)
                                        ).await;
                                    }
                                });
                            }
                        },
                        "Copy"
                    }
                }
            }
            if missions.is_empty() {
                p { style: "color: var(--text-dim); font-size: 13px;", "No missions for this drone yet." }
            }
            ul { class: "mission-list",
                for m in missions.iter() {
                    li { key: "{m.id}",
                        span { class: "mission-time", "{short_timestamp(&m.committed_at)}" }
                        span { "{coords::format_distance(m.estimate.distance_km)}" }
                        span { "${m.estimate.cost_usd:.2}" }
                        if !m.estimate.feasible {
                            span { class: "verdict bad", "infeasible" }
                        }
                    }
                }
            }
        }
    }
}
