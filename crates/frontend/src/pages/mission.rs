use dioxus::logger::tracing;
use dioxus::prelude::*;
use dronenet_shared::calc::PlannerConfig;
use dronenet_shared::map::MapConfig;
use dronenet_shared::models::{GeoPoint, MissionCommitted, Snapshot};
use dronenet_shared::planner::{MissionPlanner, PlannerState};
use gloo_timers::future::TimeoutFuture;

use crate::api::{self, MissionData};
use crate::components::estimate_display::EstimateDisplay;
use crate::components::map_view::{MapState, MapView, PlacementMode};
use crate::components::mission_panel::MissionPanel;
use crate::components::share_panel::SharePanel;

/// How long a notice stays up unless replaced or clicked away.
const NOTICE_TIMEOUT_MS: u32 = 6_000;

#[component]
pub fn MissionPlannerPage(drone_id: Option<String>) -> Element {
    // Data resources
    let mut snapshot_resource = use_resource(api::fetch_snapshot);
    let config_resource = use_resource(api::fetch_planner_config);

    let mut planner = use_signal(MissionPlanner::default);
    let mut map = use_signal(|| MapState::new(MapConfig::default()));
    let mut placement = use_signal(|| PlacementMode::Start);
    let mut notice = use_signal(|| None::<String>);
    let mut last_mission = use_signal(|| None::<MissionData>);
    let mut mission_url = use_signal(|| None::<String>);
    let mut committing = use_signal(|| false);
    let mut configured = use_signal(|| false);

    // Server constants and the deep-linked drone, applied once both are in.
    use_effect(move || {
        let cfg = config_resource.read();
        let snap = snapshot_resource.read();
        let (Some(cfg), Some(Ok(snap))) = (&*cfg, &*snap) else {
            return;
        };
        if *configured.peek() {
            return;
        }
        configured.set(true);

        let config = match cfg {
            Ok(c) => c.clone(),
            Err(e) => {
                tracing::warn!("planner config unavailable, using defaults: {}", e);
                PlannerConfig::default()
            }
        };
        let mut next = MissionPlanner::new(config);
        if let Some(id) = &drone_id {
            if let Err(e) = next.select_drone(id, &snap.drones) {
                notice.set(Some(e.to_string()));
            }
        }
        planner.set(next);
    });

    use_effect(move || {
        let Some(msg) = notice.read().clone() else {
            return;
        };
        spawn(async move {
            TimeoutFuture::new(NOTICE_TIMEOUT_MS).await;
            if notice.peek().as_deref() == Some(msg.as_str()) {
                notice.set(None);
            }
        });
    });

    // Keep markers equal to the latest snapshot.
    use_effect(move || {
        if let Some(Ok(snap)) = &*snapshot_resource.read() {
            if let Err(e) = map.write().sync(snap) {
                notice.set(Some(e.to_string()));
            }
        }
    });

    // Route follows the selected start/end.
    use_effect(move || {
        let p = planner.read();
        if let Err(e) = map.write().show_selection(&p) {
            tracing::warn!("{}", e);
        }
    });

    let selected_drone = use_memo(move || planner.read().drone().map(|d| d.id.clone()));
    let history = use_resource(move || {
        let drone = selected_drone();
        // refetch after each delivered commit
        let _ = last_mission.read();
        async move {
            match drone {
                Some(id) => api::fetch_missions(&id).await,
                None => Ok(Vec::new()),
            }
        }
    });

    let snapshot: Snapshot = match &*snapshot_resource.read() {
        Some(Ok(s)) => s.clone(),
        Some(Err(e)) => {
            tracing::warn!("snapshot fetch failed: {}", e);
            Snapshot::default()
        }
        None => Snapshot::default(),
    };
    let missions: Vec<MissionData> = match &*history.read() {
        Some(Ok(m)) => m.clone(),
        _ => Vec::new(),
    };

    let p = planner.read();
    let estimate = p.estimate(&snapshot.stations).ok();
    let station_name = p.charging_station(&snapshot.stations).map(|s| s.name.clone());
    let battery_level = p.drone().map(|d| d.battery_level);
    let reserve_pct = p.config().minimum_reserve_pct;
    let fast_charge = p.fast_charge();
    let start = p.start();
    let end = p.end();
    let state = p.state();
    drop(p);

    let commit_label = match (state, *committing.read()) {
        (_, true) => "Committing...",
        (PlannerState::Committed, false) => "Committed",
        _ => "Commit mission",
    };
    let can_commit = state == PlannerState::FullySelected && !*committing.read();

    rsx! {
        div { class: "app",
            // Header
            div { class: "header",
                h1 { "DroneNet Mission Map" }
                div { class: "placement-mode",
                    button {
                        class: if *placement.read() == PlacementMode::Start { "active-start" } else { "" },
                        onclick: move |_| placement.set(PlacementMode::Start),
                        "Start"
                    }
                    button {
                        class: if *placement.read() == PlacementMode::End { "active-end" } else { "" },
                        onclick: move |_| placement.set(PlacementMode::End),
                        "Destination"
                    }
                    button {
                        class: "secondary",
                        onclick: move |_| snapshot_resource.restart(),
                        "Refresh"
                    }
                }
            }

            // Sidebar
            div { class: "sidebar",
                if let Some(msg) = notice.read().clone() {
                    div { class: "notice",
                        onclick: move |_| notice.set(None),
                        "{msg}"
                    }
                }

                MissionPanel {
                    drones: snapshot.drones.clone(),
                    stations: snapshot.stations.clone(),
                    planner: planner,
                    placement: placement,
                    notice: notice,
                }

                EstimateDisplay {
                    estimate: estimate,
                    battery_level: battery_level,
                    reserve_pct: reserve_pct,
                    station_name: station_name,
                    fast_charge: fast_charge,
                }

                div { class: "panel",
                    button {
                        disabled: !can_commit,
                        onclick: move |_| {
                            let stations = match &*snapshot_resource.peek() {
                                Some(Ok(s)) => s.stations.clone(),
                                _ => Vec::new(),
                            };
                            let fast = planner.peek().fast_charge();
                            let mut outbox: Vec<MissionCommitted> = Vec::new();
                            let committed = planner.write().commit(&mut outbox, &stations).map(|_| ());
                            if let Err(e) = committed {
                                notice.set(Some(e.to_string()));
                                return;
                            }
                            let Some(event) = outbox.pop() else {
                                return;
                            };
                            committing.set(true);
                            spawn(async move {
                                match api::commit_mission(&event, fast).await {
                                    Ok(m) => {
                                        mission_url.set(
                                            api::origin().ok().map(|o| api::build_mission_url(&o, &m.drone_id)),
                                        );
                                        last_mission.set(Some(m));
                                        notice.set(None);
                                    }
                                    Err(e) => {
                                        planner.write().reopen();
                                        notice.set(Some(format!("Commit failed: {}", e)));
                                    }
                                }
                                committing.set(false);
                            });
                        },
                        "{commit_label}"
                    }
                }

                SharePanel {
                    mission_url: mission_url.read().clone(),
                    missions: missions,
                }
            }

            // Map view
            MapView {
                map: map,
                placement: placement,
                start: start,
                end: end,
                on_pick: move |point: GeoPoint| {
                    let mode = *placement.peek();
                    let result = match mode {
                        PlacementMode::Start => planner.write().set_start(point),
                        PlacementMode::End => planner.write().set_end(point),
                    };
                    match result {
                        Ok(()) => {
                            notice.set(None);
                            if mode == PlacementMode::Start {
                                placement.set(PlacementMode::End);
                            }
                        }
                        Err(e) => notice.set(Some(e.to_string())),
                    }
                },
            }
        }
    }
}
