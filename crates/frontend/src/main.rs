mod api;
mod components;
mod coords;
mod pages;
mod scene;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/mission/:drone_id")]
    MissionView { drone_id: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::mission::MissionPlannerPage { drone_id: None::<String> }
    }
}

#[component]
fn MissionView(drone_id: String) -> Element {
    rsx! {
        pages::mission::MissionPlannerPage { drone_id: Some(drone_id) }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
