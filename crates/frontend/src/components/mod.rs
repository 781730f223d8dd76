pub mod estimate_display;
pub mod map_view;
pub mod mission_panel;
pub mod share_panel;
