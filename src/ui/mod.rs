pub mod dashboard;
pub mod panels;
pub mod plot;

use eframe::egui::Color32;
use rusty_torque::color::parse_color;

/// Convert a `#RRGGBB` / CSS colour name into an egui colour.
pub fn color32(text: &str) -> Color32 {
    parse_color(text)
        .map(|c| Color32::from_rgb(c.red, c.green, c.blue))
        .unwrap_or(Color32::GRAY)
}
