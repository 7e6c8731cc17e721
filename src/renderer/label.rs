//! Text overlay entities supplied by the caller

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A text label drawn centered on its position every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntity {
    pub id: u32,
    pub text: String,
    pub position: Vec2,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub bold: bool,
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_size() -> f32 {
    48.0
}

fn default_color() -> String {
    "#ffffff".to_string()
}

impl LabelEntity {
    /// CSS font shorthand, e.g. `bold 48px Arial`
    pub fn css_font(&self) -> String {
        let weight = if self.bold { "bold " } else { "" };
        format!("{}{}px {}", weight, self.size, self.font_family)
    }

    /// Parse a JSON array of labels (the overlay editor's export format)
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
