use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub label_color: String,
    pub lifespan_color: String,
    pub background: String,
    pub node_fill: String,
    pub deceased_fill: String,
    pub node_border: String,
    pub highlight_color: String,
    pub parent_line_color: String,
    pub spouse_line_color: String,
    pub sibling_line_color: String,
    pub line_width: f32,
}

impl Theme {
    /// Dark canvas with firebrick nodes.
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 28.0,
            label_color: "#FFFFFF".to_string(),
            lifespan_color: "#F5E6E6".to_string(),
            background: "#262633".to_string(),
            node_fill: "#B22222".to_string(),
            deceased_fill: "#5E3A3A".to_string(),
            node_border: "#7F1818".to_string(),
            highlight_color: "#FFFF00".to_string(),
            parent_line_color: "#FFFFFF".to_string(),
            spouse_line_color: "#BFBFBF".to_string(),
            sibling_line_color: "#00FFFF".to_string(),
            line_width: 2.0,
        }
    }

    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 24.0,
            label_color: "#1C2430".to_string(),
            lifespan_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            node_fill: "#F8FAFF".to_string(),
            deceased_fill: "#E4E7EE".to_string(),
            node_border: "#7A8AA6".to_string(),
            highlight_color: "#F2B705".to_string(),
            parent_line_color: "#7A8AA6".to_string(),
            spouse_line_color: "#C7D2E5".to_string(),
            sibling_line_color: "#3FA7D6".to_string(),
            line_width: 1.6,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" | "dark" => Some(Self::classic()),
            "light" | "modern" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
