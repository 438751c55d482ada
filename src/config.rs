use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the tree layout. Gaps are expressed relative to the node
/// radius so a single `node_radius` change rescales the whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_radius: f32,
    pub node_padding: f32,
    pub partner_gap_ratio: f32,
    pub sibling_gap_ratio: f32,
    pub rank_padding: f32,
    pub root_gap: Option<f32>,
    pub label_offset: f32,
    pub connector_drop: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_radius: 75.0,
            node_padding: 50.0,
            partner_gap_ratio: 1.5,
            sibling_gap_ratio: 3.0,
            rank_padding: 100.0,
            root_gap: None,
            label_offset: 30.0,
            connector_drop: 20.0,
            canvas_width: 1200.0,
            canvas_height: 800.0,
        }
    }
}

impl LayoutConfig {
    pub fn node_width(&self) -> f32 {
        self.node_radius * 2.0 + self.node_padding
    }

    pub fn partner_gap(&self) -> f32 {
        self.node_radius * self.partner_gap_ratio
    }

    pub fn sibling_gap(&self) -> f32 {
        self.node_radius * self.sibling_gap_ratio
    }

    pub fn vertical_gap(&self) -> f32 {
        self.node_radius * 2.0 + self.rank_padding
    }

    pub fn root_gap(&self) -> f32 {
        self.root_gap.unwrap_or_else(|| self.node_width())
    }

    /// Width of a person drawn together with their partner.
    pub fn couple_width(&self) -> f32 {
        self.node_width() * 2.0 + self.partner_gap()
    }

    /// Horizontal distance between the centres of two partners.
    pub fn partner_distance(&self) -> f32 {
        self.node_width() + self.partner_gap()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
            background: Theme::classic().background,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    label_color: Option<String>,
    lifespan_color: Option<String>,
    background: Option<String>,
    node_fill: Option<String>,
    deceased_fill: Option<String>,
    node_border: Option<String>,
    highlight_color: Option<String>,
    parent_line_color: Option<String>,
    spouse_line_color: Option<String>,
    sibling_line_color: Option<String>,
    line_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_radius: Option<f32>,
    node_padding: Option<f32>,
    partner_gap_ratio: Option<f32>,
    sibling_gap_ratio: Option<f32>,
    rank_padding: Option<f32>,
    root_gap: Option<f32>,
    label_offset: Option<f32>,
    connector_drop: Option<f32>,
    canvas_width: Option<f32>,
    canvas_height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a config document (JSON, or JSON5 for comments and trailing
/// commas) and merges it over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}"))?,
    };

    let mut config = Config::default();
    let mut background_explicit = false;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.label_color {
            config.theme.label_color = v;
        }
        if let Some(v) = vars.lifespan_color {
            config.theme.lifespan_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.deceased_fill {
            config.theme.deceased_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.highlight_color {
            config.theme.highlight_color = v;
        }
        if let Some(v) = vars.parent_line_color {
            config.theme.parent_line_color = v;
        }
        if let Some(v) = vars.spouse_line_color {
            config.theme.spouse_line_color = v;
        }
        if let Some(v) = vars.sibling_line_color {
            config.theme.sibling_line_color = v;
        }
        if let Some(v) = vars.line_width {
            config.theme.line_width = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_radius {
            config.layout.node_radius = v.max(1.0);
        }
        if let Some(v) = layout.node_padding {
            config.layout.node_padding = v.max(0.0);
        }
        if let Some(v) = layout.partner_gap_ratio {
            config.layout.partner_gap_ratio = v.max(0.0);
        }
        if let Some(v) = layout.sibling_gap_ratio {
            config.layout.sibling_gap_ratio = v.max(0.0);
        }
        if let Some(v) = layout.rank_padding {
            config.layout.rank_padding = v.max(0.0);
        }
        if let Some(v) = layout.root_gap {
            config.layout.root_gap = Some(v.max(0.0));
        }
        if let Some(v) = layout.label_offset {
            config.layout.label_offset = v;
        }
        if let Some(v) = layout.connector_drop {
            config.layout.connector_drop = v.max(0.0);
        }
        if let Some(v) = layout.canvas_width {
            config.layout.canvas_width = v;
        }
        if let Some(v) = layout.canvas_height {
            config.layout.canvas_height = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.padding {
            config.render.padding = v.max(0.0);
        }
        if let Some(v) = render.background {
            config.render.background = v;
            background_explicit = true;
        }
    }

    if !background_explicit {
        config.render.background = config.theme.background.clone();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_follows_radius() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.node_width(), 200.0);
        assert_eq!(layout.partner_gap(), 112.5);
        assert_eq!(layout.sibling_gap(), 225.0);
        assert_eq!(layout.vertical_gap(), 250.0);
        assert_eq!(layout.root_gap(), 200.0);
        assert_eq!(layout.couple_width(), 512.5);
    }

    #[test]
    fn merges_partial_config_over_defaults() {
        let config = parse_config(
            r##"{
                "theme": "light",
                "themeVariables": { "nodeFill": "#123456" },
                "layout": { "nodeRadius": 40, "rootGap": 10 }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.node_fill, "#123456");
        assert_eq!(config.theme.label_color, Theme::light().label_color);
        assert_eq!(config.layout.node_radius, 40.0);
        assert_eq!(config.layout.root_gap(), 10.0);
        assert_eq!(config.layout.node_padding, 50.0);
        assert_eq!(config.render.background, Theme::light().background);
    }

    #[test]
    fn accepts_json5_comments() {
        let config = parse_config(
            "{\n  // tighter couples\n  layout: { partnerGapRatio: 0.5, },\n}",
        )
        .unwrap();
        assert_eq!(config.layout.partner_gap_ratio, 0.5);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_config("not a config").is_err());
    }
}
