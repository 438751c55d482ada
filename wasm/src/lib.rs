use family_tree::theme::Theme;
use family_tree::{FamilyTree, PersonId, RenderOptions, Snapshot, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    node_radius: Option<f32>,
    highlight: Option<String>,
}

fn build_render_options(options: TreeRenderOptions) -> RenderOptions {
    let mut render_options = match options.theme.as_deref().and_then(Theme::from_name) {
        Some(theme) if theme == Theme::light() => RenderOptions::light(),
        _ => RenderOptions::classic(),
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    if let Some(radius) = options.node_radius {
        render_options.layout.node_radius = radius.max(1.0);
    }
    render_options.highlight = options.highlight.map(PersonId::from);

    render_options
}

fn render(snapshot_json: &str, options: TreeRenderOptions) -> Result<String, String> {
    let snapshot = Snapshot::from_json(snapshot_json).map_err(|error| error.to_string())?;
    let tree = FamilyTree::from_snapshot(snapshot).map_err(|error| error.to_string())?;
    Ok(render_with_options(&tree, &build_render_options(options)))
}

#[wasm_bindgen]
pub fn render_family_tree_svg(
    snapshot_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<TreeRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        TreeRenderOptions::default()
    };

    render(snapshot_json, options).map_err(|error| JsValue::from_str(&error))
}
