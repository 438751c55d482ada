#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod theme;
pub mod tree;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{CyclicRelationError, SnapshotError};
pub use model::{Person, PersonId, PersonPatch, Relation, RelationKind};
pub use snapshot::Snapshot;
pub use tree::{FamilyTree, RelativeKind};

use config::{LayoutConfig, RenderConfig};
use theme::Theme;

/// Everything needed to turn a tree into an SVG string in one call.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub highlight: Option<PersonId>,
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::default()
    }

    pub fn light() -> Self {
        let theme = Theme::light();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..RenderConfig::default()
        };
        Self {
            theme,
            render,
            ..Self::default()
        }
    }
}

pub fn render_with_options(tree: &FamilyTree, options: &RenderOptions) -> String {
    let layout = layout::compute_layout(tree, &options.layout);
    render::render_svg(
        &layout,
        tree,
        &options.theme,
        &options.render,
        options.highlight.as_ref(),
    )
}
