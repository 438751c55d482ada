mod connectors;
mod siblings;
mod subtree;
pub(crate) mod types;
pub use types::*;
use connectors::*;
use siblings::*;
use subtree::*;

use crate::config::LayoutConfig;
use crate::model::{PersonId, RelationKind};
use crate::tree::FamilyTree;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Resolved adjacency of the family tree: dangling ids and self references
/// are dropped once here so the passes below never see them.
pub(crate) struct LayoutGraph<'a> {
    tree: &'a FamilyTree,
    children: HashMap<&'a PersonId, Vec<&'a PersonId>>,
    parents: HashMap<&'a PersonId, Vec<&'a PersonId>>,
    partner: HashMap<&'a PersonId, &'a PersonId>,
}

impl<'a> LayoutGraph<'a> {
    pub(crate) fn new(tree: &'a FamilyTree) -> Self {
        let mut children: HashMap<&PersonId, Vec<&PersonId>> = HashMap::new();
        let mut parents: HashMap<&PersonId, Vec<&PersonId>> = HashMap::new();
        let mut partner: HashMap<&PersonId, &PersonId> = HashMap::new();

        for rel in tree.relations() {
            if rel.from == rel.to || !tree.contains(&rel.from) || !tree.contains(&rel.to) {
                continue;
            }
            match rel.kind {
                RelationKind::Parent => {
                    children.entry(&rel.from).or_default().push(&rel.to);
                    parents.entry(&rel.to).or_default().push(&rel.from);
                }
                RelationKind::Spouse => {
                    if !partner.contains_key(&rel.from) && tree.has_relation(&rel.reversed()) {
                        partner.insert(&rel.from, &rel.to);
                    }
                }
                RelationKind::Sibling => {}
            }
        }

        Self {
            tree,
            children,
            parents,
            partner,
        }
    }

    pub(crate) fn tree(&self) -> &'a FamilyTree {
        self.tree
    }

    pub(crate) fn partner(&self, id: &PersonId) -> Option<&'a PersonId> {
        self.partner.get(id).copied()
    }

    pub(crate) fn has_parent(&self, id: &PersonId) -> bool {
        self.parents.contains_key(id)
    }

    /// Common parent among people actually in the tree.
    pub(crate) fn have_common_parent(&self, a: &PersonId, b: &PersonId) -> bool {
        match (self.parents.get(a), self.parents.get(b)) {
            (Some(of_a), Some(of_b)) => of_a.iter().any(|parent| of_b.contains(parent)),
            _ => false,
        }
    }

    /// Children distributed by a couple block: the anchor's children, then
    /// the partner's children not already listed.
    pub(crate) fn block_children(&self, id: &PersonId) -> Vec<&'a PersonId> {
        let mut out: Vec<&PersonId> = self.children.get(id).cloned().unwrap_or_default();
        if let Some(partner) = self.partner(id)
            && let Some(extra) = self.children.get(partner)
        {
            for child in extra {
                if !out.contains(child) {
                    out.push(*child);
                }
            }
        }
        out
    }

    /// A rootless person laid out only as their partner's companion: the
    /// partner has parents, or both are rootless and the partner's id sorts
    /// first.
    fn is_companion(&self, id: &PersonId) -> bool {
        let Some(partner) = self.partner(id) else {
            return false;
        };
        if self.partner(partner) != Some(id) {
            return false;
        }
        self.has_parent(partner) || partner < id
    }

    /// Structural roots in id order.
    pub(crate) fn roots(&self) -> Vec<&'a PersonId> {
        self.tree
            .people()
            .map(|person| &person.id)
            .filter(|id| !self.has_parent(id) && !self.is_companion(id))
            .collect()
    }
}

/// Recomputes every position from scratch into `positions`.
pub fn layout_positions(tree: &FamilyTree, config: &LayoutConfig, positions: &mut Positions) {
    positions.clear();
    let Some(first) = tree.people().next() else {
        return;
    };

    let graph = LayoutGraph::new(tree);
    let mut roots = graph.roots();
    if roots.is_empty() {
        roots.push(&first.id);
    }

    let mut walker = SubtreeWalker::new(&graph, config);
    let widths: Vec<f32> = roots.iter().map(|root| walker.width(root)).collect();
    let gap = config.root_gap();
    let total: f32 = widths.iter().sum::<f32>() + gap * (roots.len() as f32 - 1.0);

    let mut cursor = config.canvas_width / 2.0 - total / 2.0;
    let y = config.canvas_height / 2.0;
    for (root, width) in roots.iter().zip(&widths) {
        walker.place(root, cursor + width / 2.0, y, positions);
        cursor += width + gap;
    }

    // Anyone the roots did not reach (e.g. people only linked through a
    // partner's second spouse) goes to the right as an extra root.
    for person in tree.people() {
        if positions.contains(&person.id) {
            continue;
        }
        let width = walker.width(&person.id);
        walker.place(&person.id, cursor + width / 2.0, y, positions);
        cursor += width + gap;
    }

    let placement = walker.into_placement();
    separate_sibling_groups(&graph, &placement, config, positions);

    tracing::debug!(
        people = tree.len(),
        roots = roots.len(),
        placed = positions.len(),
        "computed tree layout"
    );
}

/// Positions plus connectors and bounds, ready for rendering.
pub fn compute_layout(tree: &FamilyTree, config: &LayoutConfig) -> Layout {
    let mut positions = Positions::new();
    layout_positions(tree, config, &mut positions);

    let graph = LayoutGraph::new(tree);
    let radius = config.node_radius;
    let mut nodes = BTreeMap::new();
    for (id, point) in positions.iter() {
        let partner = graph
            .partner(id)
            .filter(|partner| positions.contains(partner))
            .cloned();
        nodes.insert(
            id.clone(),
            NodeLayout {
                id: id.clone(),
                x: point.x,
                y: point.y,
                radius,
                partner,
            },
        );
    }

    let roots = graph.roots().into_iter().cloned().collect();
    let connectors = build_connectors(&graph, config, &positions);
    let bounds = compute_bounds(&positions, config);

    Layout {
        nodes,
        connectors,
        roots,
        bounds,
    }
}

fn compute_bounds(positions: &Positions, config: &LayoutConfig) -> Bounds {
    if positions.is_empty() {
        return Bounds::default();
    }
    let mut bounds = Bounds {
        min_x: f32::MAX,
        min_y: f32::MAX,
        max_x: f32::MIN,
        max_y: f32::MIN,
    };
    for (_, point) in positions.iter() {
        bounds.min_x = bounds.min_x.min(point.x);
        bounds.max_x = bounds.max_x.max(point.x);
        bounds.min_y = bounds.min_y.min(point.y);
        bounds.max_y = bounds.max_y.max(point.y);
    }
    let r = config.node_radius;
    // Names sit above the circle.
    bounds.min_x -= r;
    bounds.max_x += r;
    bounds.min_y -= r;
    bounds.max_y += r + config.label_offset * 2.0;
    bounds
}
