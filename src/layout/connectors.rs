use super::*;

/// Connector geometry for every drawable relation. Parent links are
/// orthogonal polylines from the bottom of the parent down a shared bus to
/// the top of the child's name label; spouses get one segment between the
/// circle edges; directly linked siblings get a bracket below both nodes.
pub(super) fn build_connectors(
    graph: &LayoutGraph<'_>,
    config: &LayoutConfig,
    positions: &Positions,
) -> Vec<ConnectorLayout> {
    let tree = graph.tree();
    let r = config.node_radius;
    let mut connectors = Vec::new();
    let mut paired: HashSet<(&PersonId, &PersonId, RelationKind)> = HashSet::new();

    for rel in tree.relations() {
        if rel.from == rel.to {
            continue;
        }
        let (Some(from), Some(to)) = (positions.get(&rel.from), positions.get(&rel.to)) else {
            continue;
        };
        if rel.kind.is_symmetric()
            && (paired.contains(&(&rel.to, &rel.from, rel.kind))
                || !paired.insert((&rel.from, &rel.to, rel.kind)))
        {
            continue;
        }
        let points = match rel.kind {
            RelationKind::Parent => {
                let bus = from.y - r - config.connector_drop;
                vec![
                    (from.x, from.y - r),
                    (from.x, bus),
                    (to.x, bus),
                    (to.x, to.y + r + config.label_offset),
                ]
            }
            RelationKind::Spouse => spouse_segment(from, to, r),
            RelationKind::Sibling => {
                if graph.have_common_parent(&rel.from, &rel.to) {
                    continue;
                }
                let low = from.y.min(to.y) - r - config.connector_drop / 2.0;
                vec![(from.x, from.y - r), (from.x, low), (to.x, low), (to.x, to.y - r)]
            }
        };
        connectors.push(ConnectorLayout {
            kind: rel.kind,
            from: rel.from.clone(),
            to: rel.to.clone(),
            points,
        });
    }
    connectors
}

fn spouse_segment(a: Point, b: Point, r: f32) -> Vec<(f32, f32)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len <= 2.0 * r {
        return vec![(a.x, a.y), (b.x, b.y)];
    }
    let (ux, uy) = (dx / len, dy / len);
    vec![
        (a.x + ux * r, a.y + uy * r),
        (b.x - ux * r, b.y - uy * r),
    ]
}
