use super::*;

/// Pushes apart siblings that were linked directly without a shared parent,
/// so the right-hand one's block starts a sibling gap past the left-hand
/// one's. Everything drawn to the right of the moved block in its row, and
/// in every ancestor row, moves with it so no two subtrees overlap. Pairs
/// are visited once, in relation order.
pub(super) fn separate_sibling_groups(
    graph: &LayoutGraph<'_>,
    placement: &Placement,
    config: &LayoutConfig,
    positions: &mut Positions,
) {
    let tree = graph.tree();
    let mut seen: HashSet<(&PersonId, &PersonId)> = HashSet::new();

    for rel in tree.relations() {
        if rel.kind != RelationKind::Sibling || rel.from == rel.to {
            continue;
        }
        let (first, second) = (&rel.from, &rel.to);
        if seen.contains(&(second, first)) || !seen.insert((first, second)) {
            continue;
        }
        if graph.have_common_parent(first, second) {
            continue;
        }
        let (Some(first_block), Some(second_block)) =
            (placement.anchor_of(first), placement.anchor_of(second))
        else {
            continue;
        };
        if first_block == second_block {
            continue;
        }
        let (Some(first_left), Some(second_left)) = (
            block_edge(placement, config, positions, first_block, Edge::Left),
            block_edge(placement, config, positions, second_block, Edge::Left),
        ) else {
            continue;
        };
        let (left, right) = if first_left <= second_left {
            (first_block, second_block)
        } else {
            (second_block, first_block)
        };
        let (Some(left_edge), Some(right_edge)) = (
            block_edge(placement, config, positions, left, Edge::Right),
            block_edge(placement, config, positions, right, Edge::Left),
        ) else {
            continue;
        };

        let dx = left_edge + config.sibling_gap() - right_edge;
        if dx > 0.0 {
            tracing::trace!(%first, %second, %right, dx, "separating sibling groups");
            shift_rightwards(placement, positions, right, dx);
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
}

/// Outer edge of the block drawn for `anchor` and the partner beside them.
fn block_edge(
    placement: &Placement,
    config: &LayoutConfig,
    positions: &Positions,
    anchor: &PersonId,
    edge: Edge,
) -> Option<f32> {
    let own = positions.get(anchor)?.x;
    let partner = placement
        .partner_of(anchor)
        .and_then(|partner| positions.get(partner))
        .map(|point| point.x);
    let half = config.node_width() / 2.0;
    Some(match (edge, partner) {
        (Edge::Left, Some(px)) => own.min(px) - half,
        (Edge::Left, None) => own - half,
        (Edge::Right, Some(px)) => own.max(px) + half,
        (Edge::Right, None) => own + half,
    })
}

/// Moves the block of `anchor` with its subtree, then every block after it
/// in its row, climbing through the parent blocks up to the top-level row.
fn shift_rightwards(placement: &Placement, positions: &mut Positions, anchor: &PersonId, dx: f32) {
    shift_subtree(placement, positions, anchor, dx);
    let mut current = anchor;
    loop {
        let (later, parent) = placement.later_in_row(current);
        for block in later {
            shift_subtree(placement, positions, block, dx);
        }
        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
}

/// Moves the block of `anchor`, their partner and every block below it.
fn shift_subtree(placement: &Placement, positions: &mut Positions, anchor: &PersonId, dx: f32) {
    let mut stack = vec![anchor];
    while let Some(current) = stack.pop() {
        positions.shift_x(current, dx);
        if let Some(partner) = placement.partner_of(current) {
            positions.shift_x(partner, dx);
        }
        stack.extend(placement.child_blocks(current));
    }
}
