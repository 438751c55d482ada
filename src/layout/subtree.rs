use super::*;

/// Block tree recorded while placing: which anchor drew which child
/// blocks (left to right) and which partner was drawn beside each anchor.
#[derive(Debug, Default)]
pub(super) struct Placement {
    roots: Vec<PersonId>,
    children: HashMap<PersonId, Vec<PersonId>>,
    parent: HashMap<PersonId, PersonId>,
    partner: HashMap<PersonId, PersonId>,
    anchor: HashMap<PersonId, PersonId>,
}

impl Placement {
    /// Anchor of the block `id` was drawn in.
    pub(super) fn anchor_of(&self, id: &PersonId) -> Option<&PersonId> {
        self.anchor.get(id)
    }

    pub(super) fn partner_of(&self, anchor: &PersonId) -> Option<&PersonId> {
        self.partner.get(anchor)
    }

    pub(super) fn child_blocks(&self, anchor: &PersonId) -> &[PersonId] {
        self.children.get(anchor).map(Vec::as_slice).unwrap_or_default()
    }

    /// Blocks drawn right of `anchor` in the same row (by the same parent
    /// block, or among the top-level blocks), plus that parent block.
    pub(super) fn later_in_row(&self, anchor: &PersonId) -> (&[PersonId], Option<&PersonId>) {
        let parent = self.parent.get(anchor);
        let row = match parent {
            Some(parent) => self.child_blocks(parent),
            None => self.roots.as_slice(),
        };
        let later = row
            .iter()
            .position(|block| block == anchor)
            .map_or(&[][..], |index| &row[index + 1..]);
        (later, parent)
    }

    fn record(&mut self, anchor: &PersonId, partner: Option<&PersonId>, parent: Option<&PersonId>) {
        self.anchor.insert(anchor.clone(), anchor.clone());
        if let Some(partner) = partner {
            self.anchor.insert(partner.clone(), anchor.clone());
            self.partner.insert(anchor.clone(), partner.clone());
        }
        match parent {
            Some(parent) => {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .push(anchor.clone());
                self.parent.insert(anchor.clone(), parent.clone());
            }
            None => self.roots.push(anchor.clone()),
        }
    }
}

/// Width-then-position walk over couple blocks. Both passes are guarded
/// against revisits so malformed graphs terminate.
pub(super) struct SubtreeWalker<'g, 'a> {
    graph: &'g LayoutGraph<'a>,
    config: &'g LayoutConfig,
    widths: HashMap<PersonId, f32>,
    visiting: HashSet<PersonId>,
    placed: HashSet<PersonId>,
    placement: Placement,
}

impl<'g, 'a> SubtreeWalker<'g, 'a> {
    pub(super) fn new(graph: &'g LayoutGraph<'a>, config: &'g LayoutConfig) -> Self {
        Self {
            graph,
            config,
            widths: HashMap::new(),
            visiting: HashSet::new(),
            placed: HashSet::new(),
            placement: Placement::default(),
        }
    }

    pub(super) fn into_placement(self) -> Placement {
        self.placement
    }

    fn block_width(&self, id: &PersonId) -> f32 {
        if self.graph.partner(id).is_some() {
            self.config.couple_width()
        } else {
            self.config.node_width()
        }
    }

    /// Horizontal space of `id`, their partner and all block descendants.
    pub(super) fn width(&mut self, id: &PersonId) -> f32 {
        if let Some(width) = self.widths.get(id) {
            return *width;
        }
        let own = self.block_width(id);
        if !self.visiting.insert(id.clone()) {
            return own;
        }
        let mut children_width = 0.0;
        for child in self.graph.block_children(id) {
            children_width += self.width(child);
        }
        self.visiting.remove(id);

        let width = own.max(children_width);
        self.widths.insert(id.clone(), width);
        width
    }

    /// Places the block of `id` centred on `x` as a top-level block and
    /// recurses into its children one rank below.
    pub(super) fn place(&mut self, id: &PersonId, x: f32, y: f32, positions: &mut Positions) {
        self.place_block(id, None, x, y, positions);
    }

    fn place_block(
        &mut self,
        id: &PersonId,
        parent: Option<&PersonId>,
        x: f32,
        y: f32,
        positions: &mut Positions,
    ) {
        if !self.placed.insert(id.clone()) {
            return;
        }
        let mut beside = None;
        match self.graph.partner(id) {
            Some(partner) => {
                let half = self.config.partner_distance() / 2.0;
                positions.set(id, Point::new(x - half, y));
                if self.placed.insert(partner.clone()) {
                    positions.set(partner, Point::new(x + half, y));
                    beside = Some(partner);
                }
            }
            None => positions.set(id, Point::new(x, y)),
        }
        self.placement.record(id, beside, parent);

        let children = self.graph.block_children(id);
        if children.is_empty() {
            return;
        }
        let widths: Vec<f32> = children.iter().map(|child| self.width(child)).collect();
        let total: f32 = widths.iter().sum();
        let child_y = y - self.config.vertical_gap();
        let mut cursor = x - total / 2.0;
        for (child, width) in children.into_iter().zip(widths) {
            self.place_block(child, Some(id), cursor + width / 2.0, child_y, positions);
            cursor += width;
        }
    }
}
