use crate::error::CyclicRelationError;
use crate::model::{Person, PersonId, PersonPatch, Relation, RelationKind};
use std::collections::{BTreeMap, HashSet};

/// Relationship graph: people keyed by id plus typed relation edges in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    pub(crate) people: BTreeMap<PersonId, Person>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) edges: HashSet<Relation>,
}

/// Relative kinds offered when adding a new person next to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeKind {
    Child,
    Parent,
    Spouse,
    Sibling,
}

impl RelativeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "child" => Some(Self::Child),
            "parent" => Some(Self::Parent),
            "spouse" => Some(Self::Spouse),
            "sibling" => Some(Self::Sibling),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Edges pointing at the person; yields `from`.
    Incoming,
    /// Edges leaving the person; yields `to`.
    Outgoing,
}

/// Lazy view over the relation store. Cloning it (or calling the query
/// again) restarts the scan; dangling ids are skipped.
#[derive(Debug, Clone)]
pub struct Related<'a> {
    people: &'a BTreeMap<PersonId, Person>,
    relations: std::slice::Iter<'a, Relation>,
    id: PersonId,
    kind: RelationKind,
    direction: Direction,
}

impl<'a> Iterator for Related<'a> {
    type Item = &'a Person;

    fn next(&mut self) -> Option<Self::Item> {
        for rel in self.relations.by_ref() {
            if rel.kind != self.kind {
                continue;
            }
            let other = match self.direction {
                Direction::Incoming if rel.to == self.id => &rel.from,
                Direction::Outgoing if rel.from == self.id => &rel.to,
                _ => continue,
            };
            if let Some(person) = self.people.get(other) {
                return Some(person);
            }
        }
        None
    }
}

/// Recorded siblings followed by everyone sharing a parent, each once.
#[derive(Debug, Clone)]
pub struct Siblings<'a> {
    tree: &'a FamilyTree,
    id: PersonId,
    recorded: Related<'a>,
    parents: Related<'a>,
    children: Option<Related<'a>>,
    seen: HashSet<&'a PersonId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = &'a Person;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let candidate = if let Some(person) = self.recorded.next() {
                person
            } else if let Some(children) = self.children.as_mut()
                && let Some(person) = children.next()
            {
                person
            } else if let Some(parent) = self.parents.next() {
                self.children = Some(self.tree.children_of(&parent.id));
                continue;
            } else {
                return None;
            };
            if candidate.id != self.id && self.seen.insert(&candidate.id) {
                return Some(candidate);
            }
        }
    }
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.people.contains_key(id)
    }

    /// Inserts or replaces the person stored under `person.id`.
    pub fn add_person(&mut self, person: Person) {
        tracing::debug!(id = %person.id, name = %person.full_name(), "add person");
        self.people.insert(person.id.clone(), person);
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.people.get(id)
    }

    /// People in id order.
    pub fn people(&self) -> impl Iterator<Item = &Person> + Clone + '_ {
        self.people.values()
    }

    /// Relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn has_relation(&self, relation: &Relation) -> bool {
        self.edges.contains(relation)
    }

    /// Applies `patch` in place. Returns `false` for unknown ids.
    pub fn edit_person(&mut self, id: &PersonId, patch: PersonPatch) -> bool {
        let Some(person) = self.people.get_mut(id) else {
            return false;
        };
        patch.apply(person);
        tracing::debug!(%id, "edit person");
        true
    }

    pub fn parents_of(&self, id: &PersonId) -> Related<'_> {
        self.related(id, RelationKind::Parent, Direction::Incoming)
    }

    pub fn children_of(&self, id: &PersonId) -> Related<'_> {
        self.related(id, RelationKind::Parent, Direction::Outgoing)
    }

    pub fn spouses_of(&self, id: &PersonId) -> Related<'_> {
        self.related(id, RelationKind::Spouse, Direction::Outgoing)
    }

    /// Explicitly recorded siblings only (the sibling index used by
    /// relation propagation).
    pub fn recorded_siblings_of(&self, id: &PersonId) -> Related<'_> {
        self.related(id, RelationKind::Sibling, Direction::Outgoing)
    }

    /// Recorded siblings plus full and half siblings through a shared parent.
    pub fn siblings_of(&self, id: &PersonId) -> Siblings<'_> {
        Siblings {
            tree: self,
            id: id.clone(),
            recorded: self.recorded_siblings_of(id),
            parents: self.parents_of(id),
            children: None,
            seen: HashSet::new(),
        }
    }

    fn related(&self, id: &PersonId, kind: RelationKind, direction: Direction) -> Related<'_> {
        Related {
            people: &self.people,
            relations: self.relations.iter(),
            id: id.clone(),
            kind,
            direction,
        }
    }

    /// People without a resolvable parent, in id order.
    pub fn roots(&self) -> impl Iterator<Item = &Person> + '_ {
        self.people
            .values()
            .filter(|person| self.parents_of(&person.id).next().is_none())
    }

    /// Whether `a` and `b` share a parent that is actually in the tree.
    pub fn have_common_parent(&self, a: &PersonId, b: &PersonId) -> bool {
        self.relations.iter().any(|rel| {
            rel.kind == RelationKind::Parent
                && rel.to == *a
                && self.contains(&rel.from)
                && self.edges.contains(&Relation::parent(&rel.from, b))
        })
    }

    /// First recognised spouse: both directed SPOUSE edges present, the
    /// partner exists and is not `id` itself.
    pub fn partner_of(&self, id: &PersonId) -> Option<&Person> {
        self.spouses_of(id)
            .find(|spouse| spouse.id != *id && self.edges.contains(&Relation::spouse(&spouse.id, id)))
    }

    /// Links `parent` to `child` and propagates the new parent to the
    /// child's recorded siblings and the parent's spouses to the child.
    /// Rejected atomically when any resulting edge closes a cycle.
    pub fn add_parent_child(
        &mut self,
        parent: &PersonId,
        child: &PersonId,
    ) -> Result<(), CyclicRelationError> {
        self.transaction(|tree| tree.link_parent_child(parent, child))
    }

    /// Records the couple and lets `b` adopt the existing children of `a`.
    pub fn add_spouse(&mut self, a: &PersonId, b: &PersonId) -> Result<(), CyclicRelationError> {
        self.transaction(|tree| {
            tree.insert_edge(Relation::spouse(a, b));
            tree.insert_edge(Relation::spouse(b, a));
            for child in ids_of(tree.children_of(a)) {
                tree.link_parent_child(b, &child)?;
            }
            Ok(())
        })
    }

    /// Records `a` and `b` as siblings, lets each inherit the other's
    /// parents and joins their recorded sibling groups.
    pub fn add_sibling(&mut self, a: &PersonId, b: &PersonId) -> Result<(), CyclicRelationError> {
        self.transaction(|tree| {
            tree.insert_edge(Relation::sibling(a, b));
            tree.insert_edge(Relation::sibling(b, a));

            let parents_of_a = ids_of(tree.parents_of(a));
            let parents_of_b = ids_of(tree.parents_of(b));
            for parent in &parents_of_a {
                tree.link_parent_child(parent, b)?;
            }
            for parent in &parents_of_b {
                tree.link_parent_child(parent, a)?;
            }

            let siblings_of_a = ids_of(tree.recorded_siblings_of(a));
            let siblings_of_b = ids_of(tree.recorded_siblings_of(b));
            for sibling in siblings_of_a.iter().filter(|id| *id != b) {
                tree.insert_edge(Relation::sibling(sibling, b));
                tree.insert_edge(Relation::sibling(b, sibling));
            }
            for sibling in siblings_of_b.iter().filter(|id| *id != a) {
                tree.insert_edge(Relation::sibling(sibling, a));
                tree.insert_edge(Relation::sibling(a, sibling));
            }
            Ok(())
        })
    }

    /// Inserts `person` and links it to `base`. Nothing is kept when the
    /// link is rejected.
    pub fn add_relative(
        &mut self,
        base: &PersonId,
        person: Person,
        kind: RelativeKind,
    ) -> Result<PersonId, CyclicRelationError> {
        let id = person.id.clone();
        let replaced = self.people.insert(id.clone(), person);
        let linked = match kind {
            RelativeKind::Child => self.add_parent_child(base, &id),
            RelativeKind::Parent => self.add_parent_child(&id, base),
            RelativeKind::Spouse => self.add_spouse(base, &id),
            RelativeKind::Sibling => self.add_sibling(base, &id),
        };
        match linked {
            Ok(()) => {
                tracing::debug!(%base, %id, ?kind, "add relative");
                Ok(id)
            }
            Err(err) => {
                match replaced {
                    Some(previous) => self.people.insert(id, previous),
                    None => self.people.remove(&id),
                };
                Err(err)
            }
        }
    }

    fn link_parent_child(
        &mut self,
        parent: &PersonId,
        child: &PersonId,
    ) -> Result<(), CyclicRelationError> {
        let siblings = ids_of(self.recorded_siblings_of(child));
        let spouses = ids_of(self.spouses_of(parent));

        self.insert_parent_edge(parent, child)?;
        for sibling in &siblings {
            self.insert_parent_edge(parent, sibling)?;
        }
        for spouse in &spouses {
            self.insert_parent_edge(spouse, child)?;
        }
        Ok(())
    }

    fn insert_parent_edge(
        &mut self,
        parent: &PersonId,
        child: &PersonId,
    ) -> Result<(), CyclicRelationError> {
        let relation = Relation::parent(parent, child);
        if self.edges.contains(&relation) {
            return Ok(());
        }
        if parent == child || self.is_descendant(parent, child) {
            tracing::warn!(%parent, %child, "rejected cyclic parent relation");
            return Err(CyclicRelationError::new(parent, child));
        }
        self.insert_edge(relation);
        Ok(())
    }

    /// Whether `candidate` is reachable from `ancestor` through PARENT edges.
    pub fn is_descendant(&self, candidate: &PersonId, ancestor: &PersonId) -> bool {
        let mut visited: HashSet<&PersonId> = HashSet::new();
        let mut stack: Vec<&PersonId> = vec![ancestor];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for rel in &self.relations {
                if rel.kind != RelationKind::Parent || rel.from != *current {
                    continue;
                }
                if rel.to == *candidate {
                    return true;
                }
                if !visited.contains(&rel.to) {
                    stack.push(&rel.to);
                }
            }
        }
        false
    }

    pub(crate) fn insert_edge(&mut self, relation: Relation) -> bool {
        if self.edges.contains(&relation) {
            return false;
        }
        tracing::debug!(from = %relation.from, to = %relation.to, kind = ?relation.kind, "add relation");
        self.edges.insert(relation.clone());
        self.relations.push(relation);
        true
    }

    /// Runs `apply` and drops every edge it appended when it fails.
    fn transaction<T>(
        &mut self,
        apply: impl FnOnce(&mut Self) -> Result<T, CyclicRelationError>,
    ) -> Result<T, CyclicRelationError> {
        let mark = self.relations.len();
        let result = apply(self);
        if result.is_err() {
            for relation in self.relations.drain(mark..) {
                self.edges.remove(&relation);
            }
        }
        result
    }
}

fn ids_of<'a>(people: impl Iterator<Item = &'a Person>) -> Vec<PersonId> {
    people.map(|person| person.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tree_with(ids: &[&str]) -> FamilyTree {
        let mut tree = FamilyTree::new();
        for id in ids {
            tree.add_person(person(id));
        }
        tree
    }

    fn person(id: &str) -> Person {
        Person::new(
            id.into(),
            id.to_uppercase(),
            "Test",
            NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(),
        )
    }

    fn id(raw: &str) -> PersonId {
        PersonId::from(raw)
    }

    fn names<'a>(people: impl Iterator<Item = &'a Person>) -> Vec<String> {
        let mut out: Vec<String> = people.map(|p| p.id.to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn rejects_ancestor_cycles_without_mutation() {
        let mut tree = tree_with(&["a", "b", "c"]);
        tree.add_parent_child(&id("a"), &id("b")).unwrap();
        tree.add_parent_child(&id("b"), &id("c")).unwrap();
        let before = tree.relations().to_vec();

        let err = tree.add_parent_child(&id("c"), &id("a")).unwrap_err();
        assert_eq!(err.parent, id("c"));
        assert_eq!(err.child, id("a"));
        assert_eq!(tree.relations(), before.as_slice());

        assert!(tree.add_parent_child(&id("a"), &id("a")).is_err());
        assert_eq!(tree.relations(), before.as_slice());
    }

    #[test]
    fn duplicate_requests_store_one_edge() {
        let mut tree = tree_with(&["a", "b"]);
        tree.add_parent_child(&id("a"), &id("b")).unwrap();
        tree.add_parent_child(&id("a"), &id("b")).unwrap();
        tree.add_sibling(&id("a"), &id("c")).unwrap();
        tree.add_sibling(&id("a"), &id("c")).unwrap();
        let parent_edges = tree
            .relations()
            .iter()
            .filter(|r| r.kind == RelationKind::Parent && r.from == id("a") && r.to == id("b"))
            .count();
        assert_eq!(parent_edges, 1);
        let sibling_edges = tree
            .relations()
            .iter()
            .filter(|r| r.kind == RelationKind::Sibling && r.from == id("a") && r.to == id("c"))
            .count();
        assert_eq!(sibling_edges, 1);
        assert_eq!(tree.relations().len(), 3);
    }

    #[test]
    fn marrying_own_child_is_rejected() {
        let mut tree = tree_with(&["a", "b"]);
        tree.add_parent_child(&id("a"), &id("b")).unwrap();
        // b would have to adopt itself.
        assert!(tree.add_spouse(&id("a"), &id("b")).is_err());
        assert_eq!(tree.relations().len(), 1);
    }

    #[test]
    fn spouse_duplicates_are_collapsed() {
        let mut tree = tree_with(&["a", "b"]);
        tree.add_spouse(&id("a"), &id("b")).unwrap();
        tree.add_spouse(&id("a"), &id("b")).unwrap();
        tree.add_spouse(&id("b"), &id("a")).unwrap();
        assert_eq!(tree.relations().len(), 2);
        assert_eq!(tree.partner_of(&id("a")).map(|p| p.id.clone()), Some(id("b")));
    }

    #[test]
    fn sibling_links_are_transitive() {
        let mut tree = tree_with(&["a", "b", "c"]);
        tree.add_sibling(&id("a"), &id("b")).unwrap();
        tree.add_sibling(&id("b"), &id("c")).unwrap();
        assert_eq!(names(tree.siblings_of(&id("a"))), vec!["b", "c"]);
        assert_eq!(names(tree.siblings_of(&id("c"))), vec!["a", "b"]);
        assert_eq!(names(tree.recorded_siblings_of(&id("a"))), vec!["b", "c"]);
    }

    #[test]
    fn spouse_of_parent_becomes_co_parent() {
        let mut tree = tree_with(&["a", "b", "kid"]);
        tree.add_spouse(&id("a"), &id("b")).unwrap();
        tree.add_parent_child(&id("a"), &id("kid")).unwrap();
        assert_eq!(names(tree.parents_of(&id("kid"))), vec!["a", "b"]);
    }

    #[test]
    fn new_sibling_inherits_parents() {
        let mut tree = tree_with(&["p", "a", "b"]);
        tree.add_parent_child(&id("p"), &id("a")).unwrap();
        tree.add_sibling(&id("a"), &id("b")).unwrap();
        assert_eq!(names(tree.parents_of(&id("b"))), vec!["p"]);
    }

    #[test]
    fn new_parent_propagates_to_recorded_siblings() {
        let mut tree = tree_with(&["p", "a", "b"]);
        tree.add_sibling(&id("a"), &id("b")).unwrap();
        tree.add_parent_child(&id("p"), &id("a")).unwrap();
        assert_eq!(names(tree.children_of(&id("p"))), vec!["a", "b"]);
    }

    #[test]
    fn propagated_cycle_rejects_whole_call() {
        // b is a's sibling and p descends from b: linking p above a would
        // also make p a parent of b.
        let mut tree = tree_with(&["a", "b", "p"]);
        tree.add_sibling(&id("a"), &id("b")).unwrap();
        tree.add_parent_child(&id("b"), &id("p")).unwrap();
        let before = tree.relations().to_vec();

        let err = tree.add_parent_child(&id("p"), &id("a")).unwrap_err();
        assert_eq!(err.child, id("b"));
        assert_eq!(tree.relations(), before.as_slice());
        assert_eq!(tree.parents_of(&id("a")).count(), 0);
    }

    #[test]
    fn queries_skip_dangling_references() {
        let mut tree = tree_with(&["a"]);
        tree.add_parent_child(&id("ghost"), &id("a")).unwrap();
        tree.add_sibling(&id("a"), &id("missing")).unwrap();
        assert_eq!(tree.parents_of(&id("a")).count(), 0);
        assert_eq!(tree.siblings_of(&id("a")).count(), 0);
        assert_eq!(names(tree.roots()), vec!["a"]);
    }

    #[test]
    fn queries_are_restartable() {
        let mut tree = tree_with(&["p", "a", "b"]);
        tree.add_parent_child(&id("p"), &id("a")).unwrap();
        tree.add_parent_child(&id("p"), &id("b")).unwrap();
        let children = tree.children_of(&id("p"));
        assert_eq!(children.clone().count(), 2);
        assert_eq!(children.count(), 2);
        assert_eq!(tree.children_of(&id("p")).count(), 2);
    }

    #[test]
    fn end_to_end_family_building() {
        let mut tree = tree_with(&["r", "c1", "c2", "c3", "s"]);
        tree.add_parent_child(&id("r"), &id("c1")).unwrap();
        tree.add_parent_child(&id("r"), &id("c2")).unwrap();
        tree.add_spouse(&id("r"), &id("s")).unwrap();
        assert_eq!(names(tree.parents_of(&id("c1"))), vec!["r", "s"]);
        assert_eq!(names(tree.parents_of(&id("c2"))), vec!["r", "s"]);

        tree.add_sibling(&id("c1"), &id("c3")).unwrap();
        assert_eq!(names(tree.parents_of(&id("c3"))), vec!["r", "s"]);
        assert_eq!(names(tree.siblings_of(&id("c2"))), vec!["c1", "c3"]);
    }

    #[test]
    fn add_relative_rolls_back_person_on_cycle() {
        let mut tree = tree_with(&["a"]);
        let added = tree.add_relative(&id("a"), person("a2"), RelativeKind::Child);
        assert_eq!(added, Ok(id("a2")));
        let mut clash = person("a");
        clash.first_name = "Clash".to_string();
        // Same id as the base: becoming its own child is rejected.
        assert!(tree.add_relative(&id("a"), clash, RelativeKind::Child).is_err());
        assert_eq!(tree.person(&id("a")).unwrap().first_name, "A");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn edit_person_updates_in_place() {
        let mut tree = tree_with(&["a"]);
        let patch = PersonPatch {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert!(tree.edit_person(&id("a"), patch.clone()));
        assert!(!tree.edit_person(&id("zz"), patch));
        assert_eq!(tree.person(&id("a")).unwrap().first_name, "Ada");
    }

    #[test]
    fn dangling_parent_is_not_a_common_parent() {
        let mut tree = tree_with(&["a", "b", "p"]);
        tree.add_parent_child(&id("ghost"), &id("a")).unwrap();
        tree.add_parent_child(&id("ghost"), &id("b")).unwrap();
        assert!(!tree.have_common_parent(&id("a"), &id("b")));

        tree.add_parent_child(&id("p"), &id("a")).unwrap();
        tree.add_parent_child(&id("p"), &id("b")).unwrap();
        assert!(tree.have_common_parent(&id("a"), &id("b")));
    }

    #[test]
    fn self_referencing_spouse_is_not_a_partner() {
        let mut tree = tree_with(&["a"]);
        tree.add_spouse(&id("a"), &id("a")).unwrap();
        tree.add_sibling(&id("a"), &id("a")).unwrap();
        assert!(tree.partner_of(&id("a")).is_none());
        assert_eq!(tree.siblings_of(&id("a")).count(), 0);
    }
}
