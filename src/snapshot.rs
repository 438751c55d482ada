use crate::error::SnapshotError;
use crate::model::{Person, PersonId, Relation, RelationKind};
use crate::tree::FamilyTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Complete, serialisable state of a [`FamilyTree`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub people: BTreeMap<PersonId, Person>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Snapshot {
    pub fn from_json(input: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FamilyTree {
    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            people: self.people.clone(),
            relations: self.relations.clone(),
        }
    }

    /// Replaces the whole state with `snapshot`. On error the current state
    /// is left untouched.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let tree = Self::from_snapshot(snapshot)?;
        tracing::debug!(
            people = tree.people.len(),
            relations = tree.relations.len(),
            "loaded snapshot"
        );
        *self = tree;
        Ok(())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, SnapshotError> {
        let mut tree = Self::new();
        for (key, person) in snapshot.people {
            if key != person.id {
                return Err(SnapshotError::KeyMismatch { key, id: person.id });
            }
            tree.people.insert(key, person);
        }
        for relation in snapshot.relations {
            tree.insert_edge(relation);
        }
        if let Some(id) = parent_cycle_member(&tree.relations) {
            return Err(SnapshotError::Cycle(id));
        }
        Ok(tree)
    }
}

/// Kahn's algorithm over PARENT edges; returns a person left on a cycle.
fn parent_cycle_member(relations: &[Relation]) -> Option<PersonId> {
    let mut indegree: HashMap<&PersonId, usize> = HashMap::new();
    let mut adjacency: HashMap<&PersonId, Vec<&PersonId>> = HashMap::new();
    for rel in relations.iter().filter(|rel| rel.kind == RelationKind::Parent) {
        indegree.entry(&rel.from).or_insert(0);
        *indegree.entry(&rel.to).or_insert(0) += 1;
        adjacency.entry(&rel.from).or_default().push(&rel.to);
    }

    let mut queue: VecDeque<&PersonId> = indegree
        .iter()
        .filter_map(|(id, degree)| (*degree == 0).then_some(*id))
        .collect();
    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        for next in adjacency.get(id).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*next);
                }
            }
        }
    }

    if visited == indegree.len() {
        return None;
    }
    indegree
        .into_iter()
        .filter(|(_, degree)| *degree > 0)
        .map(|(id, _)| id.clone())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn person(id: &str) -> Person {
        Person::new(
            id.into(),
            id,
            "Doe",
            NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
        )
    }

    fn populated() -> FamilyTree {
        let mut tree = FamilyTree::new();
        for id in ["r", "s", "c1", "c2"] {
            tree.add_person(person(id));
        }
        tree.edit_person(
            &"r".into(),
            crate::model::PersonPatch {
                death_date: Some(NaiveDate::from_ymd_opt(2020, 1, 2)),
                quote: Some(Some("Plant trees".to_string())),
                ..Default::default()
            },
        );
        tree.add_parent_child(&"r".into(), &"c1".into()).unwrap();
        tree.add_spouse(&"r".into(), &"s".into()).unwrap();
        tree.add_sibling(&"c1".into(), &"c2".into()).unwrap();
        tree
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let tree = populated();
        let json = tree.export_snapshot().to_json_pretty().unwrap();
        let mut restored = FamilyTree::new();
        restored
            .load_snapshot(Snapshot::from_json(&json).unwrap())
            .unwrap();

        assert_eq!(restored.export_snapshot().people, tree.export_snapshot().people);
        let original: HashSet<_> = tree.relations().iter().cloned().collect();
        let loaded: HashSet<_> = restored.relations().iter().cloned().collect();
        assert_eq!(original, loaded);
        assert_eq!(restored.relations().len(), tree.relations().len());
    }

    #[test]
    fn json_uses_camel_case_and_iso_dates() {
        let json = populated().export_snapshot().to_json_pretty().unwrap();
        assert!(json.contains("\"firstName\""));
        assert!(json.contains("\"birthDate\": \"1980-05-17\""));
        assert!(json.contains("\"deathDate\": \"2020-01-02\""));
        assert!(json.contains("\"kind\": \"SIBLING\""));
    }

    #[test]
    fn cyclic_snapshot_keeps_previous_state() {
        let mut tree = populated();
        let before = tree.export_snapshot();
        let mut broken = before.clone();
        broken
            .relations
            .push(Relation::parent(&"c1".into(), &"r".into()));

        let err = tree.load_snapshot(broken).unwrap_err();
        assert!(matches!(err, SnapshotError::Cycle(_)));
        assert_eq!(tree.export_snapshot(), before);
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let mut snapshot = Snapshot::default();
        snapshot.people.insert("a".into(), person("b"));
        let mut tree = populated();
        let err = tree.load_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, SnapshotError::KeyMismatch { .. }));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn load_replaces_instead_of_merging() {
        let mut tree = populated();
        let mut snapshot = Snapshot::default();
        snapshot.people.insert("solo".into(), person("solo"));
        snapshot
            .relations
            .push(Relation::spouse(&"solo".into(), &"gone".into()));
        snapshot
            .relations
            .push(Relation::spouse(&"solo".into(), &"gone".into()));
        tree.load_snapshot(snapshot).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.relations().len(), 1);
    }

    #[test]
    fn truncated_json_is_an_error() {
        assert!(matches!(
            Snapshot::from_json("{\"people\": {"),
            Err(SnapshotError::Json(_))
        ));
    }
}
