use crate::layout::Layout;
use crate::model::RelationKind;
use crate::tree::FamilyTree;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JSON-friendly view of a computed layout, used for debugging and for
/// the fixture suite.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub roots: Vec<String>,
    pub nodes: Vec<NodeDump>,
    pub connectors: Vec<ConnectorDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub partner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub kind: RelationKind,
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, tree: &FamilyTree) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.to_string(),
                name: tree
                    .person(&node.id)
                    .map(|person| person.full_name())
                    .unwrap_or_default(),
                x: node.x,
                y: node.y,
                radius: node.radius,
                partner: node.partner.as_ref().map(ToString::to_string),
            })
            .collect();

        let connectors = layout
            .connectors
            .iter()
            .map(|connector| ConnectorDump {
                kind: connector.kind,
                from: connector.from.to_string(),
                to: connector.to.to_string(),
                points: connector.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.bounds.width(),
            height: layout.bounds.height(),
            roots: layout.roots.iter().map(ToString::to_string).collect(),
            nodes,
            connectors,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, tree: &FamilyTree) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, tree);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::model::Person;
    use chrono::NaiveDate;

    #[test]
    fn dump_names_people_and_kinds() {
        let mut tree = FamilyTree::new();
        let born = NaiveDate::from_ymd_opt(1980, 5, 1).unwrap();
        tree.add_person(Person::new("a".into(), "Ann", "Lee", born));
        tree.add_person(Person::new("b".into(), "Bo", "Lee", born));
        tree.add_parent_child(&"a".into(), &"b".into()).unwrap();

        let layout = compute_layout(&tree, &LayoutConfig::default());
        let dump = LayoutDump::from_layout(&layout, &tree);
        assert_eq!(dump.roots, vec!["a".to_string()]);
        assert_eq!(dump.nodes[0].name, "Ann Lee");

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["connectors"][0]["kind"], "PARENT");
        assert!(json["nodes"][0]["partner"].is_null());
    }

    #[test]
    fn writes_pretty_json_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let tree = FamilyTree::new();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        write_layout_dump(&path, &layout, &tree).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"nodes\": []"));
    }
}
