use crate::config::RenderConfig;
use crate::layout::{Bounds, ConnectorLayout, Layout, NodeLayout};
use crate::model::{PersonId, RelationKind};
use crate::theme::Theme;
use crate::tree::FamilyTree;
use anyhow::Result;
use std::path::Path;

/// Layout space grows upward; SVG space grows downward.
struct Frame {
    min_x: f32,
    max_y: f32,
    padding: f32,
}

impl Frame {
    fn new(bounds: &Bounds, padding: f32) -> Self {
        Self {
            min_x: bounds.min_x,
            max_y: bounds.max_y,
            padding,
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.min_x + self.padding, self.max_y - y + self.padding)
    }
}

pub fn render_svg(
    layout: &Layout,
    tree: &FamilyTree,
    theme: &Theme,
    config: &RenderConfig,
    highlight: Option<&PersonId>,
) -> String {
    let mut svg = String::new();
    let pad = config.padding;
    let width = (layout.bounds.width() + pad * 2.0).max(200.0);
    let height = (layout.bounds.height() + pad * 2.0).max(200.0);
    let frame = Frame::new(&layout.bounds, pad);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&config.background)
    ));

    // Connectors first so nodes cover their ends.
    for connector in &layout.connectors {
        svg.push_str(&connector_svg(connector, theme, &frame));
    }

    for node in layout.nodes.values() {
        let highlighted = highlight == Some(&node.id);
        svg.push_str(&node_svg(node, tree, theme, &frame, highlighted));
    }

    svg.push_str("</svg>");
    svg
}

fn connector_svg(connector: &ConnectorLayout, theme: &Theme, frame: &Frame) -> String {
    let points: Vec<(f32, f32)> = connector
        .points
        .iter()
        .map(|(x, y)| frame.map(*x, *y))
        .collect();
    let (stroke, dash) = match connector.kind {
        RelationKind::Parent => (&theme.parent_line_color, ""),
        RelationKind::Spouse => (&theme.spouse_line_color, ""),
        RelationKind::Sibling => (&theme.sibling_line_color, " stroke-dasharray=\"8 6\""),
    };
    format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{} />",
        points_to_path(&points),
        escape_xml(stroke),
        theme.line_width,
        dash
    )
}

fn node_svg(
    node: &NodeLayout,
    tree: &FamilyTree,
    theme: &Theme,
    frame: &Frame,
    highlighted: bool,
) -> String {
    let (cx, cy) = frame.map(node.x, node.y);
    let r = node.radius;
    let person = tree.person(&node.id);
    let fill = match person {
        Some(person) if !person.is_living() => &theme.deceased_fill,
        _ => &theme.node_fill,
    };
    let font_family = escape_xml(&theme.font_family);
    let fill = escape_xml(fill);

    let mut out = String::from("<g>");
    if let Some(person) = person {
        let mut title = person.full_name();
        if let Some(quote) = person.quote.as_deref() {
            title.push_str(&format!(" \u{201c}{quote}\u{201d}"));
        }
        out.push_str(&format!("<title>{}</title>", escape_xml(&title)));
    }
    if highlighted {
        out.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            r + 6.0,
            escape_xml(&theme.highlight_color),
            theme.line_width * 3.0
        ));
    }
    out.push_str(&format!(
        "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        escape_xml(&theme.node_border),
        theme.line_width
    ));

    let (name, lifespan) = match person {
        Some(person) => (person.first_name.clone(), person.lifespan()),
        None => (node.id.to_string(), String::new()),
    };
    let name_y = cy - r - theme.font_size * 0.5;
    out.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{name_y:.2}\" text-anchor=\"middle\" font-family=\"{font_family}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        theme.font_size,
        escape_xml(&theme.label_color),
        escape_xml(&name)
    ));
    if !lifespan.is_empty() {
        let small = theme.font_size * 0.7;
        let life_y = cy + small * 0.35;
        out.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{life_y:.2}\" text-anchor=\"middle\" font-family=\"{font_family}\" font-size=\"{small:.2}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.lifespan_color),
            escape_xml(&lifespan)
        ));
    }
    out.push_str("</g>");
    out
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in &points[1..] {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::model::Person;
    use chrono::NaiveDate;

    fn sample() -> FamilyTree {
        let mut tree = FamilyTree::new();
        let born = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
        tree.add_person(
            Person::new("ada".into(), "Ada", "Lovelace", born)
                .with_death_date(NaiveDate::from_ymd_opt(1852, 11, 27).unwrap())
                .with_quote("That brain of mine is something more than merely mortal"),
        );
        tree.add_person(Person::new("byron".into(), "Byron & Co", "King", born));
        tree.add_spouse(&"ada".into(), &"byron".into()).unwrap();
        tree
    }

    #[test]
    fn render_svg_basic() {
        let tree = sample();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        let svg = render_svg(&layout, &tree, &Theme::classic(), &RenderConfig::default(), None);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Ada</text>"));
        assert!(svg.contains("Byron &amp; Co"));
        assert!(svg.contains("1815–1852"));
        assert!(svg.contains(&Theme::classic().deceased_fill));
        assert!(svg.contains(&Theme::classic().spouse_line_color));
        assert!(!svg.contains(&Theme::classic().highlight_color));
    }

    #[test]
    fn highlight_draws_a_ring() {
        let tree = sample();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        let ada = PersonId::from("ada");
        let svg = render_svg(
            &layout,
            &tree,
            &Theme::classic(),
            &RenderConfig::default(),
            Some(&ada),
        );
        assert_eq!(svg.matches(&Theme::classic().highlight_color).count(), 1);
    }

    #[test]
    fn parents_are_drawn_above_children() {
        let mut tree = FamilyTree::new();
        let born = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
        tree.add_person(Person::new("p".into(), "Parent", "", born));
        tree.add_person(Person::new("c".into(), "Child", "", born));
        tree.add_parent_child(&"p".into(), &"c".into()).unwrap();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        let frame = Frame::new(&layout.bounds, 40.0);
        let p = &layout.nodes[&PersonId::from("p")];
        let c = &layout.nodes[&PersonId::from("c")];
        assert!(frame.map(p.x, p.y).1 < frame.map(c.x, c.y).1);
    }

    #[test]
    fn empty_tree_still_renders_a_canvas() {
        let tree = FamilyTree::new();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        let svg = render_svg(&layout, &tree, &Theme::light(), &RenderConfig::default(), None);
        assert!(svg.contains("width=\"200.00\""));
    }

    #[test]
    fn colours_are_escaped_inside_attributes() {
        let tree = sample();
        let layout = compute_layout(&tree, &LayoutConfig::default());
        let mut theme = Theme::classic();
        theme.node_fill = "red\" onload=\"x".to_string();
        theme.spouse_line_color = "<blue>".to_string();
        let config = RenderConfig {
            background: "a\"b".to_string(),
            ..RenderConfig::default()
        };
        let svg = render_svg(&layout, &tree, &theme, &config, None);
        assert!(svg.contains("fill=\"a&quot;b\""));
        assert!(svg.contains("fill=\"red&quot; onload=&quot;x\""));
        assert!(svg.contains("stroke=\"&lt;blue&gt;\""));
        assert!(!svg.contains("onload=\"x"));
    }

    #[test]
    fn escape_xml_covers_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
