use crate::config::load_config;
use crate::layout::compute_layout;
use crate::layout_dump::{write_layout_dump, LayoutDump};
use crate::model::{Person, PersonId, PersonPatch, RelationKind};
use crate::render::{render_svg, write_output_svg};
use crate::store::{TreeStore, DEFAULT_FILE};
use crate::tree::{FamilyTree, RelativeKind};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ftree", version, about = "Family tree editor and renderer")]
pub struct Args {
    /// Family tree file
    #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_FILE)]
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the tree file with a single root person
    Init,
    /// List everyone in the tree
    List,
    /// Show one person and their relatives
    Show { id: String },
    /// Add a person, optionally as a relative of someone already present
    Add(AddArgs),
    /// Link two existing people
    Link {
        /// parent (FROM is a parent of TO), spouse or sibling
        #[arg(value_parser = parse_relation_kind)]
        kind: RelationKind,
        from: String,
        to: String,
    },
    /// Edit a person's details
    Edit(EditArgs),
    /// Render the tree to SVG or PNG
    Render(RenderArgs),
    /// Write the computed layout as JSON
    Layout(LayoutArgs),
}

#[derive(ClapArgs, Debug)]
pub struct AddArgs {
    /// Full name; the first word becomes the first name
    #[arg(long)]
    pub name: String,

    /// Birth date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub born: NaiveDate,

    /// Death date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub died: Option<NaiveDate>,

    #[arg(long)]
    pub quote: Option<String>,

    /// Existing person the new one is related to
    #[arg(long = "relative-of", requires = "relation")]
    pub relative_of: Option<String>,

    /// What the new person is to `--relative-of`
    /// child, parent, spouse or sibling
    #[arg(long = "as", value_parser = parse_relative_kind, requires = "relative_of")]
    pub relation: Option<RelativeKind>,
}

#[derive(ClapArgs, Debug)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub born: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date, conflicts_with = "alive")]
    pub died: Option<NaiveDate>,

    /// Clear the death date
    #[arg(long)]
    pub alive: bool,

    /// New quote; an empty string clears it
    #[arg(long)]
    pub quote: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct RenderArgs {
    /// Output file. Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Person to ring in the highlight colour
    #[arg(long)]
    pub highlight: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct LayoutArgs {
    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let stdout = std::io::stdout();
    execute(args, &mut stdout.lock())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn execute(args: Args, out: &mut impl Write) -> Result<()> {
    let store = TreeStore::open(&args.file);
    match args.command {
        Command::Init => {
            if store.exists() {
                bail!("{} already exists", store.path().display());
            }
            let tree = store.load_or_create_root()?;
            store.save(&tree)?;
            for person in tree.people() {
                writeln!(out, "{}", person.id)?;
            }
        }
        Command::List => {
            let tree = load_existing(&store)?;
            for person in tree.people() {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    person.id,
                    person.full_name(),
                    person.lifespan()
                )?;
            }
        }
        Command::Show { id } => {
            let tree = load_existing(&store)?;
            show_person(&tree, &PersonId::from(id), out)?;
        }
        Command::Add(add) => {
            let mut tree = store.load_or_create_root()?;
            let id = add_person(&mut tree, add)?;
            store.save(&tree)?;
            writeln!(out, "{id}")?;
        }
        Command::Link { kind, from, to } => {
            let mut tree = store.load_or_create_root()?;
            let (from, to) = (PersonId::from(from), PersonId::from(to));
            require_person(&tree, &from)?;
            require_person(&tree, &to)?;
            match kind {
                RelationKind::Parent => tree.add_parent_child(&from, &to)?,
                RelationKind::Spouse => tree.add_spouse(&from, &to)?,
                RelationKind::Sibling => tree.add_sibling(&from, &to)?,
            }
            store.save(&tree)?;
        }
        Command::Edit(edit) => {
            let mut tree = store.load_or_create_root()?;
            let id = PersonId::from(edit.id.as_str());
            let patch = edit_patch(edit);
            if patch.is_empty() {
                bail!("nothing to edit");
            }
            if !tree.edit_person(&id, patch) {
                bail!("no person with id {id}");
            }
            store.save(&tree)?;
        }
        Command::Render(render) => {
            let tree = load_existing(&store)?;
            render_tree(&tree, render)?;
        }
        Command::Layout(dump) => {
            let tree = load_existing(&store)?;
            let config = load_config(dump.config.as_deref())?;
            let layout = compute_layout(&tree, &config.layout);
            match dump.output {
                Some(path) => write_layout_dump(&path, &layout, &tree)?,
                None => {
                    serde_json::to_writer_pretty(&mut *out, &LayoutDump::from_layout(&layout, &tree))?;
                    writeln!(out)?;
                }
            }
        }
    }
    Ok(())
}

/// Read-only commands never invent a root: there is nothing to show until
/// the file exists.
fn load_existing(store: &TreeStore) -> Result<FamilyTree> {
    if !store.exists() {
        bail!(
            "{} does not exist; run `ftree init` first",
            store.path().display()
        );
    }
    store.load()
}

fn add_person(tree: &mut FamilyTree, add: AddArgs) -> Result<PersonId> {
    let (first, last) = Person::split_full_name(&add.name);
    if first.is_empty() {
        bail!("name must not be empty");
    }
    let mut person = Person::new(PersonId::generate(), first, last, add.born);
    if let Some(died) = add.died {
        person = person.with_death_date(died);
    }
    if let Some(quote) = add.quote {
        person = person.with_quote(quote);
    }

    match (add.relative_of, add.relation) {
        (Some(base), Some(relation)) => {
            let base = PersonId::from(base);
            require_person(tree, &base)?;
            Ok(tree.add_relative(&base, person, relation)?)
        }
        _ => {
            let id = person.id.clone();
            tree.add_person(person);
            Ok(id)
        }
    }
}

fn edit_patch(edit: EditArgs) -> PersonPatch {
    let mut patch = PersonPatch::default();
    if let Some(name) = edit.name {
        let (first, last) = Person::split_full_name(&name);
        patch.first_name = Some(first);
        patch.last_name = Some(last);
    }
    patch.birth_date = edit.born;
    if edit.alive {
        patch.death_date = Some(None);
    } else if let Some(died) = edit.died {
        patch.death_date = Some(Some(died));
    }
    patch.quote = edit.quote.map(Some);
    patch
}

fn render_tree(tree: &FamilyTree, render: RenderArgs) -> Result<()> {
    let config = load_config(render.config.as_deref())?;
    let highlight = render.highlight.map(PersonId::from);
    if let Some(id) = &highlight
        && !tree.contains(id)
    {
        tracing::warn!(%id, "highlighted person is not in the tree");
    }
    let layout = compute_layout(tree, &config.layout);
    let svg = render_svg(&layout, tree, &config.theme, &config.render, highlight.as_ref());
    match render.output_format {
        OutputFormat::Svg => write_output_svg(&svg, render.output.as_deref()),
        OutputFormat::Png => {
            let output = render
                .output
                .context("Output path required for png output")?;
            write_png(&svg, &output, &config.render)
        }
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &std::path::Path, config: &crate::config::RenderConfig) -> Result<()> {
    crate::render::write_output_png(svg, output, config)
}

#[cfg(not(feature = "png"))]
fn write_png(_: &str, _: &std::path::Path, _: &crate::config::RenderConfig) -> Result<()> {
    bail!("PNG output requires the `png` feature")
}

fn require_person(tree: &FamilyTree, id: &PersonId) -> Result<()> {
    if !tree.contains(id) {
        bail!("no person with id {id}");
    }
    Ok(())
}

fn show_person(tree: &FamilyTree, id: &PersonId, out: &mut impl Write) -> Result<()> {
    let Some(person) = tree.person(id) else {
        bail!("no person with id {id}");
    };
    writeln!(out, "{} ({})", person.full_name(), person.id)?;
    writeln!(out, "  born: {}", person.birth_date)?;
    if let Some(died) = person.death_date {
        writeln!(out, "  died: {died}")?;
    }
    if let Some(quote) = &person.quote {
        writeln!(out, "  quote: {quote}")?;
    }
    let groups = [
        ("parents", names(tree.parents_of(id))),
        ("spouses", names(tree.spouses_of(id))),
        ("siblings", names(tree.siblings_of(id))),
        ("children", names(tree.children_of(id))),
    ];
    for (label, people) in groups {
        if !people.is_empty() {
            writeln!(out, "  {label}: {}", people.join(", "))?;
        }
    }
    Ok(())
}

fn names<'a>(people: impl Iterator<Item = &'a Person>) -> Vec<String> {
    people.map(|person| person.full_name()).collect()
}

fn parse_relation_kind(input: &str) -> Result<RelationKind, String> {
    RelationKind::from_token(input).ok_or_else(|| format!("unknown relation `{input}`"))
}

fn parse_relative_kind(input: &str) -> Result<RelativeKind, String> {
    RelativeKind::from_token(input).ok_or_else(|| format!("unknown relative `{input}`"))
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
