use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemcap_engine::ComponentRegistry;
use serde::Serialize;

use crate::common::{read_circuit, write_output, PreferenceArgs};
use crate::status;

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Print the netlist of a schematic")]
pub struct NetlistArgs {
    /// Schematic to read
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Where to write the netlist. Defaults to stdout.
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Print one JSON object per component, or the whole schematic with --full
    #[arg(long)]
    pub json: bool,

    /// Write the whole schematic, node positions and options included
    #[arg(long)]
    pub full: bool,

    #[command(flatten)]
    pub prefs: PreferenceArgs,
}

#[derive(Debug, Serialize)]
struct ComponentEntry {
    name: String,
    #[serde(rename = "type")]
    type_tag: String,
    kind: String,
    nodes: Vec<String>,
    line: String,
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    let preferences = args.prefs.load()?;
    let registry = ComponentRegistry::new().context("Invalid component catalogue")?;
    let circuit = read_circuit(&args.schematic, &registry, &preferences)?;
    let schematic = circuit
        .schematic(&preferences)
        .context("Failed to build netlist")?;

    if schematic.items.is_empty() {
        eprintln!(
            "{}",
            status::warning(format!("{} has no components", args.schematic.display()))
        );
    }

    let text = if args.full && args.json {
        format!("{}\n", schematic.to_json()?)
    } else if args.full {
        schematic.to_string()
    } else if args.json {
        let entries: Vec<ComponentEntry> = circuit
            .components()
            .iter()
            .zip(&schematic.items)
            .map(|(component, item)| ComponentEntry {
                name: component.name.clone(),
                type_tag: component.type_tag.to_string(),
                kind: component.kind.to_string(),
                nodes: component.nodes.clone(),
                line: item.to_string(),
            })
            .collect();
        format!("{}\n", serde_json::to_string_pretty(&entries)?)
    } else {
        schematic
            .items
            .iter()
            .map(|item| format!("{item}\n"))
            .collect()
    };

    write_output(args.output.as_deref(), &text)
}
