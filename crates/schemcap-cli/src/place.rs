use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use schemcap_engine::{Circuit, CircuitConfig, ComponentRegistry, Position};

use crate::common::{parse_point, read_circuit, write_output, PreferenceArgs};
use crate::status;

/// `TAG[:KIND]@x1,y1,x2,y2`, e.g. `R@0,0,2,0` or `M:pmos@2,2,2,0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentPlacement {
    pub type_tag: String,
    pub kind: String,
    pub from: Position,
    pub to: Position,
}

impl FromStr for ComponentPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (component, coordinates) = s
            .split_once('@')
            .ok_or_else(|| format!("expected `TAG[:KIND]@x1,y1,x2,y2`, got `{s}`"))?;
        let (type_tag, kind) = component.split_once(':').unwrap_or((component, ""));
        if type_tag.is_empty() {
            return Err(format!("missing component type in `{s}`"));
        }

        let numbers: Vec<&str> = coordinates.split(',').collect();
        if numbers.len() != 4 {
            return Err(format!("expected four coordinates in `{s}`"));
        }
        let from = parse_point(&format!("{},{}", numbers[0], numbers[1]))?;
        let to = parse_point(&format!("{},{}", numbers[2], numbers[3]))?;

        Ok(Self {
            type_tag: type_tag.to_string(),
            kind: kind.to_string(),
            from,
            to,
        })
    }
}

impl fmt::Display for ComponentPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_tag)?;
        if !self.kind.is_empty() {
            write!(f, ":{}", self.kind)?;
        }
        write!(
            f,
            "@{},{},{},{}",
            self.from.x, self.from.y, self.to.x, self.to.y
        )
    }
}

#[derive(Args, Debug, Clone)]
#[command(about = "Place components between pairs of points and write the schematic")]
pub struct PlaceArgs {
    /// Components to place, as TAG[:KIND]@x1,y1,x2,y2
    #[arg(value_name = "COMPONENT", required = true)]
    pub components: Vec<ComponentPlacement>,

    /// Existing schematic to add the components to
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Where to write the schematic. Defaults to stdout.
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Snap points to existing nodes and the grid before placing
    #[arg(long)]
    pub snap: bool,

    #[command(flatten)]
    pub prefs: PreferenceArgs,
}

pub fn execute(args: PlaceArgs) -> Result<()> {
    let preferences = args.prefs.load()?;
    let registry = ComponentRegistry::new().context("Invalid component catalogue")?;

    let mut circuit = match &args.input {
        Some(path) => read_circuit(path, &registry, &preferences)?,
        None => Circuit::new(&registry, CircuitConfig::from(&preferences)),
    };

    for placement in &args.components {
        let (from, to) = if args.snap {
            (
                circuit.snap(placement.from.x, placement.from.y),
                circuit.snap(placement.to.x, placement.to.y),
            )
        } else {
            (placement.from, placement.to)
        };
        let name = circuit
            .create(&placement.type_tag, &placement.kind, from.x, from.y, to.x, to.y)
            .with_context(|| format!("Failed to place {placement}"))?;
        info!("Placed {name} from {placement}");
    }

    let schematic = circuit
        .schematic(&preferences)
        .context("Failed to build schematic")?;
    write_output(args.output.as_deref(), &schematic.to_string())?;

    if let Some(path) = &args.output {
        eprintln!(
            "{}",
            status::done(format!(
                "Placed {} component(s), wrote {}",
                args.components.len(),
                path.display()
            ))
        );
    }
    Ok(())
}
