use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemcap_engine::router::RouterConfig;
use schemcap_engine::{simplify_path, ComponentRegistry, GridCell, Position, WireSolver};
use serde_json::json;

use crate::common::{parse_point, read_circuit, PreferenceArgs};
use crate::status;

#[derive(Args, Debug, Clone)]
#[command(about = "Find a wire route between two grid points")]
pub struct RouteArgs {
    /// Start point, as x,y
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub from: Position,

    /// End point, as x,y
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub to: Position,

    /// Extra blocked points, as x,y
    #[arg(
        long = "block",
        value_name = "POINT",
        value_parser = parse_point,
        allow_hyphen_values = true
    )]
    pub blocked: Vec<Position>,

    /// Treat the nodes of this schematic as obstacles
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub schematic: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long)]
    pub width: Option<i32>,

    /// Grid height in cells
    #[arg(long)]
    pub height: Option<i32>,

    /// Print every cell instead of the corners only
    #[arg(long)]
    pub all_cells: bool,

    /// Print the route as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub prefs: PreferenceArgs,
}

pub fn execute(args: RouteArgs) -> Result<()> {
    let defaults = RouterConfig::default();
    let mut solver = WireSolver::new(RouterConfig {
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        ..defaults
    });

    if let Some(path) = &args.schematic {
        let preferences = args.prefs.load()?;
        let registry = ComponentRegistry::new().context("Invalid component catalogue")?;
        let circuit = read_circuit(path, &registry, &preferences)?;
        solver.occupy(circuit.nodes().iter().filter_map(|node| node.position));
    }
    solver.occupy(args.blocked.iter().copied());

    let start = GridCell::nearest(args.from);
    let end = GridCell::nearest(args.to);
    let cells = solver
        .solve(start, end)
        .with_context(|| format!("Failed to route {start} to {end}"))?;
    let corners = simplify_path(&cells);

    if args.json {
        let value = json!({
            "cells": pairs(&cells),
            "corners": pairs(&corners),
            "length": cells.len() - 1,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let shown = if args.all_cells { &cells } else { &corners };
    let route: Vec<String> = shown.iter().map(ToString::to_string).collect();
    println!("{}", route.join(" -> "));
    eprintln!(
        "{}",
        status::note(format!(
            "{} cell(s), {} corner(s)",
            cells.len(),
            corners.len().saturating_sub(2)
        ))
    );
    Ok(())
}

fn pairs(cells: &[GridCell]) -> Vec<(i32, i32)> {
    cells.iter().map(|cell| (cell.x, cell.y)).collect()
}
