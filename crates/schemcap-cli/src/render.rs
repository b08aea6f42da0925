use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use schemcap_engine::render::{render, save};
use schemcap_engine::sketch::SketchLibrary;
use schemcap_engine::ComponentRegistry;

use crate::common::{read_circuit, PreferenceArgs};
use crate::status;

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Render a schematic as an SVG drawing")]
pub struct RenderArgs {
    /// Schematic to render
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Output SVG. Defaults to the schematic path with an .svg extension.
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Directory of symbol sketches, laid out as <dir>/<style>/<key>.svg.
    /// Component outlines are drawn when omitted.
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub sketches: Option<PathBuf>,

    #[command(flatten)]
    pub prefs: PreferenceArgs,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    let preferences = args.prefs.load()?;
    let registry = ComponentRegistry::new().context("Invalid component catalogue")?;
    let circuit = read_circuit(&args.schematic, &registry, &preferences)?;

    let mut library = args
        .sketches
        .as_ref()
        .map(|dir| SketchLibrary::new(dir, preferences.style));

    let document = render(&circuit, &preferences, library.as_mut())
        .with_context(|| format!("Failed to render {}", args.schematic.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.schematic.with_extension("svg"));
    save(&document, &output)?;
    info!("Rendered {} component(s)", circuit.components().len());

    println!("{}", status::done(format!("Wrote {}", output.display())));
    Ok(())
}
