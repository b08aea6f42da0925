use anyhow::{Context, Result};
use clap::Args;
use schemcap_engine::{Component, ComponentRegistry, SymbolStyle};

#[derive(Args, Debug, Clone)]
#[command(about = "Print the sketch key of a component symbol")]
pub struct SketchKeyArgs {
    /// Component type, e.g. R, M or opamp
    #[arg(value_name = "TYPE")]
    pub type_tag: String,

    /// Component kind, e.g. polar or nmos-nfet. Defaults to the family default.
    #[arg(value_name = "KIND", default_value = "")]
    pub kind: String,

    /// Style override carried by the component itself
    #[arg(long)]
    pub style: Option<SymbolStyle>,

    /// Also print the netlist line used to draw the sketch
    #[arg(long)]
    pub net: bool,
}

pub fn execute(args: SketchKeyArgs) -> Result<()> {
    let registry = ComponentRegistry::new().context("Invalid component catalogue")?;
    let family = registry.get(&args.type_tag)?;
    let kind = registry.kind(family, &args.kind)?;
    let mut component = Component::new(family.name_prefix, family, kind);
    component.style = args.style;

    println!("{}", component.sketch_key());
    if args.net {
        println!("{}", component.sketch_net(family));
    }
    Ok(())
}
