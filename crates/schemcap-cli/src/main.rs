use clap::{Parser, Subcommand};

mod common;
mod netlist;
mod place;
mod render;
mod route;
mod sketch_key;
mod status;

#[derive(Parser)]
#[command(name = "schemcap")]
#[command(about = "Schematic placement, wire routing and rendering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place components and write the resulting schematic
    #[command(alias = "p")]
    Place(place::PlaceArgs),

    /// Find a wire route on the routing grid
    Route(route::RouteArgs),

    /// Print the netlist of a schematic
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// Render a schematic to SVG
    #[command(alias = "r")]
    Render(render::RenderArgs),

    /// Print the sketch file key of a component symbol
    SketchKey(sketch_key::SketchKeyArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Place(args) => place::execute(args),
        Commands::Route(args) => route::execute(args),
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Render(args) => render::execute(args),
        Commands::SketchKey(args) => sketch_key::execute(args),
    }
}
