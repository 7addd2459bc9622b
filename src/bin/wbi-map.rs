use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use wbi_map::classify::{Swatch, legend_entries, legend_html};
use wbi_map::tooltip::{Bounds, LatLng, RegionFeature, TooltipResolver};
use wbi_map::{NumeralFormatter, load};

#[derive(Parser, Debug)]
#[command(
    name = "wbi-map",
    version,
    about = "Classify, color & describe indicator values for a choropleth map"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the legend for an indicator.
    Legend(LegendArgs),
    /// Print the fill color of a region.
    Color(RegionArgs),
    /// Print the tooltip of a region.
    Tooltip(TooltipArgs),
}

#[derive(Args, Debug)]
struct Sources {
    /// Indicator configuration document (JSON).
    #[arg(long)]
    configs: PathBuf,
    /// Metadata + data document (JSON).
    #[arg(long)]
    global: PathBuf,
    /// Indicator id, e.g. literacy_rate.
    #[arg(short, long)]
    indicator: String,
}

#[derive(ValueEnum, Clone, Debug)]
enum LegendFormat {
    Text,
    Html,
    Json,
}

#[derive(Args, Debug)]
struct LegendArgs {
    #[command(flatten)]
    sources: Sources,
    /// Output format (default text).
    #[arg(long, value_enum, default_value = "text")]
    format: LegendFormat,
}

#[derive(Args, Debug)]
struct RegionArgs {
    #[command(flatten)]
    sources: Sources,
    /// ISO code of the region (e.g., KEN).
    #[arg(long)]
    iso: String,
    /// Selected year for year-enabled indicators (e.g., 2015).
    #[arg(short, long)]
    year: Option<String>,
}

#[derive(Args, Debug)]
struct TooltipArgs {
    #[command(flatten)]
    region: RegionArgs,
    /// Title shown above the value. Defaults to the region key.
    #[arg(long)]
    name: Option<String>,
    /// Print the full popup markup instead of the value only.
    #[arg(long, default_value_t = false)]
    markup: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Legend(args) => cmd_legend(args),
        Command::Color(args) => cmd_color(args),
        Command::Tooltip(args) => cmd_tooltip(args),
    }
}

fn cmd_legend(args: LegendArgs) -> Result<()> {
    let configs = load::read_configs(&args.sources.configs)?;
    let global = load::read_global(&args.sources.global)?;
    let formatter = NumeralFormatter::default();
    let indicator = &args.sources.indicator;
    let entries = legend_entries(&configs, &global.meta, indicator, &formatter)
        .ok_or_else(|| anyhow!("no legend available for indicator {indicator}"))?;

    match args.format {
        LegendFormat::Html => println!("{}", legend_html(&entries)),
        LegendFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        LegendFormat::Text => {
            for entry in &entries {
                let swatch = match &entry.swatch {
                    Swatch::Fragile => "fragile",
                    Swatch::Color(color) => color.as_str(),
                };
                println!("{swatch:<8}  {}", entry.label);
            }
        }
    }
    Ok(())
}

fn cmd_color(args: RegionArgs) -> Result<()> {
    let configs = load::read_configs(&args.sources.configs)?;
    let global = load::read_global(&args.sources.global)?;
    let resolver = TooltipResolver::new(&configs, &global);
    println!(
        "{}",
        resolver.fill_color(&args.iso, &args.sources.indicator, args.year.as_deref())
    );
    Ok(())
}

fn cmd_tooltip(args: TooltipArgs) -> Result<()> {
    let region = args.region;
    let configs = load::read_configs(&region.sources.configs)?;
    let global = load::read_global(&region.sources.global)?;
    let resolver = TooltipResolver::new(&configs, &global);
    let indicator = &region.sources.indicator;
    let year = region.year.as_deref();

    if !args.markup {
        println!("{}", resolver.resolve_value(&region.iso, indicator, year));
        return Ok(());
    }

    let iso_name = args
        .name
        .or_else(|| resolver.region_key(&region.iso).map(str::to_string))
        .unwrap_or_else(|| region.iso.clone());
    let origin = LatLng::new(0.0, 0.0);
    let feature = RegionFeature {
        iso: region.iso.clone(),
        iso_name,
        bounds: Bounds {
            south_west: origin,
            north_east: origin,
        },
    };
    println!("{}", resolver.markup(&feature, indicator, year));
    Ok(())
}
