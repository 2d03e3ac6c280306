use anyhow::{bail, Context, Result};
use clap::Parser;
use osmi_ptv2::{MemberObject, Relation, RouteManager};
use std::path::PathBuf;
use std::process::ExitCode;

mod assembly;
mod geometry;
mod on_track;
mod options;
mod output;
mod pbf;
mod points;
mod railway;
mod restrictions;
mod route_writer;

use assembly::RelationAssembler;
use geometry::{GeometryFactory, Projection};
use on_track::MustOnTrack;
use options::{merge_creation_options, parse_key_value, IndexType, Options, OutputFormat};
use output::open_dataset;
use pbf::{read_pass, InputSource, LocationIndex, ObjectFilter, OsmObject};
use points::PointsHandler;
use railway::RailwayHandler;
use restrictions::ViaNodes;
use route_writer::RouteWriter;

#[derive(Parser, Debug)]
#[command(
    name = "osmi-pubtrans",
    author,
    version,
    about = "Validate public transport routes in OpenStreetMap data",
    long_about = "Reads an OSM PBF file three times, validates every PTv2 public transport \
                  route relation (member roles and order, vehicle-specific way types, gaps \
                  between consecutive ways) and writes valid routes, invalid routes and \
                  error locations as GIS layers.\n\n\
                  Stations, platforms, stops, level crossings, railway switches and \
                  railway nodes that are not part of any way are exported as well."
)]
struct Args {
    /// Input OSM PBF file (`-` or nothing for standard input)
    input: Option<PathBuf>,

    /// Output dataset (default: ptv2.db for SQlite, ptv2 for GeoJSON)
    output: Option<PathBuf>,

    /// Output format: SQlite or GeoJSON
    #[arg(short, long, default_value = "SQlite")]
    format: OutputFormat,

    /// Location index type: sparse_mem_array or hash
    #[arg(short, long, default_value = "sparse_mem_array")]
    index: IndexType,

    /// Output projection (EPSG code, 4326 or 3857)
    #[arg(short, long, default_value_t = 3857)]
    srs: u32,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,

    /// Do not export level crossings
    #[arg(long)]
    no_crossings: bool,

    /// Do not export platforms
    #[arg(long)]
    no_platforms: bool,

    /// Do not export railway switches
    #[arg(long)]
    no_points: bool,

    /// Do not check signals, switches and other railway nodes for being on a way
    #[arg(long)]
    no_railway_details: bool,

    /// Do not export stations
    #[arg(long)]
    no_stations: bool,

    /// Do not export stop positions
    #[arg(long)]
    no_stops: bool,

    /// Dataset creation option, can be given multiple times
    #[arg(long = "dsco", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    dsco: Vec<(String, String)>,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            index_type: self.index,
            output_format: self.format,
            srs: self.srs,
            verbose: self.verbose,
            crossings: !self.no_crossings,
            platforms: !self.no_platforms,
            points: !self.no_points,
            railway_details: !self.no_railway_details,
            stations: !self.no_stations,
            stops: !self.no_stops,
            creation_options: merge_creation_options(self.format, self.dsco.clone()),
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // Usage errors exit with 1, help and version output with 0.
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let options = args.options();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if options.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    match run(args, options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn complete_route(
    manager: &mut RouteManager,
    writer: &mut RouteWriter,
    relation: &Relation,
    members: &[MemberObject<'_>],
) -> Result<()> {
    manager
        .process(relation, members, writer)
        .with_context(|| format!("Failed to validate relation {}", relation.id))?;
    Ok(())
}

fn run(args: Args, options: Options) -> Result<()> {
    let projection = Projection::from_epsg(options.srs)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(options.output_format.default_output()));

    log::info!("=== osmi-pubtrans ===");
    log::info!(
        "Output: {} ({}, EPSG:{})",
        output_path.display(),
        options.output_format,
        projection.epsg()
    );

    if output_path.exists() {
        bail!("Output {} already exists", output_path.display());
    }

    let input = InputSource::open(args.input.as_deref())?;
    log::info!("Input: {}", input.describe());

    let dataset = open_dataset(options.output_format, &output_path, options.srs, &options.creation_options)
        .with_context(|| format!("Failed to create output {}", output_path.display()))?;
    let factory = GeometryFactory::new(projection);

    let mut route_writer = RouteWriter::new(&dataset, factory)?;
    let mut manager = RouteManager::new();
    let mut assembler = RelationAssembler::new();

    // Phase 1: Register route relations
    log::info!("");
    log::info!("Phase 1: Reading route relations...");
    read_pass(&input, ObjectFilter::RELATIONS, "Pass 1", |object| {
        if let OsmObject::Relation(relation) = object {
            if RouteManager::is_route_of_interest(&relation) {
                assembler.register(relation, |r, m| complete_route(&mut manager, &mut route_writer, r, m))?;
            }
        }
        Ok(())
    })?;
    log::info!("  Registered {} route relations", assembler.stats().registered);

    // Phase 2: Node locations, stops and crossings, route members
    log::info!("");
    log::info!("Phase 2: Collecting route members and railway features...");
    let mut railway = RailwayHandler::new(&dataset, factory, &options)?;
    let mut index = LocationIndex::new(options.index_type);
    let mut via_nodes = ViaNodes::new();
    let mut on_track = MustOnTrack::new();
    let mut ways_missing_nodes = 0usize;

    read_pass(&input, ObjectFilter::ALL, "Pass 2", |object| {
        match object {
            OsmObject::Node(node) => {
                if let Some(location) = node.location {
                    index.set(node.id, location);
                }
                railway.node(&node, &mut on_track)?;
                assembler.add_node(node, |r, m| complete_route(&mut manager, &mut route_writer, r, m))?;
            }
            OsmObject::Way(mut way) => {
                if index.resolve(&mut way) > 0 {
                    ways_missing_nodes += 1;
                }
                railway.way(&way)?;
                assembler.add_way(way, |r, m| complete_route(&mut manager, &mut route_writer, r, m))?;
            }
            OsmObject::Relation(relation) => {
                via_nodes.relation(&relation);
                assembler.add_relation(relation, |r, m| complete_route(&mut manager, &mut route_writer, r, m))?;
            }
        }
        Ok(())
    })?;

    log::debug!("  {} relations still waiting for members", assembler.pending_relations());
    assembler.flush_incomplete(|r, m| complete_route(&mut manager, &mut route_writer, r, m))?;
    route_writer.finish().context("Failed to write routes")?;

    log::info!("  Indexed {} node locations", index.len());
    if ways_missing_nodes > 0 {
        log::info!("  {} ways reference nodes without location", ways_missing_nodes);
    }
    drop(index);

    let assembled = assembler.stats();
    let routes = manager.stats();
    log::info!(
        "  Relations: {} complete, {} with missing members",
        assembled.completed,
        assembled.incomplete
    );
    log::info!(
        "  Routes: {} valid, {} invalid, {} not PTv2",
        routes.valid,
        routes.invalid,
        routes.skipped
    );
    let railway_stats = railway.stats();
    log::info!(
        "  Railway: {} stations, {} platforms, {} stops, {} highway-only stops, {} crossings",
        railway_stats.stations,
        railway_stats.platforms,
        railway_stats.stops,
        railway_stats.stops_only_highway,
        railway_stats.crossings
    );
    log::info!("  Collected {} turn restriction via nodes", via_nodes.len());
    log::info!("  {} nodes registered for the on-track check", on_track.len());

    // Phase 3: Switches and nodes that should be on a way
    log::info!("");
    log::info!("Phase 3: Checking railway nodes...");
    let mut points = PointsHandler::new(&dataset, factory, &options)?;
    read_pass(&input, ObjectFilter::NODES_AND_WAYS, "Pass 3", |object| {
        match object {
            OsmObject::Node(node) => points.node(&node, &via_nodes)?,
            OsmObject::Way(way) => points.way(&way, &mut on_track),
            OsmObject::Relation(_) => {}
        }
        Ok(())
    })?;
    let not_on_track = points.after_ways(&on_track)?;
    log::info!("  Wrote {} switches", points.written_points());
    log::info!("  {} nodes are not on a way", not_on_track);

    dataset
        .borrow_mut()
        .close()
        .with_context(|| format!("Failed to close output {}", output_path.display()))?;

    log::info!("");
    log::info!("Wrote output to {}", output_path.display());
    Ok(())
}
