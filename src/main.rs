use botsim::arena::Arena;
use botsim::assets::{self, BOARD_FILE, DirectoryModels, EmbeddedModels, ROBOTS_FILE};
use botsim::collision::ContactPolicy;
use botsim::config::DEFAULT_RUN_SECONDS;
use botsim::demos;
use botsim::error::ConfigError;
use botsim::geometry::{ModelSource, SimObject};
use botsim::logging;
use botsim::panel::HeadlessPanel;
use botsim::properties::Properties;
use botsim::robot::{RobotParams, SimRobot};
use botsim::sensor::RobotConfig;
use botsim::simulator::{self, RunOutcome, Simulator};
use botsim::types::Location;
use botsim::wall::parse_board;
use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// Apply every contact in board order
    Sequential,
    /// Keep the smallest force any single contact allows
    Minimum,
}

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Botball controller simulator", long_about = None)]
struct Args {
    /// Built-in program to run (see --list)
    #[arg(short, long, default_value = "wander")]
    program: String,

    /// List the built-in programs and robot types, then exit
    #[arg(long)]
    list: bool,

    /// Robot type from the robots file
    #[arg(short, long, default_value = "cbc")]
    robot: String,

    /// Robots file (defaults to the built-in one)
    #[arg(long)]
    robots: Option<PathBuf>,

    /// Board file (defaults to the built-in practice table)
    #[arg(long)]
    board: Option<PathBuf>,

    /// Directory of collision models, searched before the built-in ones
    #[arg(long)]
    models: Option<PathBuf>,

    /// Seconds to run before an emergency stop
    #[arg(long, default_value_t = DEFAULT_RUN_SECONDS)]
    seconds: f64,

    /// Start with the starting light on
    #[arg(long)]
    light: bool,

    /// Start position in mm
    #[arg(long, default_value_t = 600.0)]
    start_x: f64,
    #[arg(long, default_value_t = 600.0)]
    start_y: f64,

    /// Start heading in degrees, counter-clockwise from +x
    #[arg(long, default_value_t = 0.0)]
    start_heading: f64,

    /// How simultaneous wall contacts combine
    #[arg(long, value_enum, default_value_t = PolicyArg::Sequential)]
    contact_policy: PolicyArg,

    /// Debug filter to specify log topics (e.g., "motion,collision,pid")
    /// Available topics: motion, collision, pid, sensor, process, lcd
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_simulator(args: &Args, panel: Arc<HeadlessPanel>) -> Result<Simulator, ConfigError> {
    let robots = Properties::parse(&assets::load_text(args.robots.as_deref(), ROBOTS_FILE)?);
    let enabled = RobotParams::enabled(&robots);
    if enabled.is_empty() {
        return Err(ConfigError::NoRobots);
    }
    let robot_type = args.robot.to_lowercase();
    if !enabled.contains(&robot_type) {
        return Err(ConfigError::UnknownRobot(args.robot.clone()));
    }

    let models: Box<dyn ModelSource> = match &args.models {
        Some(dir) => Box::new(DirectoryModels::new(dir)),
        None => Box::new(EmbeddedModels),
    };
    let params = RobotParams::from_properties(&robots, &robot_type)?;
    let start = Location::at(args.start_x, args.start_y, args.start_heading.to_radians());
    let setup = RobotConfig::controller(&robot_type).with_start(start);
    let robot = SimRobot::new(params, setup, models.as_ref())?;
    info!(
        "Robot {} ({} controller) at {}",
        robot_type,
        robot.controller().name(),
        start
    );

    let walls = parse_board(&assets::load_text(args.board.as_deref(), BOARD_FILE)?)?;
    let policy = match args.contact_policy {
        PolicyArg::Sequential => ContactPolicy::Sequential,
        PolicyArg::Minimum => ContactPolicy::Minimum,
    };
    let mut arena = Arena::new(walls).with_policy(policy);
    arena.set_light(args.light);
    arena.place_robot(robot);

    let registry = demos::registry(&args.program).ok_or_else(|| ConfigError::InvalidParameter {
        name: "program".to_string(),
        value: args.program.clone(),
    })?;
    Simulator::new(arena, panel, registry)
}

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize the logger
    let log_level = match args.log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Setup logger with debug filters if provided
    if let Err(e) = logging::init_logger(log_level, args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    if args.list {
        println!("Programs:");
        for (name, description) in demos::DEMOS {
            println!("  {:<10} {}", name, description);
        }
        if let Some(text) = assets::asset_text(ROBOTS_FILE) {
            println!("Robots: {}", RobotParams::enabled(&Properties::parse(&text)).join(", "));
        }
        return;
    }

    let limit = match simulator::run_limit(args.seconds) {
        Ok(limit) => limit,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    info!("Initializing simulator...");
    let panel = Arc::new(HeadlessPanel::new());
    let sim = match build_simulator(&args, panel.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = sim.play() {
        error!("Cannot start program: {}", e);
        process::exit(1);
    }
    info!("Running {} for up to {:.1}s", args.program, args.seconds);

    let outcome = sim.run(limit);
    if outcome == RunOutcome::TimedOut {
        info!("Time limit reached");
        sim.e_stop();
    }

    if let Some(robot) = sim.arena().read().robot() {
        info!("Final pose {}", robot.location());
    }
    println!("--- LCD ---");
    print!("{}", panel.lcd_text());
    info!("Exiting simulator.");
}
