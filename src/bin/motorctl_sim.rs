//! Desktop simulation runner.
//!
//! Runs the control programs against simulated DC motors instead of a board:
//! - `position-wave`: four wheels sweep 0 to 270 degrees and back
//! - `position-random`: one shaft seeks random angles
//! - `velocity-random`: one shaft seeks random speeds
//! - `quad-drive`: four wheels cycle forward, reverse, turn, strafe and stop
//! - `script`: open-loop throttle steps on four motors
//!
//! # Run
//!
//! ```bash
//! cargo run --features sim --bin motorctl-sim -- position-random --ticks 500
//!
//! # Per-sample telemetry
//! RUST_LOG=rs_motorctl=debug cargo run --features sim --bin motorctl-sim -- quad-drive
//!
//! # Wall-clock pacing and a tuning file
//! cargo run --features sim --bin motorctl-sim -- velocity-random --realtime --config tuning.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use rs_motorctl::hal::sim::{MotorModel, SimEncoder, SimMotor, SimPlant};
use rs_motorctl::hal::{MockClock, MockDelay, StdClock, StdDelay};
use rs_motorctl::traits::{Clock, Delay};
use rs_motorctl::{
    run_until_stopped, Axis, Config, ControlMode, FixedRateScheduler, Interpolation, NeverStop,
    Program, RunSummary, Sequencer, ThrottleScript,
};

/// Wheel names in axis order on the four-motor board
const QUAD_NAMES: [&str; 4] = ["RR", "RL", "FL", "FR"];

/// Axes whose motor and encoder leads are swapped on the four-motor board
const QUAD_REVERSED: [bool; 4] = [false, true, true, false];

/// End of the four-wheel position sweep, in degrees
const WAVE_EXTENT: f32 = 270.0;

#[derive(Parser, Debug)]
#[command(name = "motorctl-sim")]
#[command(about = "Run motor control programs against simulated DC motors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Four wheels sweep together between 0 and 270 degrees
    PositionWave(RunArgs),
    /// One shaft moves to random angles
    PositionRandom(RunArgs),
    /// One shaft runs at random speeds
    VelocityRandom(RunArgs),
    /// Four wheels cycle through the drive maneuvers
    QuadDrive(RunArgs),
    /// Open-loop throttle steps on four motors
    Script {
        #[command(flatten)]
        args: RunArgs,
        /// Times to play the script
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Control ticks to run before stopping
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Seed for random targets and encoder dropouts
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Interpolation between targets (step, linear, cosine)
    #[arg(short, long, value_parser = parse_interpolation)]
    interpolation: Option<Interpolation>,

    /// Fraction of encoder reads that fail
    #[arg(long, default_value_t = 0.0)]
    dropout: f32,

    /// Pace ticks against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// JSON tuning file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_interpolation(s: &str) -> Result<Interpolation, String> {
    Interpolation::from_text(s).ok_or_else(|| format!("unknown interpolation '{s}'"))
}

/// Advances the plant by however long the loop sleeps.
struct PlantDelay<D: Delay> {
    plant: SimPlant,
    inner: D,
}

impl<D: Delay> Delay for PlantDelay<D> {
    fn delay_us(&mut self, us: u64) {
        self.plant.step(us as f32 / 1_000_000.0);
        self.inner.delay_us(us);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rs_motorctl=info".parse()?)
                .add_directive("motorctl_sim=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PositionWave(args) => {
            let config = load_config(&args)?;
            let mut plant = SimPlant::new();
            let axes = quad_axes(&config, &mut plant, ControlMode::Position, &args)?;
            let segment = config
                .position
                .clone()
                .with_extent(WAVE_EXTENT)
                .with_interpolation(interpolation(&args, &config, ControlMode::Position))
                .wave();
            run_program(axes, Program::shared(segment), &config, plant, &args)?;
        }
        Commands::PositionRandom(args) => {
            single_random(&args, ControlMode::Position)?;
        }
        Commands::VelocityRandom(args) => {
            single_random(&args, ControlMode::Velocity)?;
        }
        Commands::QuadDrive(args) => {
            let config = load_config(&args)?;
            let mut plant = SimPlant::new();
            let axes = quad_axes(&config, &mut plant, ControlMode::Velocity, &args)?;
            let mut sequence = config.drive.sequence()?;
            if let Some(interp) = args.interpolation {
                sequence = sequence.with_interpolation(interp);
            }
            run_program(axes, Program::Drive(sequence), &config, plant, &args)?;
        }
        Commands::Script { args, cycles } => {
            let config = load_config(&args)?;
            run_script(&config, &args, cycles)?;
        }
    }

    Ok(())
}

fn load_config(args: &RunArgs) -> Result<Config> {
    match args.config.as_deref() {
        Some(path) => read_config(path),
        None => Ok(Config::default()),
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    Config::from_json(&bytes).map_err(|e| anyhow!("{}: {e}", path.display()))
}

fn interpolation(args: &RunArgs, config: &Config, mode: ControlMode) -> Interpolation {
    args.interpolation
        .unwrap_or(config.trajectory(mode).interpolation)
}

fn motor_model(config: &Config) -> MotorModel {
    MotorModel {
        free_speed_rps: config.motor.speed_scale,
        counts_per_rev: config.motor.counts_per_rev(),
        ..MotorModel::default()
    }
}

fn add_dropout(plant: &mut SimPlant, args: &RunArgs) {
    if args.dropout > 0.0 {
        for i in 0..plant.len() {
            plant.set_dropout(i, args.dropout, args.seed.wrapping_add(i as u64 + 1));
        }
    }
}

fn quad_axes(
    config: &Config,
    plant: &mut SimPlant,
    mode: ControlMode,
    args: &RunArgs,
) -> Result<[Axis<SimEncoder, SimMotor>; 4]> {
    let mut axes = Vec::with_capacity(QUAD_NAMES.len());
    for (name, reversed) in QUAD_NAMES.iter().zip(QUAD_REVERSED) {
        let (encoder, motor) = plant.add_motor(motor_model(config));
        let wired = config
            .clone()
            .with_motor(config.motor.clone().with_reversed(reversed, reversed));
        axes.push(wired.axis(name, mode, encoder, motor)?);
    }
    add_dropout(plant, args);
    axes.try_into()
        .map_err(|_| anyhow!("expected {} axes", QUAD_NAMES.len()))
}

fn single_random(args: &RunArgs, mode: ControlMode) -> Result<()> {
    let config = load_config(args)?;
    let mut plant = SimPlant::new();
    let (encoder, motor) = plant.add_motor(motor_model(&config));
    let axis = config.axis("shaft", mode, encoder, motor)?;
    add_dropout(&mut plant, args);

    let segment = config
        .trajectory(mode)
        .clone()
        .with_seed(args.seed)
        .with_interpolation(interpolation(args, &config, mode))
        .random_walk()?;
    run_program([axis], Program::shared(segment), &config, plant, args)?;
    Ok(())
}

fn run_program<const N: usize>(
    axes: [Axis<SimEncoder, SimMotor>; N],
    program: Program<N>,
    config: &Config,
    plant: SimPlant,
    args: &RunArgs,
) -> Result<RunSummary> {
    let mut seq = Sequencer::new(axes, program, config.control.updates_per_move())?
        .with_telemetry_divider(config.control.telemetry_divider);
    let rate = config.control.updates_per_second;

    let summary = if args.realtime {
        let delay = PlantDelay {
            plant,
            inner: StdDelay,
        };
        let mut sched = FixedRateScheduler::new(StdClock::new(), delay, rate)?;
        run_until_stopped(&mut seq, &mut sched, &mut NeverStop, Some(args.ticks))?
    } else {
        let clock = MockClock::new();
        let delay = PlantDelay {
            plant,
            inner: MockDelay::new(&clock),
        };
        let mut sched = FixedRateScheduler::new(&clock, delay, rate)?;
        let summary = run_until_stopped(&mut seq, &mut sched, &mut NeverStop, Some(args.ticks))?;
        tracing::info!(sim_seconds = clock.now_us() as f64 / 1e6, "simulated time");
        summary
    };

    for state in seq.states() {
        tracing::info!(
            axis = %state.name,
            degrees = state.degrees,
            velocity = state.velocity,
            setpoint = state.setpoint,
            "final state"
        );
    }
    tracing::info!(
        ticks = summary.ticks,
        segments = seq.segments(),
        stale = summary.stale_samples,
        "run complete"
    );
    Ok(summary)
}

fn run_script(config: &Config, args: &RunArgs, cycles: u32) -> Result<()> {
    let mut plant = SimPlant::new();
    let mut motors = Vec::with_capacity(QUAD_NAMES.len());
    for _ in QUAD_NAMES {
        let (_, motor) = plant.add_motor(motor_model(config));
        motors.push(motor);
    }
    let polarity = QUAD_REVERSED.map(|r| if r { -1.0 } else { 1.0 });

    let outcome = if args.realtime {
        let mut delay = PlantDelay {
            plant,
            inner: StdDelay,
        };
        let outcome = ThrottleScript::demo().run(
            &mut motors,
            &polarity,
            &mut NeverStop,
            &mut delay,
            Some(cycles),
        )?;
        report_plant(&delay.plant);
        outcome
    } else {
        let clock = MockClock::new();
        let mut delay = PlantDelay {
            plant,
            inner: MockDelay::new(&clock),
        };
        let outcome = ThrottleScript::demo().run(
            &mut motors,
            &polarity,
            &mut NeverStop,
            &mut delay,
            Some(cycles),
        )?;
        report_plant(&delay.plant);
        outcome
    };

    tracing::info!(steps = outcome.steps_run, "script complete");
    Ok(())
}

fn report_plant(plant: &SimPlant) {
    for (i, name) in QUAD_NAMES.iter().enumerate() {
        tracing::info!(
            motor = name,
            revolutions = plant.revolutions(i).unwrap_or_default(),
            velocity = plant.velocity(i).unwrap_or_default(),
            "final plant state"
        );
    }
}
