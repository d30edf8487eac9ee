use std::path::PathBuf;

use clap::Parser;
use egogrid::{
    legend, render_ascii, ActionRequest, EgocentricObservation, ObservationPipeline, PipelineConfig,
};
use egogrid_session::{
    Channel, ChildChannel, LineChannel, ObservationSession, Recorder, ReplayChannel, SessionState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    source: Source,

    /// Path to a pipeline config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How many actions to send
    #[arg(short, long, default_value_t = 1000)]
    num_steps: usize,

    /// Length of the action vector
    #[arg(short, long, default_value_t = 7)]
    action_size: usize,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Record the episodes' exchanges as JSON files into this directory
    #[arg(short, long)]
    record_episodes_to_directory: Option<PathBuf>,

    /// Print every observation to stdout
    #[arg(long, default_value_t = false)]
    render: bool,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

/// Where the game's replies come from.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct Source {
    /// Address of a game bridge listening for TCP connections, e.g. localhost:7777
    #[arg(long)]
    address: Option<String>,

    /// Path to a game bridge executable speaking over stdin/stdout
    #[arg(long)]
    spawn: Option<PathBuf>,

    /// Path to a recorded episode to play back
    #[arg(long)]
    replay: Option<PathBuf>,
}

struct RunOptions {
    num_steps: usize,
    action_size: usize,
    render: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    if args.action_size == 0 {
        anyhow::bail!("The action size must be at least 1");
    }

    // Get a random seed
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = ObservationPipeline::new(config)?;
    if args.render {
        println!("{}", legend(&pipeline.config().entity_types));
    }

    let recorder = if let Some(dir_path) = args.record_episodes_to_directory {
        Some(Recorder::new(dir_path)?)
    } else {
        None
    };

    let mut options = RunOptions {
        num_steps: args.num_steps,
        action_size: args.action_size,
        render: args.render,
    };

    if let Some(address) = &args.source.address {
        let channel = LineChannel::connect(address.as_str())?;
        run(session(channel, pipeline, recorder), &mut rng, &options)
    } else if let Some(path) = &args.source.spawn {
        let channel = ChildChannel::spawn(path)?;
        run(session(channel, pipeline, recorder), &mut rng, &options)
    } else if let Some(path) = &args.source.replay {
        let channel = ReplayChannel::load(path)?;
        // The first recorded reply answers the reset
        options.num_steps = options.num_steps.min(channel.remaining().saturating_sub(1));
        run(session(channel, pipeline, recorder), &mut rng, &options)
    } else {
        anyhow::bail!("One of --address, --spawn or --replay is required")
    }
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn session<C: Channel>(
    channel: C,
    pipeline: ObservationPipeline,
    recorder: Option<Recorder>,
) -> ObservationSession<C> {
    let session = ObservationSession::new(channel, pipeline);
    match recorder {
        Some(recorder) => session.with_recorder(recorder),
        None => session,
    }
}

/// Plays uniformly random actions, starting a new episode whenever the
/// previous one ended.
fn run<C: Channel>(
    mut session: ObservationSession<C>,
    rng: &mut StdRng,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let mut episode_idx = 0;
    let mut episode_steps = 0;
    let mut episode_return = 0.0;
    for step_idx in 0..options.num_steps {
        if session.state() == SessionState::AwaitingReset {
            let observation = session.reset()?;
            if options.render {
                show(&session, &observation);
            }
        }
        let action = random_action(rng, options.action_size);
        let outcome = session.step(&action)?;
        debug!(step_idx, reward = outcome.reward, anchor = ?outcome.observation.anchor);
        episode_steps += 1;
        episode_return += outcome.reward;
        if options.render {
            show(&session, &outcome.observation);
        }
        if outcome.terminated {
            info!(episode_idx, episode_steps, episode_return, "Episode finished");
            episode_idx += 1;
            episode_steps = 0;
            episode_return = 0.0;
        }
    }
    if episode_steps > 0 {
        info!(episode_idx, episode_steps, episode_return, "Episode unfinished");
    }
    session.finish()
}

fn random_action(rng: &mut StdRng, action_size: usize) -> ActionRequest {
    loop {
        let action = ActionRequest((0..action_size).map(|_| rng.gen_range(-1.0..=1.0)).collect());
        if !action.is_reset() {
            return action;
        }
    }
}

fn show<C: Channel>(session: &ObservationSession<C>, observation: &EgocentricObservation) {
    let entity_types = &session.pipeline().config().entity_types;
    println!("{}", render_ascii(&observation.grid, entity_types));
    let scalars = &observation.scalars;
    println!(
        "anchor {:?}, climbing {:?}, can dash {:?}, speed {:?}\n",
        observation.anchor, scalars.climbing, scalars.can_dash, scalars.speed
    );
}
