use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::executor::constructs::SuspendPoint;
use crate::executor::stdlib::{arity, num};
use crate::executor::{
    generator, task, Computation, ComputationOptions, EngineError, ErrorInfo, Expr, Generator,
    LocalScheduler, Promise, PromiseState, Scheduler, Task, TurnQueue, Val,
};
use crate::parser::parse_body;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - run pausable bodies as generators or async tasks", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Trampoline bounces allowed per resume (overrides config)
    #[arg(long, global = true)]
    pub step_limit: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a body and print what it produces
    Run {
        /// Source file
        file: PathBuf,

        /// How to drive the body
        #[arg(short = 'm', long = "mode", value_enum, default_value = "generator")]
        mode: Mode,

        /// Most values to pull in generator mode (default: run.take)
        #[arg(short = 't', long = "take")]
        take: Option<usize>,
    },

    /// Parse and classify a body without running it
    Check {
        /// Source file
        file: PathBuf,

        /// Which suspend keyword the body is checked against
        #[arg(short = 'm', long = "mode", value_enum, default_value = "generator")]
        mode: Mode,
    },

    /// Print the parsed AST as JSON
    Ast {
        /// Source file
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Pull values with yield()
    Generator,
    /// Await on the tokio runtime; sleep(ms) waits on a timer
    Async,
    /// Await on a deterministic turn queue; sleep(n) waits n turns
    Turns,
}

impl Mode {
    fn keyword(self) -> &'static str {
        match self {
            Mode::Generator => generator::YIELD,
            Mode::Async | Mode::Turns => task::AWAIT,
        }
    }
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let mut builder = Config::builder().step_limit(cli.step_limit);
    if let Some(path) = &cli.config {
        builder = builder.config_path(path);
    }

    // Load before dispatching so config errors surface ahead of any output
    let config = builder.build()?;
    init_logging(&config.log.filter)?;

    match cli.command {
        Commands::Run { file, mode, take } => {
            let body = load_body(&file)?;
            let options = ComputationOptions::new().step_limit(config.engine.step_limit);
            info!(file = %file.display(), ?mode, "running body");

            match mode {
                Mode::Generator => {
                    run_generator(&body, options, take.unwrap_or(config.run.take))?
                }
                Mode::Async => run_async(&body, options).await?,
                Mode::Turns => run_turns(&body, options, config.scheduler.max_turns)?,
            }
        }

        Commands::Check { file, mode } => {
            let body = load_body(&file)?;
            let computation = Computation::new(
                &body,
                SuspendPoint::new(mode.keyword()),
                ComputationOptions::new(),
            )
            .map_err(engine_error)?;

            let kind = if computation.is_pausable() {
                "pausable"
            } else {
                "ordinary"
            };
            println!("✓ {} is valid ({}, {}() mode)", file.display(), kind, mode.keyword());
        }

        Commands::Ast { file } => {
            let body = load_body(&file)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid RUST_LOG filter '{}'", directive))?,
        Err(_) => EnvFilter::try_new(filter)
            .with_context(|| format!("Invalid log filter '{}'", filter))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

fn load_body(file: &Path) -> Result<Expr> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    parse_body(&source).with_context(|| format!("Failed to parse {}", file.display()))
}

// Failure values hold Rc handles, so engine errors are flattened to text
// before they cross into anyhow
fn engine_error(err: EngineError) -> anyhow::Error {
    anyhow!("{}", err)
}

fn render(val: &Val) -> Result<String> {
    Ok(serde_json::to_string(&val.to_json())?)
}

fn run_generator(body: &Expr, options: ComputationOptions, take: usize) -> Result<()> {
    let mut generator = Generator::new(body, options).map_err(engine_error)?;

    let mut pulled = 0;
    while pulled < take {
        match generator.advance().map_err(engine_error)? {
            Some(val) => {
                println!("{}", render(&val)?);
                pulled += 1;
            }
            None => break,
        }
    }

    if generator.is_done() {
        if let Some(val) = generator.return_value() {
            println!("return {}", render(&val)?);
        }
    } else {
        debug!(pulled, "take limit reached, cancelling");
        generator.cancel().map_err(engine_error)?;
    }

    Ok(())
}

fn sleep_argument(args: &[Val]) -> Result<f64, ErrorInfo> {
    arity("sleep", args, 1)?;
    Ok(num("sleep", &args[0])?.max(0.0))
}

async fn run_async(body: &Expr, options: ComputationOptions) -> Result<()> {
    let local = tokio::task::LocalSet::new();
    let outcome = local
        .run_until(async move {
            let scheduler = LocalScheduler::handle();
            let timers = scheduler.clone();
            let options = options.native("sleep", move |args| {
                let millis = sleep_argument(args)?;
                let (promise, resolver) = Promise::new(timers.clone());
                tokio::task::spawn_local(async move {
                    tokio::time::sleep(Duration::from_millis(millis as u64)).await;
                    resolver.resolve(Val::Num(millis));
                });
                Ok(Val::Promise(promise))
            });

            let task = Task::spawn(body, scheduler, options).map_err(engine_error)?;
            Ok::<_, anyhow::Error>(task.settled().await)
        })
        .await?;

    report(outcome)
}

fn run_turns(body: &Expr, options: ComputationOptions, max_turns: u64) -> Result<()> {
    let queue = TurnQueue::new();
    let timers: Rc<dyn Scheduler> = queue.handle();
    let options = options.native("sleep", move |args| {
        let turns = sleep_argument(args)?;
        Ok(Val::Promise(Promise::after_turns(
            timers.clone(),
            turns as usize,
            Ok(Val::Num(turns)),
        )))
    });

    let task = Task::spawn(body, queue.handle(), options).map_err(engine_error)?;
    let ran = queue.run_until_idle(max_turns);
    debug!(turns = ran, "turn queue stopped");

    match task.state() {
        PromiseState::Pending => bail!("task did not settle within {} scheduler turns", ran),
        PromiseState::Resolved(val) => report(Ok(val)),
        PromiseState::Rejected(err) => report(Err(err)),
    }
}

fn report(outcome: Result<Val, Val>) -> Result<()> {
    match outcome {
        Ok(val) => {
            println!("{}", render(&val)?);
            Ok(())
        }
        Err(Val::Error(info)) => bail!("task rejected: {}", info),
        Err(other) => bail!("task rejected with {}", other),
    }
}
