use clap::{Parser, Subcommand};
use screenmatch::{
    CaptureConfig, Engine, FindOptions, MatchCandidate, MatchOutcome, StopFlag, WaitOptions,
    WaitOutcome,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Screenmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate the template in `image_path`, or in a fresh capture when unset.
    Find,
    /// Print the color and shape descriptor of the template.
    Analyze,
    /// Capture the screen (or one region) and store it.
    Capture {
        #[arg(long, num_args = 4, value_names = ["X", "Y", "WIDTH", "HEIGHT"])]
        region: Option<Vec<u32>>,
    },
    /// Poll the screen until the template appears or the timeout passes.
    Wait,
    /// Print the color of one screen pixel.
    Pixel { x: u32, y: u32 },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WaitConfigJson {
    timeout_secs: f64,
    interval_secs: f64,
}

impl Default for WaitConfigJson {
    fn default() -> Self {
        let opts = WaitOptions::default();
        Self {
            timeout_secs: opts.timeout.as_secs_f64(),
            interval_secs: opts.interval.as_secs_f64(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    template_path: String,
    image_path: Option<String>,
    output_path: Option<String>,
    capture: CaptureConfig,
    find: FindOptions,
    wait: WaitConfigJson,
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    confidence: f32,
    scale: f32,
}

impl From<MatchCandidate> for MatchRecord {
    fn from(value: MatchCandidate) -> Self {
        Self {
            x: value.rect.x(),
            y: value.rect.y(),
            width: value.rect.width(),
            height: value.rect.height(),
            confidence: value.confidence,
            scale: value.scale,
        }
    }
}

#[derive(Debug, Serialize)]
struct FindOutput {
    found: bool,
    best: Option<MatchRecord>,
    matches: Vec<MatchRecord>,
    best_confidence: f32,
    best_scale: f32,
}

#[derive(Debug, Serialize)]
struct CaptureOutput {
    path: Option<PathBuf>,
    origin: (u32, u32),
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct WaitOutput {
    status: &'static str,
    best: Option<MatchRecord>,
    attempts: usize,
    elapsed_secs: f64,
}

#[derive(Debug, Serialize)]
struct PixelOutput {
    x: u32,
    y: u32,
    rgb: [u8; 3],
}

fn load_config(path: &Path, needs_template: bool) -> Result<Config, Box<dyn std::error::Error>> {
    if !needs_template && !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&text)?;
    if needs_template && config.template_path.is_empty() {
        return Err("template_path must be set in the config".into());
    }
    config.find.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(value: &T, output_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match output_path {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!(path, "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn find_output(outcome: MatchOutcome) -> FindOutput {
    match outcome {
        MatchOutcome::Found { matches } => {
            let best = matches.first().copied();
            FindOutput {
                found: true,
                best_confidence: best.map_or(0.0, |m| m.confidence),
                best_scale: best.map_or(1.0, |m| m.scale),
                best: best.map(MatchRecord::from),
                matches: matches.into_iter().map(MatchRecord::from).collect(),
            }
        }
        MatchOutcome::NotFound {
            best_confidence,
            best_scale,
        } => FindOutput {
            found: false,
            best: None,
            matches: Vec::new(),
            best_confidence,
            best_scale,
        },
    }
}

fn wait_output(outcome: WaitOutcome) -> WaitOutput {
    let status = match outcome {
        WaitOutcome::Found { .. } => "found",
        WaitOutcome::TimedOut { .. } => "timed_out",
        WaitOutcome::Cancelled { .. } => "cancelled",
    };
    WaitOutput {
        status,
        best: outcome.candidate().copied().map(MatchRecord::from),
        attempts: outcome.attempts(),
        elapsed_secs: outcome.elapsed().as_secs_f64(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("screenmatch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let Some(command) = cli.command else {
        return Err("no command given; see --help".into());
    };
    let needs_template = matches!(command, Command::Find | Command::Analyze | Command::Wait);
    let config = load_config(&cli.config, needs_template)?;
    let output_path = config.output_path.as_deref();
    let engine = Engine::primary_monitor(config.capture.clone());

    match command {
        Command::Find => {
            let template = engine.load_template(&config.template_path)?;
            let frame = match &config.image_path {
                Some(path) => Some(engine.load_frame(path)?),
                None => None,
            };
            let outcome = engine.find(&template, frame.as_ref(), &config.find)?;
            emit(&find_output(outcome), output_path)
        }
        Command::Analyze => {
            let template = engine.load_template(&config.template_path)?;
            let descriptor = engine.analyze(&template);
            emit(descriptor.as_ref(), output_path)
        }
        Command::Capture { region } => {
            let captured = match region.as_deref() {
                Some(&[x, y, width, height]) => engine.capture_region(x, y, width, height)?,
                Some(_) => return Err("--region takes X Y WIDTH HEIGHT".into()),
                None => engine.capture_full()?,
            };
            emit(
                &CaptureOutput {
                    path: captured.artifact,
                    origin: captured.frame.origin(),
                    width: captured.frame.width(),
                    height: captured.frame.height(),
                },
                output_path,
            )
        }
        Command::Wait => {
            let template = engine.load_template(&config.template_path)?;
            let options = WaitOptions {
                timeout: Duration::try_from_secs_f64(config.wait.timeout_secs)?,
                interval: Duration::try_from_secs_f64(config.wait.interval_secs)?,
                find: config.find,
            };
            let outcome = engine.wait_for(&template, &options, &StopFlag::new())?;
            emit(&wait_output(outcome), output_path)
        }
        Command::Pixel { x, y } => {
            let (r, g, b) = engine.pixel_color(x, y)?;
            emit(&PixelOutput { x, y, rgb: [r, g, b] }, output_path)
        }
    }
}
