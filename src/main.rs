//! Command-line entry point.
//!
//! # Commands
//!
//! ```text
//! probe              find an accepted capture (rate, buffer) pair and save it
//! check              report whether the saved capture configuration works
//! show               print every setting with its effective value
//! set KEY VALUE      store one setting
//! run [--seconds N]  run the pipeline; stdin lines `key=value` change
//!                    settings while it runs
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinHandle};

use vocal_tune::{
    audio::{
        AudioError, CapabilityProber, CpalPlatform, DEFAULT_CHANNEL_CONFIG,
        DEFAULT_SAMPLE_FORMAT, DEFAULT_SAMPLE_RATE,
    },
    config::{keys, AppPaths, SettingValue, Settings},
    controller::{PipelineController, SettingUpdate, DEFAULT_BUFFER_SIZE, DEFAULT_LIVE_MODE},
    engine::{EngineParameters, PassthroughFactory},
    pipeline::PipelineRunner,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Real-time vocal pitch correction.
#[derive(Parser, Debug)]
#[command(name = "vocal-tune", version)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE", env = "VOCAL_TUNE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the default input device and save the first accepted configuration
    Probe,
    /// Check that the saved capture configuration opens a working device
    Check,
    /// Print every setting with its effective value
    Show,
    /// Store one setting
    Set {
        key: String,
        value: String,
    },
    /// Run the pipeline until interrupted or for a fixed time
    Run {
        /// Stop after this many seconds
        #[arg(long, value_name = "N")]
        seconds: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn probe(settings_file: &Path) -> Result<()> {
    let mut settings = Settings::load_from(settings_file)?;
    let platform = CpalPlatform::new()?;

    let prober = CapabilityProber::new(&platform);
    match prober.probe_and_persist(
        &mut settings,
        DEFAULT_SAMPLE_RATE,
        DEFAULT_CHANNEL_CONFIG,
        DEFAULT_SAMPLE_FORMAT,
    ) {
        Ok(config) => {
            settings.save_to(settings_file)?;
            println!(
                "capture: {} with buffer {}",
                config.sample_rate, config.buffer_size
            );
            Ok(())
        }
        Err(AudioError::ProbeExhausted) => {
            Err(anyhow!("no sample rate / buffer size combination was accepted"))
        }
        Err(e) => Err(e.into()),
    }
}

fn check(settings_file: &Path) -> Result<()> {
    let settings = Settings::load_from(settings_file)?;
    let mut controller =
        PipelineController::new(CpalPlatform::new()?, PassthroughFactory, &settings)?;

    let valid = controller.is_capture_device_valid();
    println!(
        "capture at {} with buffer {}: {}",
        controller.sample_rate(),
        controller.buffer_size(),
        if valid { "ok" } else { "rejected" }
    );
    controller.shutdown();

    if valid {
        Ok(())
    } else {
        Err(anyhow!("saved capture configuration is rejected; run `probe`"))
    }
}

fn show(settings_file: &Path) -> Result<()> {
    let settings = Settings::load_from(settings_file)?;
    let marker = |key: &str| if settings.get(key).is_some() { "" } else { " (default)" };

    let rate = settings.get_sample_rate(keys::SAMPLE_RATE, DEFAULT_SAMPLE_RATE)?;
    let buffer = settings.get_count(keys::BUFFER_SIZE, DEFAULT_BUFFER_SIZE)?;
    let live = settings.get_bool(keys::LIVE_MODE, DEFAULT_LIVE_MODE)?;
    println!("{} = {}{}", keys::SAMPLE_RATE, rate.hz(), marker(keys::SAMPLE_RATE));
    println!("{} = {}{}", keys::BUFFER_SIZE, buffer, marker(keys::BUFFER_SIZE));
    println!("{} = {}{}", keys::LIVE_MODE, live, marker(keys::LIVE_MODE));

    for param in EngineParameters::from_settings(&settings)?.to_parameters() {
        println!("{param}{}", marker(param.setting_key()));
    }

    for (key, value) in settings.iter() {
        if keys::kind_of(key).is_none() {
            println!("{key} = {value} (unused)");
        }
    }
    Ok(())
}

fn set(settings_file: &Path, key: &str, raw: &str) -> Result<()> {
    let mut settings = Settings::load_from(settings_file)?;
    let value = store_checked(&mut settings, key, raw)?;
    println!("{key} = {value}");
    settings.save_to(settings_file)?;
    Ok(())
}

/// Parse one `key=value` line and store it, notifying the pipeline.
fn apply_line(settings: &mut Settings, line: &str) -> Result<()> {
    let (key, raw) = line
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got {line:?}"))?;
    store_checked(settings, key.trim(), raw)?;
    Ok(())
}

/// Store `raw` under `key` only if the pipeline would accept it on startup.
fn store_checked(settings: &mut Settings, key: &str, raw: &str) -> Result<SettingValue> {
    let value = SettingValue::from_input(key, raw)?;
    SettingUpdate::parse(key, &value)?;
    settings.set(key, value.clone());
    Ok(value)
}

/// Feed `input` lines into `settings` until the deadline passes, ctrl-c
/// arrives, or the audio task ends on its own.
///
/// Returns the audio task's result when it ended first; the handle must not
/// be awaited again in that case.
async fn supervise<R, T>(
    input: R,
    settings: &mut Settings,
    audio: &mut JoinHandle<T>,
    deadline: Option<Duration>,
) -> Option<Result<T, JoinError>>
where
    R: AsyncBufRead + Unpin,
{
    let deadline = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut lines = input.lines();
    let mut input_open = true;
    loop {
        tokio::select! {
            finished = &mut *audio => return Some(finished),
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if let Err(e) = apply_line(settings, &line) {
                        log::warn!("{e}");
                    }
                }
                Ok(None) => input_open = false,
                Err(e) => {
                    log::warn!("stdin: {e}");
                    input_open = false;
                }
            },
            _ = &mut deadline => return None,
            _ = tokio::signal::ctrl_c() => return None,
        }
    }
}

async fn run(settings_file: PathBuf, seconds: Option<u64>) -> Result<()> {
    let mut settings = Settings::load_from(&settings_file)?;
    let controller = PipelineController::new(CpalPlatform::new()?, PassthroughFactory, &settings)?;
    let runner = PipelineRunner::new(controller);

    let listener = runner.spawn_change_listener(settings.subscribe());

    let stop = Arc::new(AtomicBool::new(false));
    let mut audio = {
        let runner = runner.clone();
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || runner.run_audio_loop(&stop))
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let finished = supervise(stdin, &mut settings, &mut audio, seconds.map(Duration::from_secs)).await;

    stop.store(true, Ordering::Relaxed);
    let outcome = match finished {
        Some(finished) => finished,
        None => audio.await,
    }
    .context("audio loop panicked")?;

    settings.save_to(&settings_file)?;
    drop(settings);
    listener.await.context("change listener panicked")?;

    runner
        .controller()
        .lock()
        .map_err(|_| anyhow!("controller lock poisoned"))?
        .shutdown();
    log::info!("pipeline {}", runner.state().label());

    match outcome {
        Ok(take) => {
            if !take.is_empty() {
                log::info!("{} samples buffered", take.len());
            }
            Ok(())
        }
        Err(e) if e.is_invalid_config() => Err(anyhow::Error::new(e)
            .context("the saved capture configuration was refused; run `vocal-tune probe`")),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings_file = args
        .settings
        .unwrap_or_else(|| AppPaths::new().settings_file);
    log::debug!("settings file: {}", settings_file.display());

    match args.command {
        Command::Probe => probe(&settings_file),
        Command::Check => check(&settings_file),
        Command::Show => show(&settings_file),
        Command::Set { key, value } => set(&settings_file, &key, &value),
        Command::Run { seconds } => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()?;
            rt.block_on(run(settings_file, seconds))
        }
    }
}
