//! Session launcher helpers.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use foresight_runtime::backend::{SimulatedForecaster, SimulatedTagServer};
use foresight_runtime::config::{ModelKind, SessionConfig, SessionTiming, TagId};
use foresight_runtime::log::LogLevel;
use foresight_runtime::scheduler::{SessionHandle, SessionRunner, StdClock};
use foresight_runtime::status::Status;
use foresight_runtime::{Session, SessionSnapshot};

use crate::style;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STATUS_WAIT_LIMIT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub tag: Option<String>,
    pub model: Option<String>,
    pub seed: Option<u64>,
    pub ticks: u64,
}

pub fn run(options: RunOptions, verbose: bool) -> anyhow::Result<()> {
    let (mut config, timing) = match &options.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => (SessionConfig::default(), SessionTiming::default()),
    };
    if let Some(endpoint) = options.endpoint {
        config.endpoint = endpoint.into();
    }
    if let Some(tag) = &options.tag {
        config.tag = TagId::parse(tag)?;
    }
    if let Some(model) = &options.model {
        config.model = ModelKind::parse(model)?;
    }

    if verbose {
        println!("{}", style::accent(format!("Endpoint: {}", config.endpoint)));
        println!("{}", style::accent(format!("Tag:      {}", config.tag)));
        println!("{}", style::accent(format!("Model:    {}", config.model)));
        println!(
            "{}",
            style::accent(format!(
                "Cadence:  1 update every {} seconds",
                timing.tick_interval.as_secs()
            ))
        );
    }

    let session = match options.seed {
        Some(seed) => Session::new(
            config,
            timing,
            Box::new(SimulatedTagServer::with_seed(seed)),
            Box::new(SimulatedForecaster::with_seed(seed.wrapping_add(1))),
        ),
        None => Session::simulated(config, timing),
    };

    let runner = SessionRunner::new(session, StdClock::new(), POLL_INTERVAL);
    let mut handle = runner.spawn("foresight-session")?;
    let control = handle.control();

    let updates = control.subscribe()?;
    let printer = thread::spawn(move || print_updates(&updates));

    control.connect_and_train()?;
    wait_for_status(&handle, Status::Ready)?;

    control.toggle_prediction_loop()?;
    // First tick fires on start, the rest on the configured cadence.
    let extra_ticks = options.ticks.saturating_sub(1);
    thread::sleep(timing.tick_interval * u32::try_from(extra_ticks).unwrap_or(u32::MAX));
    wait_for_ticks(&control, options.ticks, timing.tick_interval)?;

    let snapshot = control.snapshot()?;
    control.toggle_prediction_loop()?;
    wait_for_status(&handle, Status::Ready)?;

    handle.stop();
    let _ = printer.join();
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("session thread panicked"))?;

    print_summary(&snapshot);
    Ok(())
}

pub fn print_tags() {
    println!("Tags:");
    for tag in TagId::ALL {
        println!("  {tag}");
    }
    println!("Models:");
    for model in ModelKind::ALL {
        println!("  {model}");
    }
}

fn wait_for_status(handle: &SessionHandle<StdClock>, target: Status) -> anyhow::Result<()> {
    let started = std::time::Instant::now();
    loop {
        match handle.status() {
            status if status == target => return Ok(()),
            Status::Error => bail!("session entered error state"),
            _ => {}
        }
        if started.elapsed() > STATUS_WAIT_LIMIT {
            bail!("timed out waiting for {target} status");
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Block until the session has produced `ticks` metric updates. The sleep
/// above covers the nominal cadence; this absorbs scheduling jitter.
fn wait_for_ticks(
    control: &foresight_runtime::scheduler::SessionControl<StdClock>,
    ticks: u64,
    interval: Duration,
) -> anyhow::Result<()> {
    if ticks == 0 {
        return Ok(());
    }
    let started = std::time::Instant::now();
    loop {
        let snapshot = control.snapshot()?;
        if snapshot.metrics.last_update().is_some() {
            return Ok(());
        }
        if started.elapsed() > interval + STATUS_WAIT_LIMIT {
            bail!("timed out waiting for prediction ticks");
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn print_updates(updates: &Receiver<SessionSnapshot>) {
    let mut printed = 0;
    while let Ok(snapshot) = updates.recv() {
        for entry in snapshot.logs.iter().skip(printed) {
            let line = format!("[{}] [{}] {}", entry.timestamp, entry.level, entry.message);
            let styled = match entry.level {
                LogLevel::Info => line,
                LogLevel::Ok => style::success(line),
                LogLevel::Warn => style::warning(line),
                LogLevel::Error => style::error(line),
            };
            println!("{styled}");
        }
        printed = snapshot.logs.len();
    }
}

fn print_summary(snapshot: &SessionSnapshot) {
    println!();
    println!("{}", style::accent("Session summary"));
    if let Some(value) = snapshot.metrics.current_value() {
        println!("  Current value:   {value:.2}");
    }
    if let Some(value) = snapshot.metrics.predicted_value() {
        println!("  Predicted value: {value:.2}");
    }
    if let Some(mse) = snapshot.metrics.model_accuracy() {
        println!("  Model MSE:       {mse:.4}");
    }
    if let Some(label) = snapshot.metrics.last_update() {
        println!("  Last update:     {label}");
    }
    println!("  Chart points:    {}", snapshot.window.len());
}
