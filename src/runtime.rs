//! Drivers that move the controller through time.
//!
//! `run_virtual` fast-forwards a virtual clock and returns instantly; `run_realtime`
//! paces ticks on the wall clock inside a single-threaded tokio runtime, serialising
//! ticks and front-end commands through one `select!` loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bottleneck::BottleneckCatalog;
use crate::controller::{SimulationController, SnapshotObserver};
use crate::error::{Error, Result};
use crate::events::Command;
use crate::formula;
use crate::jitter::build_jitter;
use crate::models::{JitterConfig, SimSettings};
use crate::recorder::RunRecorder;
use crate::state::{MetricsReport, RunMetadata, RunReport};

const COMMAND_BUFFER: usize = 32;

pub fn wall_clock_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

pub fn run_metadata(mode: &str, settings: &SimSettings) -> RunMetadata {
    RunMetadata {
        mode: mode.to_string(),
        base_users: settings.base_users,
        multiplier: settings.multiplier,
        tick_rate_ms: settings.tick_rate_ms,
        jitter: settings.jitter.label_with_seed(settings.seed),
    }
}

pub fn run_virtual(settings: &SimSettings, start_ms: u64, store_samples: bool) -> Result<RunReport> {
    let mut controller = SimulationController::from_settings(settings, start_ms)?;
    let recorder = Rc::new(RefCell::new(RunRecorder::new(store_samples)));
    controller.subscribe(Box::new(recorder.clone()));

    controller.start();
    let remaining = settings.ticks.saturating_sub(1);
    controller.advance_by(settings.tick_rate_ms.saturating_mul(remaining));
    controller.dispose();

    let report = recorder
        .borrow()
        .finish(run_metadata("virtual", settings), controller.snapshot());
    Ok(report)
}

pub fn compute_once(
    users: u32,
    jitter: JitterConfig,
    seed: Option<u64>,
    catalog: &BottleneckCatalog,
) -> Result<MetricsReport> {
    let mut jitter = build_jitter(jitter, seed)?;
    let metrics = formula::compute(users, jitter.as_mut());
    Ok(MetricsReport {
        load_factor: formula::load_factor(users),
        metrics,
        status: metrics.status(),
        cpu_status: metrics.cpu_status(),
        memory_status: metrics.memory_status(),
        active_bottlenecks: catalog
            .evaluate(users)
            .into_iter()
            .map(|entry| entry.id)
            .collect(),
        next_bottleneck_at: catalog.next_threshold(users),
    })
}

/// Applies one front-end command. Returns `false` when the loop should stop.
pub fn apply_command(controller: &mut SimulationController, command: Command) -> bool {
    match command {
        Command::TogglePause => {
            controller.toggle_pause();
        }
        Command::SetMultiplier(value) => {
            controller.set_user_multiplier(value);
        }
        Command::StepUp => {
            let next = controller.config().user_multiplier.step_up();
            controller.set_user_multiplier(next.value());
        }
        Command::StepDown => {
            let next = controller.config().user_multiplier.step_down();
            controller.set_user_multiplier(next.value());
        }
        Command::SetTickRate(tick_rate_ms) => {
            controller.set_tick_rate(tick_rate_ms);
        }
        Command::Reset => {
            controller.reset();
        }
        Command::Quit => return false,
    }
    true
}

struct WallClock {
    origin: Instant,
    origin_ms: u64,
}

impl WallClock {
    fn new(origin_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            origin_ms,
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }

    fn deadline(&self, due_ms: u64) -> Instant {
        self.origin + Duration::from_millis(due_ms.saturating_sub(self.origin_ms))
    }
}

/// Stops on `max_ticks`, `Quit`, `cancel`, or when stdin closes while paused.
pub async fn run_realtime(
    controller: &mut SimulationController,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    max_ticks: Option<u64>,
) {
    let clock = WallClock::new(controller.now_ms());
    let reached = |controller: &SimulationController| {
        max_ticks.is_some_and(|max| controller.tick_count() >= max)
    };
    let mut commands_open = true;

    controller.start();

    while !reached(controller) {
        let deadline = controller.next_due_ms().map(|due| clock.deadline(due));
        // Paused with stdin gone: nothing can resume the clock.
        if !commands_open && deadline.is_none() {
            info!("commands closed with no tick pending; stopping");
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown signal received");
                break;
            }
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => {
                        controller.advance_to(clock.now_ms());
                        if !apply_command(controller, command) {
                            info!("quit requested");
                            break;
                        }
                    }
                    None => commands_open = false,
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                controller.advance_to(clock.now_ms());
            }
        }
    }

    controller.dispose();
}

pub fn spawn_stdin_reader(sender: mpsc::Sender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin read failed: {}", err);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!("{}", err),
            }
        }
    })
}

pub fn run_interactive(
    settings: &SimSettings,
    live: Box<dyn SnapshotObserver>,
    store_samples: bool,
) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Error::Runtime(format!("failed to start runtime: {}", err)))?;

    let result = runtime.block_on(async {
        let mut controller = SimulationController::from_settings(settings, wall_clock_ms())?;
        let recorder = Rc::new(RefCell::new(RunRecorder::new(store_samples)));
        controller.subscribe(Box::new(recorder.clone()));
        controller.subscribe(live);

        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let cancel = CancellationToken::new();
        let reader = spawn_stdin_reader(sender);
        let signal_cancel = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_cancel.cancel();
            }
        });

        info!(
            ticks = settings.ticks,
            tick_rate_ms = settings.tick_rate_ms,
            "running in real time"
        );
        run_realtime(&mut controller, receiver, cancel, Some(settings.ticks)).await;
        reader.abort();
        signal.abort();

        let report = recorder
            .borrow()
            .finish(run_metadata("realtime", settings), controller.snapshot());
        Ok::<RunReport, Error>(report)
    });
    // stdin reads park a blocking thread that never observes EOF on a terminal.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}
