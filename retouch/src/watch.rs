//! The watch loop.
//!
//! One worker thread owns [`WatcherState`] and runs every cycle, whether it
//! was started by the timer or requested by the user, so two cycles can never
//! touch the same working tree at once. Everything else talks to the worker
//! through a [`WatchHandle`] and listens to [`WatchEvent`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, after, select, unbounded};
use tracing::{debug, info, warn};

use crate::check::RepoChecker;
use crate::core::classifier::LineClassifier;
use crate::core::types::{CycleSummary, Trigger, WatchedRepo};
use crate::io::config::WatcherConfig;
use crate::io::probe::FileProbe;
use crate::io::process::CommandRunner;

/// Requests accepted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    /// Run a cycle now, even while paused. The timer schedule is unchanged.
    CheckNow,
    Pause,
    Resume,
    TogglePause,
    /// Re-read the configuration and replace repositories and interval.
    Reload,
    /// Emit a [`WatchEvent::Status`].
    ReportStatus,
    Shutdown,
}

/// Notifications published by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Started {
        repo_count: usize,
        interval: Duration,
        paused: bool,
    },
    Paused,
    Resumed,
    Reloaded {
        repo_count: usize,
        interval: Duration,
    },
    ReloadFailed {
        error: String,
    },
    Status {
        repo_count: usize,
        interval: Duration,
        paused: bool,
    },
    CycleFinished(CycleSummary),
    Stopped,
}

/// Mutable watcher state, owned by the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherState {
    pub repos: Vec<WatchedRepo>,
    pub interval: Duration,
    pub paused: bool,
}

impl WatcherState {
    pub fn from_config(cfg: &WatcherConfig) -> Self {
        Self {
            repos: cfg.repositories(),
            interval: cfg.interval(),
            paused: false,
        }
    }
}

/// Cloneable sender side of the worker.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    commands: Sender<WatchCommand>,
    running: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Queue a command. Returns false if the worker has already stopped.
    pub fn send(&self, command: WatchCommand) -> bool {
        if command == WatchCommand::Shutdown {
            self.running.store(false, Ordering::SeqCst);
        }
        self.commands.send(command).is_ok()
    }

    /// Stop the worker before its next repository check.
    ///
    /// A git command already running is allowed to finish.
    pub fn shutdown(&self) {
        self.send(WatchCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A running watch worker.
pub struct Watcher {
    handle: WatchHandle,
    events: Receiver<WatchEvent>,
    thread: JoinHandle<()>,
}

impl Watcher {
    /// Start the worker thread. The first timer cycle runs immediately.
    ///
    /// `reload` is called for every [`WatchCommand::Reload`].
    pub fn spawn<R, P, C, L>(
        checker: RepoChecker<R, P, C>,
        state: WatcherState,
        reload: L,
    ) -> Result<Self>
    where
        R: CommandRunner + Send + 'static,
        P: FileProbe + Send + 'static,
        C: LineClassifier + Send + 'static,
        L: FnMut() -> Result<WatcherConfig> + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            checker,
            state,
            reload,
            commands: command_rx,
            events: event_tx,
            running: Arc::clone(&running),
        };
        let thread = thread::Builder::new()
            .name("retouch-worker".to_string())
            .spawn(move || worker.run())
            .context("spawn watch worker")?;

        Ok(Self {
            handle: WatchHandle {
                commands: command_tx,
                running,
            },
            events: event_rx,
            thread,
        })
    }

    pub fn handle(&self) -> WatchHandle {
        self.handle.clone()
    }

    pub fn events(&self) -> &Receiver<WatchEvent> {
        &self.events
    }

    /// Wait for the worker to exit. Call after [`WatchHandle::shutdown`].
    pub fn join(self) -> Result<()> {
        drop(self.handle);
        self.thread
            .join()
            .map_err(|_| anyhow!("watch worker panicked"))
    }
}

struct Worker<R, P, C, L> {
    checker: RepoChecker<R, P, C>,
    state: WatcherState,
    reload: L,
    commands: Receiver<WatchCommand>,
    events: Sender<WatchEvent>,
    running: Arc<AtomicBool>,
}

impl<R, P, C, L> Worker<R, P, C, L>
where
    R: CommandRunner,
    P: FileProbe,
    C: LineClassifier,
    L: FnMut() -> Result<WatcherConfig>,
{
    fn run(mut self) {
        info!(
            repo_count = self.state.repos.len(),
            interval_secs = self.state.interval.as_secs(),
            paused = self.state.paused,
            "watcher started"
        );
        self.emit(WatchEvent::Started {
            repo_count: self.state.repos.len(),
            interval: self.state.interval,
            paused: self.state.paused,
        });

        let commands = self.commands.clone();
        let mut next_tick = Instant::now();
        while self.running.load(Ordering::SeqCst) {
            let wait = next_tick.saturating_duration_since(Instant::now());
            select! {
                recv(commands) -> msg => match msg {
                    Ok(command) => self.handle(command),
                    Err(_) => {
                        debug!("all watch handles dropped");
                        self.running.store(false, Ordering::SeqCst);
                    }
                },
                recv(after(wait)) -> _ => {
                    if self.state.paused {
                        debug!("paused, skipping timer cycle");
                    } else {
                        self.cycle(Trigger::Timer);
                    }
                    next_tick = Instant::now() + self.state.interval;
                }
            }
        }

        info!("watcher stopped");
        self.emit(WatchEvent::Stopped);
    }

    fn handle(&mut self, command: WatchCommand) {
        debug!(?command, "watch command");
        match command {
            WatchCommand::CheckNow => self.cycle(Trigger::Manual),
            WatchCommand::Pause => self.set_paused(true),
            WatchCommand::Resume => self.set_paused(false),
            WatchCommand::TogglePause => self.set_paused(!self.state.paused),
            WatchCommand::Reload => self.reload(),
            WatchCommand::ReportStatus => self.emit(WatchEvent::Status {
                repo_count: self.state.repos.len(),
                interval: self.state.interval,
                paused: self.state.paused,
            }),
            WatchCommand::Shutdown => self.running.store(false, Ordering::SeqCst),
        }
    }

    fn cycle(&mut self, trigger: Trigger) {
        let summary = self
            .checker
            .run_cycle(&self.state.repos, trigger, &self.running);
        info!(
            ?trigger,
            repos = summary.repos.len(),
            repaired = summary.repaired_count(),
            failed = summary.failed_count(),
            "cycle finished"
        );
        self.emit(WatchEvent::CycleFinished(summary));
    }

    fn set_paused(&mut self, paused: bool) {
        if self.state.paused == paused {
            return;
        }
        self.state.paused = paused;
        info!(paused, "watcher pause state changed");
        self.emit(if paused {
            WatchEvent::Paused
        } else {
            WatchEvent::Resumed
        });
    }

    fn reload(&mut self) {
        match (self.reload)() {
            Ok(cfg) => {
                self.state.repos = cfg.repositories();
                self.state.interval = cfg.interval();
                info!(
                    repo_count = self.state.repos.len(),
                    interval_secs = self.state.interval.as_secs(),
                    "configuration reloaded"
                );
                self.emit(WatchEvent::Reloaded {
                    repo_count: self.state.repos.len(),
                    interval: self.state.interval,
                });
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "reload failed, keeping previous configuration");
                self.emit(WatchEvent::ReloadFailed {
                    error: format!("{err:#}"),
                });
            }
        }
    }

    fn emit(&self, event: WatchEvent) {
        if self.events.send(event).is_err() {
            debug!("no event listener");
        }
    }
}
