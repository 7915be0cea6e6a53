//! Per-context scheduler of named, cancellable periodic tasks.
//!
//! Each task owns an in-flight guard: a tick that arrives while the previous
//! run (or a manual [`Scheduler::trigger`]) is still executing is skipped, so
//! runs of one task never overlap. Cancelling the scheduler cancels every
//! task, including a run that is mid-flight at an await point.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

type Job = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Shared "a run is executing" flag.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

/// Held while a run executes; releases the guard on drop.
#[derive(Debug)]
pub struct InFlightPermit(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a run is already in flight.
    pub fn try_enter(&self) -> Option<InFlightPermit> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit(self.0.clone()))
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ScheduledTask {
    token: CancellationToken,
    guard: InFlight,
    job: Option<Job>,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    context: String,
    root: CancellationToken,
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl Scheduler {
    /// `context` names the owning script context in log lines.
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            root: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `job` every `period`, first run one period from now.
    ///
    /// Replaces (and cancels) any task already registered under `name`.
    pub fn spawn_periodic<F, Fut>(&self, name: &str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Arc::new(move || Box::pin(job()));
        let period = period.max(Duration::from_millis(1));
        let token = self.root.child_token();
        let guard = InFlight::new();

        let handle = {
            let job = job.clone();
            let token = token.clone();
            let guard = guard.clone();
            let context = self.context.clone();
            let name = name.to_string();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    let Some(_permit) = guard.try_enter() else {
                        tracing::debug!(context = %context, task = %name, "previous run in flight, skipping tick");
                        continue;
                    };
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = job() => {}
                    }
                }
                tracing::debug!(context = %context, task = %name, "periodic task stopped");
            })
        };

        self.insert(
            name,
            ScheduledTask {
                token,
                guard,
                job: Some(job),
                handle,
            },
        );
    }

    /// Run a long-lived future (e.g. a notification listener) until cancelled.
    pub fn spawn_task<Fut>(&self, name: &str, future: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = future => {}
                }
            })
        };
        self.insert(
            name,
            ScheduledTask {
                token,
                guard: InFlight::new(),
                job: None,
                handle,
            },
        );
    }

    fn insert(&self, name: &str, task: ScheduledTask) {
        if let Some(previous) = self.tasks().insert(name.to_string(), task) {
            previous.token.cancel();
        }
    }

    /// Run a periodic task's job now, outside its schedule.
    ///
    /// Returns false if the task is unknown, cancelled, or already in flight.
    pub fn trigger(&self, name: &str) -> bool {
        let (job, guard, token) = {
            let tasks = self.tasks();
            let Some(task) = tasks.get(name) else {
                return false;
            };
            let Some(job) = task.job.clone() else {
                return false;
            };
            (job, task.guard.clone(), task.token.clone())
        };
        if token.is_cancelled() {
            return false;
        }
        let Some(permit) = guard.try_enter() else {
            return false;
        };
        tokio::spawn(async move {
            let _permit = permit;
            tokio::select! {
                _ = token.cancelled() => {}
                _ = job() => {}
            }
        });
        true
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks()
            .get(name)
            .map(|t| !t.token.is_cancelled() && !t.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks().keys().cloned().collect();
        names.sort();
        names
    }

    /// Cancel one task. Returns false if no task has that name.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks().remove(name) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every task. The scheduler accepts new tasks afterwards only
    /// if they are spawned on a fresh scheduler.
    pub fn cancel_all(&self) {
        self.root.cancel();
        self.tasks().clear();
        tracing::debug!(context = %self.context, "all scheduled tasks cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
