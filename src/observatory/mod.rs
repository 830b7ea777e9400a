//! Observatory - the single writer of the sky state
//!
//! Commands arrive on a bounded queue and run strictly one at a time,
//! including any oracle calls they await, so two discoveries close together
//! are reconciled in order and never interleave. Callers talk to it through a
//! cloneable [`ObservatoryHandle`] and can subscribe to [`SkyEvent`]s.

pub mod events;

pub use events::SkyEvent;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ObservatoryConfig;
use crate::metrics::Metrics;
use crate::oracle::{
    analysis_or_fallback, describe_or_placeholder, DiscoveryOracle, NamingOracle, Provenance,
};
use crate::sky::body::{BodyId, CelestialBody};
use crate::sky::constants::map;
use crate::sky::registry::{ConstellationDiscovered, ConstellationRegistry, ReconcileChange};
use crate::sky::save::SaveError;
use crate::sky::state::{LogKind, SkyState};
use crate::util::vec2::Vec2;

/// Errors returned to handle callers
#[derive(Debug, thiserror::Error)]
pub enum ObservatoryError {
    #[error("Unknown body: {0}")]
    UnknownBody(BodyId),
    #[error("Observatory is no longer running")]
    QueueClosed,
    #[error("Save failed: {0}")]
    Save(#[from] SaveError),
}

/// Runtime settings for the observatory task
#[derive(Debug, Clone)]
pub struct ObservatorySettings {
    /// Deadline for every oracle call
    pub oracle_timeout: Duration,
    /// Snapshot location; `None` disables saving
    pub save_path: Option<PathBuf>,
    /// Save after every state-changing command
    pub autosave: bool,
    /// Fixed seed for scan positions
    pub seed: Option<u64>,
    pub log_capacity: usize,
    /// Pending commands before senders wait
    pub queue_capacity: usize,
}

impl Default for ObservatorySettings {
    fn default() -> Self {
        Self {
            oracle_timeout: Duration::from_secs(8),
            save_path: None,
            autosave: false,
            seed: None,
            log_capacity: 50,
            queue_capacity: 64,
        }
    }
}

impl From<&ObservatoryConfig> for ObservatorySettings {
    fn from(config: &ObservatoryConfig) -> Self {
        Self {
            oracle_timeout: config.oracle.timeout(),
            save_path: Some(PathBuf::from(&config.save_path)),
            autosave: config.autosave,
            seed: config.seed,
            log_capacity: config.log_capacity,
            ..Self::default()
        }
    }
}

/// Outcome of one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub body: CelestialBody,
    pub body_source: Provenance,
    pub discoveries: Vec<ConstellationDiscovered>,
    pub changes: Vec<ReconcileChange>,
}

/// Outcome of one analysis request
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub body: BodyId,
    /// False when the body had already been analyzed
    pub applied: bool,
    pub source: Option<Provenance>,
    pub description: String,
}

enum Command {
    Scan {
        reply: oneshot::Sender<ScanReport>,
    },
    Analyze {
        body: BodyId,
        reply: oneshot::Sender<Result<AnalysisReport, ObservatoryError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SkyState>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Save {
        reply: oneshot::Sender<Result<(), ObservatoryError>>,
    },
}

/// Cloneable front end to a running observatory
#[derive(Debug, Clone)]
pub struct ObservatoryHandle {
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Scan { .. } => "Scan",
            Command::Analyze { .. } => "Analyze",
            Command::Snapshot { .. } => "Snapshot",
            Command::Reset { .. } => "Reset",
            Command::Save { .. } => "Save",
        };
        f.write_str(name)
    }
}

impl ObservatoryHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ObservatoryError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ObservatoryError::QueueClosed)?;
        response.await.map_err(|_| ObservatoryError::QueueClosed)
    }

    /// Discover one new body and reconcile constellations
    pub async fn scan(&self) -> Result<ScanReport, ObservatoryError> {
        self.request(|reply| Command::Scan { reply }).await
    }

    /// Run the analysis oracle on a body (once per body)
    pub async fn analyze(&self, body: BodyId) -> Result<AnalysisReport, ObservatoryError> {
        self.request(|reply| Command::Analyze { body, reply }).await?
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> Result<SkyState, ObservatoryError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Clear all bodies, constellations, resources and log entries
    pub async fn reset(&self) -> Result<(), ObservatoryError> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Write the snapshot file now
    pub async fn save(&self) -> Result<(), ObservatoryError> {
        self.request(|reply| Command::Save { reply }).await?
    }
}

/// Everything returned by [`Observatory::spawn`]
pub struct RunningObservatory {
    pub handle: ObservatoryHandle,
    pub events: mpsc::UnboundedReceiver<SkyEvent>,
    /// Resolves to the final state once every handle is dropped
    pub task: JoinHandle<SkyState>,
}

/// State owner; lives inside its own task
pub struct Observatory<O> {
    state: SkyState,
    oracle: O,
    settings: ObservatorySettings,
    rng: StdRng,
    metrics: Arc<Metrics>,
    events: mpsc::UnboundedSender<SkyEvent>,
    commands: mpsc::Receiver<Command>,
}

impl<O> Observatory<O>
where
    O: NamingOracle + DiscoveryOracle + 'static,
{
    /// Start the observatory task
    pub fn spawn(
        mut state: SkyState,
        oracle: O,
        settings: ObservatorySettings,
        metrics: Arc<Metrics>,
    ) -> RunningObservatory {
        let (command_tx, command_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        state.log.set_capacity(settings.log_capacity);
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let observatory = Self {
            state,
            oracle,
            settings,
            rng,
            metrics,
            events: event_tx,
            commands: command_rx,
        };
        observatory.refresh_totals();

        RunningObservatory {
            handle: ObservatoryHandle { commands: command_tx },
            events: event_rx,
            task: tokio::spawn(observatory.run()),
        }
    }

    async fn run(mut self) -> SkyState {
        info!(
            "Observatory online: {} bodies, {} constellations",
            self.state.bodies.len(),
            self.state.constellations.len()
        );

        while let Some(command) = self.commands.recv().await {
            debug!("Processing {:?}", command);
            match command {
                Command::Scan { reply } => {
                    let report = self.scan().await;
                    self.autosave();
                    let _ = reply.send(report);
                }
                Command::Analyze { body, reply } => {
                    let result = self.analyze(body).await;
                    if matches!(result, Ok(AnalysisReport { applied: true, .. })) {
                        self.autosave();
                    }
                    let _ = reply.send(result);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.state.clone());
                }
                Command::Reset { reply } => {
                    self.reset();
                    self.autosave();
                    let _ = reply.send(());
                }
                Command::Save { reply } => {
                    let _ = reply.send(self.save());
                }
            }
        }

        info!("Observatory stopped after {} scans", self.state.scans);
        self.state
    }

    fn emit(&self, event: SkyEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn refresh_totals(&self) {
        self.metrics.set_totals(
            self.state.bodies.len(),
            self.state.constellations.len(),
            self.state.resources.starlight,
            self.state.resources.data,
        );
    }

    async fn scan(&mut self) -> ScanReport {
        let position = Vec2::new(
            self.rng.gen_range(map::MIN..=map::MAX),
            self.rng.gen_range(map::MIN..=map::MAX),
        );
        let existing = self.state.bodies.len();

        let (profile, body_source) = describe_or_placeholder(
            &self.oracle,
            position,
            existing,
            self.settings.oracle_timeout,
            &mut self.rng,
        )
        .await;

        if body_source.is_fallback() {
            self.metrics.oracle_failures.fetch_add(1, Ordering::Relaxed);
            self.metrics.placeholder_bodies.fetch_add(1, Ordering::Relaxed);
        }

        let body = CelestialBody::discover(position, profile, chrono::Utc::now());
        info!(
            "Discovered {} ({}) at ({:.0}, {:.0})",
            body.name, body.kind, body.position.x, body.position.y
        );
        self.state.bodies.insert(body.clone());
        self.state.scans += 1;
        self.state
            .log
            .push(LogKind::BodyDiscovered, format!("Discovered {} ({})", body.name, body.kind));
        self.metrics.scans_total.fetch_add(1, Ordering::Relaxed);
        self.emit(SkyEvent::BodyDiscovered {
            id: body.id,
            name: body.name.clone(),
            kind: body.kind,
            position: body.position,
            source: body_source,
        });

        let (discoveries, changes) = self.reconcile().await;
        self.refresh_totals();

        ScanReport {
            body,
            body_source,
            discoveries,
            changes,
        }
    }

    /// Reconcile constellations against the current bodies and pay out rewards
    async fn reconcile(&mut self) -> (Vec<ConstellationDiscovered>, Vec<ReconcileChange>) {
        let registry = ConstellationRegistry::new(&self.oracle, self.settings.oracle_timeout);
        let constellations = std::mem::take(&mut self.state.constellations);

        let started = Instant::now();
        let result = registry
            .reconcile(self.state.bodies.as_slice(), constellations)
            .await;
        self.metrics.record_reconcile_time(started.elapsed());
        self.metrics.record_changes(&result.changes);
        self.state.constellations = result.constellations;

        for discovered in &result.discoveries {
            if discovered.name_source.is_fallback() {
                self.metrics.oracle_failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.fallback_names.fetch_add(1, Ordering::Relaxed);
            }
            self.state.resources.credit(discovered.reward);
            self.state.log.push(
                LogKind::ConstellationDiscovered,
                format!(
                    "Constellation {} charted ({} bodies, +{} starlight, +{} data)",
                    discovered.name,
                    discovered.member_count,
                    discovered.reward.starlight,
                    discovered.reward.data
                ),
            );
            self.emit(SkyEvent::ConstellationDiscovered(discovered.clone()));
        }

        for change in &result.changes {
            if let Some(event) = SkyEvent::from_growth(change) {
                let (id, added) = match change {
                    ReconcileChange::Extended { id, added } => (*id, *added),
                    ReconcileChange::Merged { target, added, .. } => (*target, *added),
                    ReconcileChange::Created { id } => (*id, 0),
                };
                let name = self
                    .state
                    .constellations
                    .get(id)
                    .map(|c| c.name.as_str())
                    .unwrap_or("constellation");
                self.state
                    .log
                    .push(LogKind::ConstellationGrew, format!("{} grew by {} bodies", name, added));
                self.emit(event);
            }
        }

        if !result.discoveries.is_empty() {
            self.emit(SkyEvent::ResourcesChanged(self.state.resources));
        }

        (result.discoveries, result.changes)
    }

    async fn analyze(&mut self, id: BodyId) -> Result<AnalysisReport, ObservatoryError> {
        let body = self
            .state
            .bodies
            .get(id)
            .cloned()
            .ok_or(ObservatoryError::UnknownBody(id))?;

        if body.analyzed {
            debug!("{} already analyzed", body.name);
            return Ok(AnalysisReport {
                body: id,
                applied: false,
                source: None,
                description: body.description,
            });
        }

        let (text, source) =
            analysis_or_fallback(&self.oracle, &body, self.settings.oracle_timeout).await;
        if source.is_fallback() {
            self.metrics.oracle_failures.fetch_add(1, Ordering::Relaxed);
        }

        let entry = self
            .state
            .bodies
            .get_mut(id)
            .ok_or(ObservatoryError::UnknownBody(id))?;
        let applied = entry.apply_analysis(&text);
        let description = entry.description.clone();

        self.state
            .log
            .push(LogKind::BodyAnalyzed, format!("Analyzed {}", body.name));
        self.metrics.analyses_total.fetch_add(1, Ordering::Relaxed);
        self.emit(SkyEvent::BodyAnalyzed { id, source });

        Ok(AnalysisReport {
            body: id,
            applied,
            source: Some(source),
            description,
        })
    }

    fn reset(&mut self) {
        self.state.reset();
        info!("Sky reset");
        self.refresh_totals();
        self.emit(SkyEvent::Reset);
    }

    fn save(&self) -> Result<(), ObservatoryError> {
        let Some(path) = &self.settings.save_path else {
            debug!("No save path configured, skipping save");
            return Ok(());
        };

        match self.state.save(path) {
            Ok(()) => {
                self.metrics.saves_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.metrics.save_failures.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    fn autosave(&self) {
        if !self.settings.autosave {
            return;
        }
        if let Err(e) = self.save() {
            error!("Autosave failed: {}", e);
        }
    }
}
