//! Stage-batched fleet runs.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::watch;

use super::report::FleetReport;
use super::session::DeviceSession;
use super::target::DeviceTarget;
use super::{SessionState, Stage};
use crate::config::{FailurePolicy, RunConfig};
use crate::driver::DriverResolver;
use crate::error::Result;
use crate::platform::{PlatformProbe, SshProbe, VocabularyMapper};
use crate::render::{RenderedConfig, TemplateRenderer, load_variables};

/// Stops a run between stages.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation; the run stops before its next stage.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drives every device of a [`RunConfig`] through the staging lifecycle.
///
/// ```rust,no_run
/// use netstage::{FleetOrchestrator, RunConfig};
///
/// # async fn run() -> Result<(), netstage::Error> {
/// let config = RunConfig::from_yaml_file("run.yml")?;
/// let report = FleetOrchestrator::new(config).run().await?;
/// for outcome in &report.outcomes {
///     println!("{}: {}", outcome.host, outcome.state);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FleetOrchestrator {
    config: RunConfig,
    probe: Box<dyn PlatformProbe>,
    vocabulary: VocabularyMapper,
    resolver: DriverResolver,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl FleetOrchestrator {
    /// Orchestrator with the SSH probe, built-in vocabulary and drivers.
    pub fn new(config: RunConfig) -> Self {
        let probe = SshProbe::new(Duration::from_secs(config.timeouts.probe))
            .with_host_key_verification(config.host_key_verification.clone());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            config,
            probe: Box::new(probe),
            vocabulary: VocabularyMapper::global().clone(),
            resolver: DriverResolver::builtin(),
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    /// Replace the platform probe.
    pub fn with_probe(mut self, probe: impl PlatformProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Replace the driver registry.
    pub fn with_resolver(mut self, resolver: DriverResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the vocabulary tables.
    pub fn with_vocabulary(mut self, vocabulary: VocabularyMapper) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle that stops the run before its next stage.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Render the template and write it to the output file.
    pub fn render(&self) -> Result<RenderedConfig> {
        let config = &self.config;
        let variables = match config.variables {
            Some(ref vars) if !vars.is_empty() => vars.clone(),
            _ => load_variables(&config.variables_dir(), &config.variables_file.file)?,
        };
        let mut renderer = TemplateRenderer::new(config.template_dir());
        let text = renderer.render(&config.template.name, &variables)?;
        RenderedConfig::write(text, &config.output_dir(), &config.output.file)
    }

    /// Render once, then run every stage across the fleet.
    ///
    /// Device failures do not make this return `Err`; they are in the
    /// report (see [`FleetReport::into_result`]). `Err` means the run never
    /// reached the devices: bad configuration or a rendering failure.
    ///
    /// Stop a run with [`cancel_handle`](Self::cancel_handle): the current
    /// stage finishes, every session is released and the report comes
    /// back. Dropping the future instead (an outer timeout, `select!`)
    /// abandons the stage mid-call; open drivers are then closed by
    /// background tasks on the current runtime and no report is produced.
    pub async fn run(&self) -> Result<FleetReport> {
        self.config.validate()?;
        let rendered = self.render()?;

        let mut fleet: Vec<DeviceSession> = DeviceTarget::fleet(&self.config)
            .into_iter()
            .map(|target| {
                DeviceSession::new(
                    target,
                    self.config.timeouts.clone(),
                    self.config.host_key_verification.clone(),
                )
            })
            .collect();
        info!(
            "staging {} on {} devices ({:?} policy)",
            rendered.path().display(),
            fleet.len(),
            self.config.failure_policy
        );

        let (halted_at, cancelled) = self.run_stages(&mut fleet, &rendered).await;

        for session in fleet.iter_mut() {
            session.release().await;
        }

        let report = FleetReport {
            outcomes: fleet.iter().map(DeviceSession::outcome).collect(),
            halted_at,
            cancelled,
        };
        info!(
            "run finished: {} closed, {} committed, {} failed of {}",
            report.count(SessionState::Closed),
            report.count(SessionState::Committed),
            report.count(SessionState::Failed),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// Returns the stage the run stopped at and whether it was cancelled.
    async fn run_stages(
        &self,
        fleet: &mut [DeviceSession],
        rendered: &RenderedConfig,
    ) -> (Option<Stage>, bool) {
        for stage in Stage::ALL {
            if *self.cancel_rx.borrow() {
                warn!("run cancelled before stage '{}'", stage);
                return (Some(stage), true);
            }
            info!("stage '{}' starting", stage);

            for session in fleet.iter_mut() {
                if session.is_failed() {
                    continue;
                }
                let result = match stage {
                    Stage::Detect => session.detect(self.probe.as_ref()).await,
                    Stage::Resolve => session.resolve(&self.vocabulary, &self.resolver),
                    Stage::Connect => session.connect().await,
                    Stage::Stage => session.stage(rendered).await,
                    Stage::Commit => session.commit().await,
                    Stage::Verify => match session.verify().await {
                        Ok(()) => session.close().await,
                        Err(e) => Err(e),
                    },
                };

                if let Err(e) = result
                    && self.config.failure_policy == FailurePolicy::Abort
                {
                    warn!("halting run at stage '{}': {}", stage, e);
                    return (Some(stage), false);
                }
            }
        }
        (None, false)
    }
}
