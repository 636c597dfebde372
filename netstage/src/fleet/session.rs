//! One device's lifecycle.

use std::fmt::Display;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::{Instant, error::Elapsed, timeout};

use super::report::DeviceOutcome;
use super::target::DeviceTarget;
use super::{SessionState, Stage};
use crate::config::Timeouts;
use crate::driver::{DriverResolver, DriverType, NetworkDriver};
use crate::error::{DriverError, Error, Result, StageError, TransportError};
use crate::platform::{PlatformProbe, VocabularyMapper};
use crate::render::RenderedConfig;
use crate::transport::HostKeyVerification;

/// Everything known about one device during a run.
///
/// Operations move the session one step along
/// `Created → Detected → Resolved → Connected → Staged → Committed →
/// Verified → Closed`. A failing step leaves it `Failed` with the
/// [`StageError`] recorded. Calling a step from the wrong state returns
/// [`DriverError::InvalidTransition`] and changes nothing.
///
/// A driver, once constructed, is owned here until [`release`] or
/// [`close`] gives it back to the device.
///
/// [`release`]: DeviceSession::release
/// [`close`]: DeviceSession::close
pub struct DeviceSession {
    target: DeviceTarget,
    state: SessionState,
    detected_platform: Option<String>,
    canonical_platform: Option<String>,
    driver_name: Option<String>,
    driver_type: Option<DriverType>,
    driver: Option<Box<dyn NetworkDriver>>,
    startup_config: Option<String>,
    failure: Option<StageError>,
    timeouts: Timeouts,
    host_key_verification: HostKeyVerification,
}

impl DeviceSession {
    /// A session in `Created` for `target`.
    pub fn new(
        target: DeviceTarget,
        timeouts: Timeouts,
        host_key_verification: HostKeyVerification,
    ) -> Self {
        Self {
            target,
            state: SessionState::Created,
            detected_platform: None,
            canonical_platform: None,
            driver_name: None,
            driver_type: None,
            driver: None,
            startup_config: None,
            failure: None,
            timeouts,
            host_key_verification,
        }
    }

    /// Device address.
    pub fn host(&self) -> &str {
        &self.target.host
    }

    /// Connection details of the device.
    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Platform name as the probe reported it.
    pub fn detected_platform(&self) -> Option<&str> {
        self.detected_platform.as_deref()
    }

    /// Detected platform in the canonical vocabulary.
    pub fn canonical_platform(&self) -> Option<&str> {
        self.canonical_platform.as_deref()
    }

    /// Driver-vocabulary name the session resolved to.
    pub fn driver_name(&self) -> Option<&str> {
        self.driver_name.as_deref()
    }

    /// Startup configuration read back by [`verify`](Self::verify).
    pub fn startup_config(&self) -> Option<&str> {
        self.startup_config.as_deref()
    }

    /// The stage failure that left the session `Failed`.
    pub fn failure(&self) -> Option<&StageError> {
        self.failure.as_ref()
    }

    /// The session is in `Failed`.
    pub fn is_failed(&self) -> bool {
        self.state == SessionState::Failed
    }

    /// A driver is still held (open or not).
    pub fn holds_driver(&self) -> bool {
        self.driver.is_some()
    }

    /// Snapshot for the fleet report.
    pub fn outcome(&self) -> DeviceOutcome {
        DeviceOutcome {
            host: self.target.host.clone(),
            state: self.state,
            detected_platform: self.detected_platform.clone(),
            canonical_platform: self.canonical_platform.clone(),
            driver_name: self.driver_name.clone(),
            startup_config: self.startup_config.clone(),
            failure: self.failure.clone(),
        }
    }

    /// Bound for the device call of a network stage.
    fn limit(&self, stage: Stage) -> Duration {
        self.timeouts.for_stage(stage).unwrap_or(Duration::MAX)
    }

    fn check(&self, stage: Stage) -> Result<()> {
        if self.state != stage.entry_state() {
            return Err(DriverError::InvalidTransition {
                host: self.target.host.clone(),
                from: self.state,
                to: stage.exit_state(),
            }
            .into());
        }
        Ok(())
    }

    fn advance(&mut self, to: SessionState) {
        info!("{}: {} -> {}", self.target.host, self.state, to);
        self.state = to;
    }

    /// Record a stage failure and hand back the error to return.
    fn fail(&mut self, stage: Stage, reason: impl Display) -> Error {
        let err = StageError::new(stage, self.target.host.clone(), reason);
        warn!("{}: {} -> failed: {}", self.target.host, self.state, err);
        self.state = SessionState::Failed;
        self.failure = Some(err.clone());
        Error::Stage(err)
    }

    /// Turn a bounded collaborator call into the stage's result.
    fn settle<T>(
        &mut self,
        stage: Stage,
        limit: Duration,
        outcome: std::result::Result<Result<T>, Elapsed>,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.fail(stage, e)),
            Err(_) => Err(self.fail(stage, TransportError::Timeout(limit))),
        }
    }

    /// Ask `probe` which platform the device runs.
    pub async fn detect(&mut self, probe: &dyn PlatformProbe) -> Result<()> {
        self.check(Stage::Detect)?;
        let limit = self.limit(Stage::Detect);
        let params = self.target.probe_params();

        let started = Instant::now();
        let outcome = timeout(limit, probe.probe(&params)).await;
        let guess = self.settle(Stage::Detect, limit, outcome)?;
        debug!(
            "{}: probe finished in {:?}",
            self.target.host,
            started.elapsed()
        );

        match guess {
            Some(platform) if !platform.is_empty() => {
                self.detected_platform = Some(platform);
                self.advance(SessionState::Detected);
                Ok(())
            }
            _ => Err(self.fail(Stage::Detect, "platform could not be determined")),
        }
    }

    /// Map the detected platform to a registered driver type.
    pub fn resolve(
        &mut self,
        vocabulary: &VocabularyMapper,
        resolver: &DriverResolver,
    ) -> Result<()> {
        self.check(Stage::Resolve)?;
        let detected = self.detected_platform.clone().unwrap_or_default();

        let canonical = vocabulary.normalize(&detected);
        if canonical.is_empty() {
            return Err(self.fail(Stage::Resolve, format!("unknown platform '{detected}'")));
        }
        self.canonical_platform = Some(canonical.to_string());

        let driver_name = vocabulary.to_driver_name(canonical);
        if driver_name.is_empty() {
            return Err(self.fail(
                Stage::Resolve,
                format!("no driver for platform '{canonical}'"),
            ));
        }
        self.driver_name = Some(driver_name.to_string());

        match resolver.resolve(driver_name) {
            Ok(driver_type) => {
                debug!(
                    "{}: {} -> {} -> {}",
                    self.target.host,
                    detected,
                    canonical,
                    driver_type.name()
                );
                self.driver_type = Some(driver_type);
                self.advance(SessionState::Resolved);
                Ok(())
            }
            Err(e) => Err(self.fail(Stage::Resolve, e)),
        }
    }

    /// Construct the driver and open it.
    pub async fn connect(&mut self) -> Result<()> {
        self.check(Stage::Connect)?;
        let limit = self.limit(Stage::Connect);
        let Some(driver_type) = self.driver_type.clone() else {
            return Err(self.fail(Stage::Connect, "no driver resolved"));
        };

        let params = self
            .target
            .driver_params(limit, self.host_key_verification.clone());
        let mut driver = driver_type.construct(params);
        let outcome = timeout(limit, driver.open()).await;
        // Held even when open failed so release() can still close it.
        self.driver = Some(driver);

        self.settle(Stage::Connect, limit, outcome)?;
        self.advance(SessionState::Connected);
        Ok(())
    }

    /// Load the rendered configuration file as a merge candidate.
    pub async fn stage(&mut self, rendered: &RenderedConfig) -> Result<()> {
        self.check(Stage::Stage)?;
        let limit = self.limit(Stage::Stage);
        let outcome = match self.driver.as_mut() {
            Some(driver) => timeout(limit, driver.load_merge_candidate(rendered.path())).await,
            None => Ok(Err(DriverError::NotConnected.into())),
        };
        self.settle(Stage::Stage, limit, outcome)?;
        self.advance(SessionState::Staged);
        Ok(())
    }

    /// Commit the staged candidate. A failed commit is not rolled back.
    pub async fn commit(&mut self) -> Result<()> {
        self.check(Stage::Commit)?;
        let limit = self.limit(Stage::Commit);
        let outcome = match self.driver.as_mut() {
            Some(driver) => timeout(limit, driver.commit_config()).await,
            None => Ok(Err(DriverError::NotConnected.into())),
        };
        self.settle(Stage::Commit, limit, outcome)?;
        self.advance(SessionState::Committed);
        Ok(())
    }

    /// Read the persisted configuration back and keep it.
    pub async fn verify(&mut self) -> Result<()> {
        self.check(Stage::Verify)?;
        let limit = self.limit(Stage::Verify);
        let outcome = match self.driver.as_mut() {
            Some(driver) => timeout(limit, driver.get_config()).await,
            None => Ok(Err(DriverError::NotConnected.into())),
        };
        let snapshot = self.settle(Stage::Verify, limit, outcome)?;

        match snapshot.get("startup") {
            Some(startup) if !startup.trim().is_empty() => {
                self.startup_config = Some(startup.to_string());
                self.advance(SessionState::Verified);
                Ok(())
            }
            _ => Err(self.fail(Stage::Verify, "readback has no startup configuration")),
        }
    }

    /// Close a verified session. Closing a closed session does nothing.
    pub async fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => return Ok(()),
            SessionState::Verified => {}
            from => {
                return Err(DriverError::InvalidTransition {
                    host: self.target.host.clone(),
                    from,
                    to: SessionState::Closed,
                }
                .into());
            }
        }
        self.release().await;
        self.advance(SessionState::Closed);
        Ok(())
    }

    /// Close the driver if one is held, whatever the state.
    ///
    /// The lifecycle state is left alone so a committed device is still
    /// reported as committed. Close errors are logged, not returned.
    pub async fn release(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let limit = self.timeouts.close();
        match timeout(limit, driver.close()).await {
            Ok(Ok(())) => debug!("{}: connection released", self.target.host),
            Ok(Err(e)) => warn!("{}: close failed: {}", self.target.host, e),
            Err(_) => warn!(
                "{}: close timed out after {:?}",
                self.target.host, limit
            ),
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        if !driver.is_open() {
            return;
        }
        let host = self.target.host.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("{host}: session dropped with an open driver, closing in background");
                let limit = self.timeouts.close();
                handle.spawn(async move {
                    if !matches!(timeout(limit, driver.close()).await, Ok(Ok(()))) {
                        warn!("{host}: background close failed");
                    }
                });
            }
            Err(_) => warn!("{host}: session dropped with an open driver outside a runtime"),
        }
    }
}
