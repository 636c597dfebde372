//! In-memory probe and driver that record every call.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::driver::{ConfigSnapshot, DriverParams, DriverResolver, DriverType, NetworkDriver};
use crate::error::{ChannelError, DriverError, Result, TransportError};
use crate::platform::{PlatformProbe, ProbeParams};

/// Shared, ordered log of collaborator calls such as `"commit 10.0.0.1"`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub(crate) fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    /// Entries starting with `prefix`, e.g. every `"open "`.
    pub(crate) fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub(crate) fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Probe answering from a table; unknown hosts are unreachable.
pub(crate) struct MockProbe {
    answers: HashMap<String, Option<String>>,
    journal: Journal,
}

impl MockProbe {
    pub(crate) fn new(journal: &Journal) -> Self {
        Self {
            answers: HashMap::new(),
            journal: journal.clone(),
        }
    }

    pub(crate) fn answer(mut self, host: &str, platform: &str) -> Self {
        self.answers
            .insert(host.to_string(), Some(platform.to_string()));
        self
    }

    pub(crate) fn inconclusive(mut self, host: &str) -> Self {
        self.answers.insert(host.to_string(), None);
        self
    }
}

#[async_trait]
impl PlatformProbe for MockProbe {
    async fn probe(&self, params: &ProbeParams) -> Result<Option<String>> {
        self.journal.record(format!(
            "probe {} type={} secret={}",
            params.host,
            params.device_type,
            params.secret.expose_secret()
        ));
        match self.answers.get(&params.host) {
            Some(answer) => Ok(answer.clone()),
            None => Err(ChannelError::Closed.into()),
        }
    }
}

/// Driver whose behaviour is scripted by a single failure keyword:
/// `open`, `load`, `commit`, `hang_commit` or `empty_startup`.
pub(crate) struct MockDriver {
    host: String,
    journal: Journal,
    failure: Option<String>,
    open: bool,
}

impl MockDriver {
    fn fails(&self, op: &str) -> bool {
        self.failure.as_deref() == Some(op)
    }
}

#[async_trait]
impl NetworkDriver for MockDriver {
    async fn open(&mut self) -> Result<()> {
        self.journal.record(format!("open {}", self.host));
        if self.fails("open") {
            return Err(TransportError::AuthenticationFailed {
                user: "admin".into(),
            }
            .into());
        }
        self.open = true;
        Ok(())
    }

    async fn load_merge_candidate(&mut self, path: &Path) -> Result<()> {
        self.journal.record(format!("load {}", self.host));
        if self.fails("load") || !path.exists() {
            return Err(DriverError::EmptyCandidate(path.to_path_buf()).into());
        }
        Ok(())
    }

    async fn commit_config(&mut self) -> Result<()> {
        self.journal.record(format!("commit {}", self.host));
        if self.fails("hang_commit") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fails("commit") {
            return Err(DriverError::CommandFailed {
                command: "commit".into(),
                message: "% Invalid input".into(),
            }
            .into());
        }
        Ok(())
    }

    async fn get_config(&mut self) -> Result<ConfigSnapshot> {
        self.journal.record(format!("get_config {}", self.host));
        let startup = if self.fails("empty_startup") {
            String::new()
        } else {
            format!("hostname {}\n!\nend", self.host)
        };
        Ok(ConfigSnapshot {
            running: startup.clone(),
            startup,
            candidate: String::new(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.journal.record(format!("close {}", self.host));
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Resolver with mock drivers under the built-in driver names.
///
/// `failures` maps a host to the failure keyword its driver acts out.
pub(crate) fn mock_resolver(journal: &Journal, failures: &[(&str, &str)]) -> DriverResolver {
    let failures: HashMap<String, String> = failures
        .iter()
        .map(|(host, op)| (host.to_string(), op.to_string()))
        .collect();

    let mut resolver = DriverResolver::new();
    for name in ["ios", "iosxr", "nxos_ssh", "eos", "junos"] {
        let journal = journal.clone();
        let failures = failures.clone();
        resolver
            .register(DriverType::new(name, move |params: DriverParams| {
                journal.record(format!(
                    "construct {} secret={}",
                    params.hostname,
                    params.optional_args.secret.expose_secret()
                ));
                Box::new(MockDriver {
                    failure: failures.get(&params.hostname).cloned(),
                    host: params.hostname,
                    journal: journal.clone(),
                    open: false,
                }) as Box<dyn NetworkDriver>
            }))
            .unwrap();
    }
    resolver
}
