//! Driver-vocabulary name → constructible driver type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::cli::CliDriver;
use super::{DriverParams, NetworkDriver};
use crate::error::{DriverError, Result};
use crate::platform::{PlatformDefinition, vendors};

/// Builds a driver from connection parameters.
pub type DriverFactory = Arc<dyn Fn(DriverParams) -> Box<dyn NetworkDriver> + Send + Sync>;

/// A named, constructible driver type.
#[derive(Clone)]
pub struct DriverType {
    name: String,
    factory: DriverFactory,
}

impl DriverType {
    /// Wrap a factory function.
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn(DriverParams) -> Box<dyn NetworkDriver> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// A CLI driver type for a platform definition, named after it.
    pub fn cli(platform: PlatformDefinition) -> Self {
        let name = platform.name.clone();
        Self::new(name, move |params| {
            Box::new(CliDriver::new(params, platform.clone())) as Box<dyn NetworkDriver>
        })
    }

    /// The driver-vocabulary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct an unopened driver.
    pub fn construct(&self, params: DriverParams) -> Box<dyn NetworkDriver> {
        (self.factory)(params)
    }
}

impl fmt::Debug for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of driver types keyed by driver-vocabulary name.
#[derive(Debug, Clone, Default)]
pub struct DriverResolver {
    drivers: HashMap<String, DriverType>,
}

impl DriverResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver with every built-in CLI platform registered.
    pub fn builtin() -> Self {
        let mut resolver = Self::new();
        for platform in vendors::builtin() {
            resolver
                .drivers
                .insert(platform.name.clone(), DriverType::cli(platform));
        }
        resolver
    }

    /// Register a driver type. Names must be unique and non-empty.
    pub fn register(&mut self, driver: DriverType) -> Result<()> {
        if driver.name.is_empty() {
            return Err(DriverError::UnknownDriver { name: driver.name }.into());
        }
        if self.drivers.contains_key(&driver.name) {
            return Err(DriverError::DuplicateDriver { name: driver.name }.into());
        }
        self.drivers.insert(driver.name.clone(), driver);
        Ok(())
    }

    /// Register a driver type, replacing any existing one with that name.
    pub fn replace(&mut self, driver: DriverType) {
        self.drivers.insert(driver.name.clone(), driver);
    }

    /// Look a driver type up. Nothing is constructed here, so an empty or
    /// unknown name fails before any vendor code runs.
    pub fn resolve(&self, name: &str) -> Result<DriverType> {
        if name.is_empty() {
            return Err(DriverError::UnknownDriver {
                name: String::new(),
            }
            .into());
        }
        self.drivers.get(name).cloned().ok_or_else(|| {
            DriverError::UnknownDriver {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Check if a driver is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// List all registered driver names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::SecretString;

    use super::*;
    use crate::Error;
    use crate::driver::{CliDriver, OptionalArgs};
    use crate::platform::VocabularyMapper;

    fn params() -> DriverParams {
        DriverParams {
            hostname: "10.0.0.1".into(),
            username: "admin".into(),
            password: SecretString::from("cisco"),
            optional_args: OptionalArgs::new(SecretString::from("cisco")),
        }
    }

    #[test]
    fn test_builtin_covers_vocabulary_targets() {
        let resolver = DriverResolver::builtin();
        let vocab = VocabularyMapper::global();
        for probe in ["cisco_ios", "cisco_xe", "cisco_xr", "cisco_nxos", "arista_eos", "juniper_junos"] {
            let (_, driver) = vocab.resolve_chain(probe);
            assert!(resolver.contains(driver), "{probe} -> {driver} not registered");
        }
    }

    #[test]
    fn test_resolve_builtin_constructs_closed_driver() {
        let resolver = DriverResolver::builtin();
        let driver_type = resolver.resolve("ios").unwrap();
        assert_eq!(driver_type.name(), "ios");
        let driver = driver_type.construct(params());
        assert!(!driver.is_open());
    }

    #[test]
    fn test_empty_name_fails_without_construction() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = constructed.clone();

        let mut resolver = DriverResolver::new();
        resolver
            .register(DriverType::new("ios", move |params| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::new(CliDriver::new(params, vendors::cisco_ios::platform())) as Box<dyn NetworkDriver>
            }))
            .unwrap();

        assert!(matches!(
            resolver.resolve(""),
            Err(Error::Driver(DriverError::UnknownDriver { .. }))
        ));
        assert!(matches!(
            resolver.resolve("acme"),
            Err(Error::Driver(DriverError::UnknownDriver { .. }))
        ));
        assert_eq!(constructed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut resolver = DriverResolver::builtin();
        let result = resolver.register(DriverType::cli(vendors::arista_eos::platform()));
        assert!(matches!(
            result,
            Err(Error::Driver(DriverError::DuplicateDriver { .. }))
        ));

        resolver.replace(DriverType::cli(vendors::arista_eos::platform()));
        assert!(resolver.contains("eos"));
    }
}
