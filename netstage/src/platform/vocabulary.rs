//! Platform name vocabularies.
//!
//! Three name spaces meet here: the names the SSH probe reports, a
//! vendor-neutral canonical name, and the names the driver resolver knows.
//! Both lookups are total: a miss yields the empty string, and it is up to
//! the resolver to reject it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Probe vocabulary → canonical vocabulary.
const PROBE_TO_CANONICAL: &[(&str, &str)] = &[
    ("cisco_ios", "cisco_ios"),
    ("cisco_xe", "cisco_xe"),
    ("cisco_xr", "cisco_xr"),
    ("cisco_nxos", "cisco_nxos"),
    ("cisco_asa", "cisco_asa"),
    ("arista_eos", "arista_eos"),
    ("juniper", "juniper_junos"),
    ("juniper_junos", "juniper_junos"),
    ("nokia_sros", "nokia_sros"),
    ("paloalto_panos", "paloalto_panos"),
    ("huawei", "huawei_vrp"),
    ("huawei_vrp", "huawei_vrp"),
    ("linux", "linux"),
];

/// Canonical vocabulary → driver vocabulary.
const CANONICAL_TO_DRIVER: &[(&str, &str)] = &[
    ("cisco_ios", "ios"),
    ("cisco_xe", "ios"),
    ("cisco_xr", "iosxr"),
    ("cisco_nxos", "nxos_ssh"),
    ("cisco_asa", "asa"),
    ("arista_eos", "eos"),
    ("juniper_junos", "junos"),
    ("nokia_sros", "sros"),
    ("paloalto_panos", "panos"),
    ("huawei_vrp", "huawei_vrp"),
];

static BUILTIN: Lazy<VocabularyMapper> = Lazy::new(|| VocabularyMapper {
    probe_to_canonical: to_table(PROBE_TO_CANONICAL),
    canonical_to_driver: to_table(CANONICAL_TO_DRIVER),
});

fn to_table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Two static lookup tables joining probe, canonical and driver names.
#[derive(Debug, Clone)]
pub struct VocabularyMapper {
    probe_to_canonical: HashMap<String, String>,
    canonical_to_driver: HashMap<String, String>,
}

impl VocabularyMapper {
    /// The built-in tables.
    pub fn global() -> &'static VocabularyMapper {
        &BUILTIN
    }

    /// Build custom tables. Fails if either table repeats a key.
    pub fn from_pairs<K, V>(
        probe_to_canonical: impl IntoIterator<Item = (K, V)>,
        canonical_to_driver: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self {
            probe_to_canonical: unique_table(probe_to_canonical)?,
            canonical_to_driver: unique_table(canonical_to_driver)?,
        })
    }

    /// Probe name → canonical name, `""` if unknown.
    pub fn normalize(&self, probe_identity: &str) -> &str {
        self.probe_to_canonical
            .get(probe_identity)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Canonical name → driver name, `""` if unknown.
    pub fn to_driver_name(&self, canonical: &str) -> &str {
        self.canonical_to_driver
            .get(canonical)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Both lookups chained: `(canonical, driver)`.
    pub fn resolve_chain(&self, probe_identity: &str) -> (&str, &str) {
        let canonical = self.normalize(probe_identity);
        (canonical, self.to_driver_name(canonical))
    }
}

fn unique_table<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<HashMap<String, String>>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut table = HashMap::new();
    for (key, value) in pairs {
        let key = key.into();
        if table.contains_key(&key) {
            return Err(Error::Config {
                message: format!("duplicate vocabulary key '{key}'"),
            });
        }
        table.insert(key, value.into());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_have_unique_keys() {
        assert!(VocabularyMapper::from_pairs(
            PROBE_TO_CANONICAL.iter().copied(),
            CANONICAL_TO_DRIVER.iter().copied()
        )
        .is_ok());
    }

    #[test]
    fn test_cisco_ios_chain() {
        let vocab = VocabularyMapper::global();
        assert_eq!(vocab.normalize("cisco_ios"), "cisco_ios");
        assert_eq!(vocab.to_driver_name("cisco_ios"), "ios");
        assert_eq!(vocab.resolve_chain("cisco_xe"), ("cisco_xe", "ios"));
        assert_eq!(vocab.resolve_chain("juniper"), ("juniper_junos", "junos"));
    }

    #[test]
    fn test_misses_return_empty_sentinel() {
        let vocab = VocabularyMapper::global();
        assert_eq!(vocab.normalize("acme_os"), "");
        assert_eq!(vocab.normalize(""), "");
        assert_eq!(vocab.to_driver_name(""), "");
        assert_eq!(vocab.to_driver_name("linux"), "");
        assert_eq!(vocab.resolve_chain("acme_os"), ("", ""));
    }

    #[test]
    fn test_every_canonical_driver_key_is_reachable() {
        let vocab = VocabularyMapper::global();
        for (canonical, _) in CANONICAL_TO_DRIVER {
            assert!(
                PROBE_TO_CANONICAL.iter().any(|(_, c)| c == canonical),
                "{canonical} has no probe name"
            );
            assert!(!vocab.to_driver_name(canonical).is_empty());
        }
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = VocabularyMapper::from_pairs(
            [("cisco_ios", "cisco_ios"), ("cisco_ios", "cisco_xe")],
            [("cisco_ios", "ios")],
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
