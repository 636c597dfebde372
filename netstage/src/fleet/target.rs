//! Per-device connection inputs.

use std::time::Duration;

use secrecy::SecretString;

use crate::config::{Credentials, RunConfig};
use crate::driver::{DriverParams, OptionalArgs};
use crate::platform::ProbeParams;
use crate::transport::HostKeyVerification;

/// Address and credentials of one device.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    /// Device address; also its identity within the fleet.
    pub host: String,

    pub port: u16,

    pub username: String,

    pub password: SecretString,

    /// Privileged-mode secret, already defaulted to the password.
    pub secret: SecretString,
}

impl DeviceTarget {
    /// Target for `host` using the shared fleet credentials.
    pub fn new(host: impl Into<String>, port: u16, credentials: &Credentials) -> Self {
        Self {
            host: host.into(),
            port,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            secret: credentials.effective_secret(),
        }
    }

    /// One target per configured address, in order.
    pub fn fleet(config: &RunConfig) -> Vec<DeviceTarget> {
        config
            .devices
            .iter()
            .map(|host| Self::new(host.trim(), config.port, &config.credentials))
            .collect()
    }

    /// Parameters for an autodetect probe.
    pub fn probe_params(&self) -> ProbeParams {
        let mut params = ProbeParams::autodetect(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
            self.secret.clone(),
        );
        params.port = self.port;
        params
    }

    /// Construction parameters for a vendor driver.
    pub fn driver_params(
        &self,
        timeout: Duration,
        host_key_verification: HostKeyVerification,
    ) -> DriverParams {
        let mut optional_args = OptionalArgs::new(self.secret.clone());
        optional_args.port = self.port;
        optional_args.timeout = timeout;
        optional_args.host_key_verification = host_key_verification;
        DriverParams {
            hostname: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            optional_args,
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::config::TemplateSource;

    fn run_config(credentials: Credentials) -> RunConfig {
        RunConfig::new(
            vec!["10.0.0.1".into(), " 10.0.0.2 ".into()],
            credentials,
            TemplateSource {
                dir: "templates".into(),
                name: "full_config.hbs".into(),
            },
        )
    }

    #[test]
    fn test_fleet_preserves_order() {
        let targets = DeviceTarget::fleet(&run_config(Credentials::new("admin", "cisco")));
        let hosts: Vec<_> = targets.iter().map(|t| t.host.as_str()).collect();
        assert_eq!(hosts, ["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_secret_defaults_to_password_everywhere() {
        let targets = DeviceTarget::fleet(&run_config(Credentials::new("admin", "cisco")));
        for target in &targets {
            assert_eq!(target.secret.expose_secret(), "cisco");
            assert_eq!(target.probe_params().secret.expose_secret(), "cisco");
            let params = target.driver_params(Duration::from_secs(5), HostKeyVerification::Disabled);
            assert_eq!(params.optional_args.secret.expose_secret(), "cisco");
            assert!(params.optional_args.inline_transfer);
        }
    }

    #[test]
    fn test_explicit_secret_wins() {
        let creds = Credentials::new("admin", "cisco").with_secret("enable");
        let target = DeviceTarget::new("10.0.0.1", 2222, &creds);
        assert_eq!(target.probe_params().secret.expose_secret(), "enable");
        assert_eq!(target.probe_params().port, 2222);
        assert_eq!(target.probe_params().device_type, "autodetect");

        let params = target.driver_params(Duration::from_secs(5), HostKeyVerification::Strict);
        assert_eq!(params.hostname, "10.0.0.1");
        assert_eq!(params.password.expose_secret(), "cisco");
        assert_eq!(params.optional_args.secret.expose_secret(), "enable");
        assert_eq!(params.optional_args.port, 2222);
    }
}
