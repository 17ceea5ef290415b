//! Alias resolution: `RawServiceConfig` -> `ServiceConfig` (spec §3, §4.4).

use devport_protocol::{RawServiceConfig, ServiceConfig};

/// Resolves legacy key aliases, preferring the new spelling when both are
/// present. `name` is only used for error messages raised by callers; this
/// function itself cannot fail.
pub fn normalize_service_config(raw: &RawServiceConfig) -> ServiceConfig {
    ServiceConfig {
        cmd: raw.cmd.clone().or_else(|| raw.dev.clone()),
        port: raw.port.or(raw.preferred_port),
        health_path: raw
            .health_path
            .clone()
            .or_else(|| raw.health.clone())
            .unwrap_or_else(|| "/".to_string()),
        needs: raw.needs.clone(),
        no_port: raw.no_port,
        remote: raw.remote.clone(),
        dir: raw.dir.clone(),
        env: raw.env.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_wins_when_both_present() {
        let mut raw = RawServiceConfig::default();
        raw.cmd = Some("node new.js".to_string());
        raw.dev = Some("node old.js".to_string());
        raw.port = Some(4000);
        raw.preferred_port = Some(3000);
        let cfg = normalize_service_config(&raw);
        assert_eq!(cfg.cmd.as_deref(), Some("node new.js"));
        assert_eq!(cfg.port, Some(4000));
    }

    #[test]
    fn legacy_alias_used_when_new_key_absent() {
        let mut raw = RawServiceConfig::default();
        raw.dev = Some("node old.js".to_string());
        raw.preferred_port = Some(3000);
        raw.health = Some("/ping".to_string());
        let cfg = normalize_service_config(&raw);
        assert_eq!(cfg.cmd.as_deref(), Some("node old.js"));
        assert_eq!(cfg.port, Some(3000));
        assert_eq!(cfg.health_path, "/ping");
    }

    #[test]
    fn explicit_zero_port_is_preserved() {
        let mut raw = RawServiceConfig::default();
        raw.port = Some(0);
        let cfg = normalize_service_config(&raw);
        assert_eq!(cfg.port, Some(0));
    }

    #[test]
    fn missing_health_path_defaults_to_root() {
        let raw = RawServiceConfig::default();
        let cfg = normalize_service_config(&raw);
        assert_eq!(cfg.health_path, "/");
    }
}
