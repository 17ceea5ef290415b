//! Converts a [`ScanResult`] into a [`ProjectConfig`] ready to write to
//! disk, and produces the diff-against-existing guidance surfaced by the
//! `scan` CLI operation (spec §4.3.5, §6).

use devport_protocol::{ProjectConfig, RawServiceConfig};
use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::orchestrator::sanitize_key;
use crate::scanner::ScanResult;

/// Project-level port range: `[min(preferred ports), max(preferred
/// ports) + 49]`, wide enough to leave headroom for a service's own
/// sub-ports (e.g. a debugger or metrics sidecar) without colliding with
/// a neighboring service's range.
fn compute_port_range(preferred_ports: &[u16]) -> (u16, u16) {
    let lo = preferred_ports.iter().copied().min().unwrap_or(devport_protocol::record::DEFAULT_PORT_RANGE.0);
    let hi = preferred_ports
        .iter()
        .copied()
        .max()
        .unwrap_or(devport_protocol::record::DEFAULT_PORT_RANGE.0)
        .saturating_add(49);
    (lo, hi)
}

/// Builds a [`ProjectConfig`] from a freshly discovered [`ScanResult`].
/// Returns the config plus any sanitize-key collisions among the
/// discovered service names, which the caller should surface as
/// guidance rather than as an error.
pub fn build_config(scan: &ScanResult) -> (ProjectConfig, Vec<String>) {
    let mut services = IndexMap::new();
    let mut seen_keys: BTreeMap<String, String> = BTreeMap::new();
    let mut collisions = Vec::new();

    for (name, discovered) in &scan.services {
        let key = sanitize_key(name);
        if let Some(prior) = seen_keys.get(&key) {
            if prior != name {
                collisions.push(format!(
                    "{key} is derived from both {prior} and {name}; env derivation will prefer whichever runs last"
                ));
            }
        }
        seen_keys.insert(key, name.clone());

        services.insert(
            name.clone(),
            RawServiceConfig {
                cmd: Some(discovered.dev.clone()),
                dev: None,
                port: Some(discovered.preferred_port as i64),
                preferred_port: None,
                health_path: Some(discovered.health_path.clone()),
                health: None,
                needs: Vec::new(),
                no_port: false,
                remote: None,
                dir: Some(discovered.relative_path.to_string_lossy().to_string()),
                env: BTreeMap::new(),
                detected: Some(discovered.stack.clone()),
                identity: None,
            },
        );
    }

    let preferred_ports: Vec<u16> = scan.services.values().map(|s| s.preferred_port).collect();
    let port_range = compute_port_range(&preferred_ports);

    (
        ProjectConfig {
            project: scan.project.clone(),
            services,
            port_range,
        },
        collisions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{DiscoveredService, ProjectType};
    use std::path::PathBuf;

    fn scan_with(services: Vec<(&str, u16)>) -> ScanResult {
        let mut map = BTreeMap::new();
        for (name, port) in services {
            map.insert(
                name.to_string(),
                DiscoveredService {
                    relative_path: PathBuf::from(name),
                    stack: "go".to_string(),
                    preferred_port: port,
                    dev: "go run .".to_string(),
                    health_path: "/healthz".to_string(),
                },
            );
        }
        let count = map.len();
        ScanResult {
            project: "demo".to_string(),
            project_type: ProjectType::Monorepo,
            service_count: count,
            services: map,
            suggestions: Vec::new(),
            existing_config: None,
            guidance: Vec::new(),
        }
    }

    #[test]
    fn port_range_spans_preferred_ports_plus_headroom() {
        let scan = scan_with(vec![("api", 3100), ("web", 3200)]);
        let (cfg, _) = build_config(&scan);
        assert_eq!(cfg.port_range, (3100, 3249));
    }

    #[test]
    fn service_dir_and_detected_stack_are_recorded() {
        let scan = scan_with(vec![("api", 3100)]);
        let (cfg, _) = build_config(&scan);
        let svc = &cfg.services["api"];
        assert_eq!(svc.dir.as_deref(), Some("api"));
        assert_eq!(svc.detected.as_deref(), Some("go"));
    }

    #[test]
    fn sanitize_key_collisions_are_reported() {
        let scan = scan_with(vec![("my-db", 3100), ("my.db", 3200)]);
        let (_, collisions) = build_config(&scan);
        assert_eq!(collisions.len(), 1);
    }
}
