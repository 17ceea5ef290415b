//! Per-service environment derivation (spec §4.4: `build_env_map`).
//!
//! Every *other* service in the project — not just this one's declared
//! `needs` — contributes a `<NAME>_URL` variable: a `remote` service
//! contributes its literal URL, a local one contributes
//! `http://localhost:<port>` plus `<NAME>_PORT`. The service's own claimed
//! port (if any) becomes `PORT`, and its own `env` map is merged in last and
//! always wins.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use devport_protocol::ServiceConfig;

/// Upstream service name -> sanitized environment-variable prefix, per
/// spec §4.4's sanitize-key rule: uppercase ASCII, `-` becomes `_`, any
/// other non-alphanumeric becomes `_`, and a leading digit is prefixed
/// with `_` (since `FOO=1BAR` is not a legal shell identifier).
pub fn sanitize_key(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    out
}

/// Builds the merged environment map for one service, given the already
/// resolved local port assignments for every service in the project.
/// `port_map` holds only locally-claimed ports; a peer absent from it is
/// assumed to be a `remote` service (or not yet claimed) and is looked up
/// in `services` instead.
///
/// Every service in `services` other than `name` is a peer (spec §4.4: "for
/// each peer p ≠ s") — `needs` plays no role here, it only orders *when*
/// services start.
///
/// Returns the merged map plus any sanitize-key collisions observed among
/// this service's peers (same sanitized prefix, different source name) —
/// these are not treated as errors; last write wins, and the collision is
/// surfaced so callers can report it as guidance.
pub fn build_env_map(
    name: &str,
    services: &IndexMap<String, ServiceConfig>,
    port_map: &BTreeMap<String, u16>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut env = BTreeMap::new();
    let mut seen_keys: BTreeMap<String, String> = BTreeMap::new();
    let mut collisions = Vec::new();

    let Some(cfg) = services.get(name) else {
        return (env, collisions);
    };

    if let Some(port) = port_map.get(name) {
        env.insert("PORT".to_string(), port.to_string());
    }

    for (peer, peer_cfg) in services {
        if peer == name {
            continue;
        }

        let key = sanitize_key(peer);
        if let Some(prior) = seen_keys.get(&key) {
            if prior != peer {
                collisions.push(format!(
                    "{key} is derived from both {prior} and {peer}; last write wins"
                ));
            }
        }
        seen_keys.insert(key.clone(), peer.clone());

        if let Some(remote) = &peer_cfg.remote {
            env.insert(format!("{key}_URL"), remote.clone());
        } else if let Some(port) = port_map.get(peer) {
            env.insert(format!("{key}_PORT"), port.to_string());
            env.insert(format!("{key}_URL"), format!("http://localhost:{port}"));
        }
    }

    for (key, value) in &cfg.env {
        env.insert(key.clone(), value.clone());
    }

    (env, collisions)
}
