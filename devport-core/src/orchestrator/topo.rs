//! Dependency-order resolution: topological sort and transitive-closure
//! lookup over a service set's `needs` edges (spec §4.4).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use indexmap::IndexMap;

use devport_protocol::{DevportError, ServiceConfig};

/// Kahn's algorithm with ties broken by the **insertion order of the input
/// mapping** (spec §4.4: "ties broken by the insertion order of the input
/// mapping. Independent services are emitted in input order") — an
/// `IndexMap` is required rather than a `BTreeMap` precisely because a
/// `BTreeMap` would silently re-sort services alphabetically and erase
/// that order. Ties are resolved with a min-heap over each service's
/// original index, so among several simultaneously-ready services the
/// one that appeared earliest in `services` always runs first.
pub fn topological_sort(
    services: &IndexMap<String, ServiceConfig>,
) -> Result<Vec<String>, DevportError> {
    for (name, cfg) in services {
        for dep in &cfg.needs {
            if !services.contains_key(dep) {
                return Err(DevportError::MissingDep(format!("{name} needs {dep}")));
            }
        }
    }

    // A service's in-degree is its own unresolved `needs` count — it
    // becomes ready once every dependency it points to has run. Indices
    // refer to `services`' own insertion order.
    let mut in_degree: Vec<usize> = services.values().map(|cfg| cfg.needs.len()).collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); services.len()];
    for (name, cfg) in services {
        let dependent_idx = services.get_index_of(name).unwrap();
        for dep in &cfg.needs {
            dependents[services.get_index_of(dep.as_str()).unwrap()].push(dependent_idx);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    let mut order = Vec::with_capacity(services.len());
    while let Some(Reverse(idx)) = ready.pop() {
        let (name, _) = services.get_index(idx).unwrap();
        order.push(name.clone());
        for &dependent_idx in &dependents[idx] {
            in_degree[dependent_idx] -= 1;
            if in_degree[dependent_idx] == 0 {
                ready.push(Reverse(dependent_idx));
            }
        }
    }

    if order.len() != services.len() {
        let cycle = find_cycle(services);
        log::debug!("cycle detected while sorting {} service(s): {}", services.len(), cycle.join(" -> "));
        return Err(DevportError::Cycle(cycle.join(" -> ")));
    }

    Ok(order)
}

/// DFS cycle search used only for error reporting once Kahn's algorithm
/// has already determined a cycle exists.
fn find_cycle(services: &IndexMap<String, ServiceConfig>) -> Vec<String> {
    use std::collections::HashMap;

    #[derive(PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        name: &'a str,
        services: &'a IndexMap<String, ServiceConfig>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(Mark::InProgress) = marks.get(name) {
            let start = stack.iter().position(|&n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(name.to_string());
            return Some(cycle);
        }
        if marks.get(name) == Some(&Mark::Done) {
            return None;
        }
        marks.insert(name, Mark::InProgress);
        stack.push(name);
        if let Some(cfg) = services.get(name) {
            for dep in &cfg.needs {
                if let Some(cycle) = visit(dep.as_str(), services, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        None
    }

    for name in services.keys() {
        if let Some(cycle) = visit(name.as_str(), services, &mut marks, &mut stack) {
            return cycle;
        }
    }
    Vec::new()
}

/// The transitive closure of `target`'s dependencies, in topological
/// order, `target` included (spec §4.4: `resolve_dependencies`).
pub fn resolve_dependencies(
    target: &str,
    services: &IndexMap<String, ServiceConfig>,
) -> Result<Vec<String>, DevportError> {
    if !services.contains_key(target) {
        return Err(DevportError::NotFound(target.to_string()));
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut needed: HashSet<&str> = HashSet::new();
    let mut queue = vec![target];
    while let Some(name) = queue.pop() {
        if !visited.insert(name) {
            continue;
        }
        needed.insert(name);
        if let Some(cfg) = services.get(name) {
            for dep in &cfg.needs {
                if !services.contains_key(dep.as_str()) {
                    return Err(DevportError::MissingDep(format!("{name} needs {dep}")));
                }
                queue.push(dep.as_str());
            }
        }
    }

    let full_order = topological_sort(services)?;
    Ok(full_order
        .into_iter()
        .filter(|name| needed.contains(name.as_str()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(needs: &[&str]) -> ServiceConfig {
        ServiceConfig {
            needs: needs.iter().map(|s| s.to_string()).collect(),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn sorts_linear_chain() {
        let mut services = IndexMap::new();
        services.insert("db".to_string(), svc(&[]));
        services.insert("api".to_string(), svc(&["db"]));
        services.insert("web".to_string(), svc(&["api"]));
        let order = topological_sort(&services).unwrap();
        assert_eq!(order, vec!["db", "api", "web"]);
    }

    #[test]
    fn ties_break_by_insertion_order_not_name() {
        let mut services = IndexMap::new();
        services.insert("b".to_string(), svc(&[]));
        services.insert("a".to_string(), svc(&[]));
        services.insert("c".to_string(), svc(&[]));
        let order = topological_sort(&services).unwrap();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn independent_services_are_emitted_in_input_order() {
        let mut services = IndexMap::new();
        services.insert("zebra".to_string(), svc(&[]));
        services.insert("apple".to_string(), svc(&[]));
        services.insert("mango".to_string(), svc(&[]));
        let order = topological_sort(&services).unwrap();
        assert_eq!(order, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let mut services = IndexMap::new();
        services.insert("api".to_string(), svc(&["db"]));
        let err = topological_sort(&services).unwrap_err();
        assert!(matches!(err, DevportError::MissingDep(_)));
    }

    #[test]
    fn cycle_is_detected_and_reported() {
        let mut services = IndexMap::new();
        services.insert("a".to_string(), svc(&["b"]));
        services.insert("b".to_string(), svc(&["a"]));
        let err = topological_sort(&services).unwrap_err();
        match err {
            DevportError::Cycle(path) => assert!(path.contains("a") && path.contains("b")),
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn diamond_topology_orders_shared_dependency_before_both_branches() {
        let mut services = IndexMap::new();
        services.insert("app".to_string(), svc(&["api", "worker"]));
        services.insert("api".to_string(), svc(&["db"]));
        services.insert("worker".to_string(), svc(&["db"]));
        services.insert("db".to_string(), svc(&[]));

        let order = topological_sort(&services).unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("db") < pos("api"));
        assert!(pos("db") < pos("worker"));
        assert!(pos("api") < pos("app"));
        assert!(pos("worker") < pos("app"));
    }

    #[test]
    fn resolve_dependencies_returns_transitive_closure_in_order() {
        let mut services = IndexMap::new();
        services.insert("db".to_string(), svc(&[]));
        services.insert("cache".to_string(), svc(&[]));
        services.insert("api".to_string(), svc(&["db", "cache"]));
        services.insert("web".to_string(), svc(&["api"]));
        services.insert("unrelated".to_string(), svc(&[]));

        let resolved = resolve_dependencies("api", &services).unwrap();
        assert_eq!(resolved, vec!["db", "cache", "api"]);
    }

    #[test]
    fn resolve_dependencies_rejects_unknown_target() {
        let services: IndexMap<String, ServiceConfig> = IndexMap::new();
        let err = resolve_dependencies("missing", &services).unwrap_err();
        assert!(matches!(err, DevportError::NotFound(_)));
    }
}
