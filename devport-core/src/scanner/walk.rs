//! Bounded project walk and service discovery (spec §4.3).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use devport_protocol::ProjectConfig;
use walkdir::WalkDir;

use super::frameworks::{detect, service_name, DirContext, PackageManifest, Stack};

const MAX_DEPTH: usize = 5;
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    "coverage",
    "target",
    "vendor",
];

/// Whether a project looks like a single service or a multi-service
/// monorepo (spec §4.3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Single,
    Monorepo,
}

/// One discovered service root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub relative_path: PathBuf,
    pub stack: String,
    pub preferred_port: u16,
    pub dev: String,
    pub health_path: String,
}

/// The full result of scanning a project root (spec §4.3.5).
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub project: String,
    pub project_type: ProjectType,
    pub service_count: usize,
    pub services: BTreeMap<String, DiscoveredService>,
    pub suggestions: Vec<String>,
    pub existing_config: Option<ProjectConfig>,
    pub guidance: Vec<String>,
}

fn should_skip_dir_name(name: &str, is_root: bool) -> bool {
    if SKIP_DIRS.contains(&name) {
        return true;
    }
    !is_root && name.starts_with('.')
}

/// Lists a directory's immediate entry names, sorted, for deterministic
/// traversal and detection (spec §4.3.1: "deterministic lexicographic
/// ordering").
fn sorted_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn read_package_manifest(dir: &Path) -> Option<PackageManifest> {
    let raw = fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Matches a single workspace glob segment: `*` stands for exactly one
/// path component, anything else must match literally. There is no
/// recursive `**` form — `devport` workspace patterns are always a
/// fixed-depth prefix (e.g. `packages/*`, `apps/*/web`).
fn segment_matches(pattern: &str, actual: &str) -> bool {
    pattern == "*" || pattern == actual
}

/// Expands one `workspaces` glob pattern (e.g. `"packages/*"`) into the
/// concrete directories it names, relative to `root` (spec §4.3.2).
fn expand_workspace_pattern(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut frontier = vec![root.to_path_buf()];
    for segment in segments {
        let mut next = Vec::new();
        for dir in frontier {
            let names = sorted_entries(&dir);
            for name in names {
                if !dir.join(&name).is_dir() {
                    continue;
                }
                if segment_matches(segment, &name) {
                    next.push(dir.join(&name));
                }
            }
        }
        frontier = next;
    }
    frontier
}

struct Walker<'a> {
    root: &'a Path,
    services: BTreeMap<String, DiscoveredService>,
}

impl<'a> Walker<'a> {
    fn classify(&mut self, dir: &Path) -> bool {
        let entries = sorted_entries(dir);
        let package_json = read_package_manifest(dir);
        let ctx = DirContext {
            entries: &entries,
            package_json: package_json.as_ref(),
        };
        let Some(stack) = detect(&ctx) else {
            return false;
        };
        self.record_service(dir, package_json.as_ref(), &stack);
        true
    }

    fn record_service(&mut self, dir: &Path, package_json: Option<&PackageManifest>, stack: &Stack) {
        let relative_path = dir
            .strip_prefix(self.root)
            .unwrap_or(dir)
            .to_path_buf();
        let mut name = service_name(package_json, dir);
        if let Some(existing) = self.services.get(&name) {
            if existing.relative_path == relative_path {
                // Same physical directory seen twice (e.g. a workspace
                // glob re-matching a root the bounded DFS already
                // classified) — not a collision, drop the duplicate.
                return;
            }
            // Collisions across nested roots are disambiguated by
            // relative path rather than silently overwritten.
            name = format!("{name}@{}", relative_path.display());
        }
        self.services.insert(
            name,
            DiscoveredService {
                relative_path,
                stack: stack.name.to_string(),
                preferred_port: stack.default_port,
                dev: stack.default_dev.to_string(),
                health_path: stack.default_health.to_string(),
            },
        );
    }

    /// Bounded DFS from `root`. Once a directory is classified as a
    /// service root we stop descending into it — this is what keeps a
    /// service's own dependency tree (e.g. a vendored copy of itself)
    /// from producing nested duplicate detections.
    fn walk(&mut self) {
        let is_service_root = self.classify(self.root);
        if is_service_root {
            return;
        }

        let walker = WalkDir::new(self.root)
            .min_depth(1)
            .max_depth(MAX_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !should_skip_dir_name(&name, false)
            });

        let mut descend_blocked: Vec<PathBuf> = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if descend_blocked.iter().any(|blocked| path.starts_with(blocked)) {
                continue;
            }
            if self.classify(path) {
                descend_blocked.push(path.to_path_buf());
            }
        }
    }
}

/// Walks `root`, applying the workspace-expansion and framework-detection
/// rules, and assembles the full [`ScanResult`] (spec §4.3).
pub fn scan(root: &Path, existing_config: Option<ProjectConfig>) -> ScanResult {
    log::debug!("scanning {}", root.display());
    let project_name = existing_config
        .as_ref()
        .map(|c| c.project.clone())
        .or_else(|| read_package_manifest(root).and_then(|p| p.name))
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "project".to_string());

    let mut walker = Walker {
        root,
        services: BTreeMap::new(),
    };
    walker.walk();

    let declared_workspaces = read_package_manifest(root)
        .and_then(|p| p.workspaces)
        .map(|w| w.patterns().to_vec())
        .unwrap_or_default();

    for pattern in &declared_workspaces {
        for dir in expand_workspace_pattern(root, pattern) {
            walker.classify(&dir);
        }
    }
    let services = walker.services;

    let is_monorepo = !declared_workspaces.is_empty() || services.len() > 1;
    let project_type = if is_monorepo {
        ProjectType::Monorepo
    } else {
        ProjectType::Single
    };

    let mut suggestions = Vec::new();
    if services.is_empty() {
        suggestions.push(
            "no recognizable service signatures were found under this root".to_string(),
        );
    }

    let guidance = build_guidance(&services, existing_config.as_ref());
    log::info!("scan of {} found {} service(s)", root.display(), services.len());

    ScanResult {
        project: project_name,
        project_type,
        service_count: services.len(),
        services,
        suggestions,
        existing_config,
        guidance,
    }
}

fn build_guidance(
    services: &BTreeMap<String, DiscoveredService>,
    existing: Option<&ProjectConfig>,
) -> Vec<String> {
    let mut guidance = Vec::new();
    if services.is_empty() {
        guidance.push(
            "no services found; author devport.json by hand to describe this project"
                .to_string(),
        );
        return guidance;
    }
    match existing {
        None => guidance.push(format!(
            "discovered {} service(s) with no existing config on disk",
            services.len()
        )),
        Some(cfg) => {
            let discovered_names: std::collections::BTreeSet<&String> = services.keys().collect();
            let configured_names: std::collections::BTreeSet<&String> = cfg.services.keys().collect();
            if discovered_names == configured_names {
                guidance.push("existing config is up to date with the discovered services".to_string());
            } else {
                guidance.push("discovered services differ from the existing config".to_string());
            }
        }
    }
    guidance
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn single_service_detected_at_root() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("Cargo.toml"), "[package]\nname = \"svc\"\n");
        let result = scan(dir.path(), None);
        assert_eq!(result.project_type, ProjectType::Single);
        assert_eq!(result.service_count, 1);
    }

    #[test]
    fn monorepo_workspace_expansion_finds_nested_services() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("package.json"),
            r#"{"name": "root", "workspaces": ["packages/*"]}"#,
        );
        write(&dir.path().join("packages/api/package.json"), r#"{"name": "api"}"#);
        write(&dir.path().join("packages/api/go.mod"), "module api\n");
        write(&dir.path().join("packages/web/package.json"), r#"{"name": "web", "dependencies": {"next": "14.0.0"}}"#);

        let result = scan(dir.path(), None);
        assert_eq!(result.project_type, ProjectType::Monorepo);
        assert!(result.services.contains_key("api"));
        assert!(result.services.contains_key("web"));
        assert_eq!(result.services["api"].stack, "go");
        assert_eq!(result.services["web"].stack, "next");
    }

    #[test]
    fn workspace_expansion_does_not_duplicate_roots_the_bounded_walk_already_found() {
        // `packages/*` sits well within MAX_DEPTH, so the ordinary bounded
        // DFS already classifies `packages/api` before workspace expansion
        // re-matches the same directory. That re-match must be dropped,
        // not treated as a name collision.
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("package.json"),
            r#"{"name": "root", "workspaces": ["packages/*"]}"#,
        );
        write(&dir.path().join("packages/api/package.json"), r#"{"name": "api"}"#);
        write(&dir.path().join("packages/api/go.mod"), "module api\n");

        let result = scan(dir.path(), None);
        assert_eq!(result.service_count, 1);
        assert!(!result.services.keys().any(|k| k.contains('@')));
    }

    #[test]
    fn skips_node_modules_and_dot_directories() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("node_modules/fake/Cargo.toml"), "[package]\n");
        write(&dir.path().join(".git/Cargo.toml"), "[package]\n");
        write(&dir.path().join("services/app/Cargo.toml"), "[package]\n");

        let result = scan(dir.path(), None);
        assert_eq!(result.service_count, 1);
        assert!(result.services.contains_key("app"));
    }

    #[test]
    fn does_not_descend_into_detected_service_roots() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("services/app/Cargo.toml"), "[package]\n");
        write(&dir.path().join("services/app/vendor/copy/Cargo.toml"), "[package]\n");

        let result = scan(dir.path(), None);
        assert_eq!(result.service_count, 1);
    }

    #[test]
    fn name_collisions_are_disambiguated_by_relative_path() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a/app/Cargo.toml"), "[package]\n");
        write(&dir.path().join("b/app/Cargo.toml"), "[package]\n");

        let result = scan(dir.path(), None);
        assert_eq!(result.service_count, 2);
        assert!(result.services.contains_key("app"));
        assert!(result.services.keys().any(|k| k.starts_with("app@")));
    }

    #[test]
    fn bounded_depth_excludes_services_past_max_depth() {
        let dir = tempdir().unwrap();
        // depth 2: found.
        write(&dir.path().join("a/shallow/Cargo.toml"), "[package]\n");
        // depth 7: beyond MAX_DEPTH=5, never classified.
        write(
            &dir.path().join("a/b/c/d/e/f/deep/Cargo.toml"),
            "[package]\n",
        );

        let result = scan(dir.path(), None);
        assert!(result.services.contains_key("shallow"));
        assert!(!result.services.contains_key("deep"));
        assert_eq!(result.service_count, 1);
    }

    #[test]
    fn empty_project_suggests_no_signatures_found() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("README.md"), "hello\n");
        let result = scan(dir.path(), None);
        assert_eq!(result.service_count, 0);
        assert!(!result.suggestions.is_empty());
        assert!(result.guidance[0].contains("author devport.json by hand"));
    }
}
