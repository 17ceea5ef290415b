//! Framework signatures (spec §4.3.3). An ordered rule list; the first
//! matching rule wins.

use std::collections::BTreeMap;
use std::path::Path;

/// A framework descriptor with its conventional defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: &'static str,
    pub default_port: u16,
    pub default_health: &'static str,
    pub default_dev: &'static str,
}

/// Minimal view of a Node.js `package.json`, enough to drive detection and
/// service-name derivation (spec §4.3.4).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub workspaces: Option<WorkspacesField>,
}

/// npm/yarn accept either a bare array or `{ "packages": [...] }`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    List(Vec<String>),
    Object { packages: Vec<String> },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            WorkspacesField::List(list) => list,
            WorkspacesField::Object { packages } => packages,
        }
    }
}

impl PackageManifest {
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

/// Everything the detector can see about one candidate directory.
pub struct DirContext<'a> {
    pub entries: &'a [String],
    pub package_json: Option<&'a PackageManifest>,
}

impl<'a> DirContext<'a> {
    pub fn has_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    pub fn has_entry_matching(&self, predicate: impl Fn(&str) -> bool) -> bool {
        self.entries.iter().any(|e| predicate(e.as_str()))
    }
}

const NEXT: Stack = Stack {
    name: "next",
    default_port: 3000,
    default_health: "/",
    default_dev: "next dev",
};
const WRANGLER: Stack = Stack {
    name: "cloudflare-worker",
    default_port: 8787,
    default_health: "/",
    default_dev: "wrangler dev",
};
const VITE: Stack = Stack {
    name: "vite",
    default_port: 5173,
    default_health: "/",
    default_dev: "vite",
};
const FASTIFY: Stack = Stack {
    name: "fastify",
    default_port: 3000,
    default_health: "/health",
    default_dev: "node index.js",
};
const EXPRESS: Stack = Stack {
    name: "express",
    default_port: 3000,
    default_health: "/health",
    default_dev: "node index.js",
};
const GO: Stack = Stack {
    name: "go",
    default_port: 8081,
    default_health: "/healthz",
    default_dev: "go run .",
};
const RUST: Stack = Stack {
    name: "rust",
    default_port: 8082,
    default_health: "/healthz",
    default_dev: "cargo run",
};
const PYTHON: Stack = Stack {
    name: "python",
    default_port: 8000,
    default_health: "/health",
    default_dev: "python main.py",
};
const DOCKER_COMPOSE: Stack = Stack {
    name: "docker-compose",
    default_port: 8090,
    default_health: "/",
    default_dev: "docker compose up",
};
const CONTAINER: Stack = Stack {
    name: "container",
    default_port: 8091,
    default_health: "/",
    default_dev: "docker build -t service . && docker run service",
};

fn has_config_file(ctx: &DirContext, names: &[&str]) -> bool {
    names.iter().any(|n| ctx.has_entry(n))
}

fn has_config_glob(ctx: &DirContext, stem: &str, extensions: &[&str]) -> bool {
    ctx.has_entry_matching(|entry| {
        extensions
            .iter()
            .any(|ext| entry == &format!("{stem}.{ext}"))
    })
}

/// Applies the ordered detection rule list, returning the first matching
/// [`Stack`].
pub fn detect(ctx: &DirContext) -> Option<Stack> {
    let pkg = ctx.package_json;

    if pkg.map(|p| p.has_dependency("next")).unwrap_or(false)
        || has_config_glob(ctx, "next.config", &["js", "ts", "mjs"])
    {
        return Some(NEXT);
    }
    if has_config_file(ctx, &["wrangler.toml"]) {
        return Some(WRANGLER);
    }
    if pkg.map(|p| p.has_dependency("vite")).unwrap_or(false)
        || has_config_glob(ctx, "vite.config", &["js", "ts", "mjs"])
    {
        return Some(VITE);
    }
    if pkg.map(|p| p.has_dependency("fastify")).unwrap_or(false) {
        return Some(FASTIFY);
    }
    if pkg.map(|p| p.has_dependency("express")).unwrap_or(false) {
        return Some(EXPRESS);
    }
    if has_config_file(ctx, &["go.mod"]) {
        return Some(GO);
    }
    if has_config_file(ctx, &["Cargo.toml"]) {
        return Some(RUST);
    }
    if has_config_file(ctx, &["pyproject.toml", "requirements.txt"]) {
        return Some(PYTHON);
    }
    if has_config_file(ctx, &["docker-compose.yml", "docker-compose.yaml"]) {
        return Some(DOCKER_COMPOSE);
    }
    if has_config_file(ctx, &["Dockerfile"]) {
        return Some(CONTAINER);
    }
    None
}

/// Derives a service name from the nearest manifest's `name` field (with
/// any leading `@scope/` stripped), falling back to the directory
/// basename (spec §4.3.4).
pub fn service_name(package_json: Option<&PackageManifest>, dir: &Path) -> String {
    if let Some(name) = package_json.and_then(|p| p.name.as_deref()) {
        if let Some(stripped) = name.strip_prefix('@') {
            if let Some((_, rest)) = stripped.split_once('/') {
                return rest.to_string();
            }
        }
        return name.to_string();
    }
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "service".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(entries: &'a [String], pkg: Option<&'a PackageManifest>) -> DirContext<'a> {
        DirContext { entries, package_json: pkg }
    }

    #[test]
    fn detects_next_from_dependency() {
        let mut pkg = PackageManifest::default();
        pkg.dependencies.insert("next".to_string(), "14.0.0".to_string());
        let entries = vec!["package.json".to_string()];
        let stack = detect(&ctx(&entries, Some(&pkg))).unwrap();
        assert_eq!(stack.name, "next");
    }

    #[test]
    fn detects_next_from_config_file() {
        let entries = vec!["next.config.js".to_string()];
        let stack = detect(&ctx(&entries, None)).unwrap();
        assert_eq!(stack.name, "next");
    }

    #[test]
    fn first_rule_wins_next_over_vite() {
        let mut pkg = PackageManifest::default();
        pkg.dependencies.insert("next".to_string(), "14.0.0".to_string());
        pkg.dependencies.insert("vite".to_string(), "5.0.0".to_string());
        let entries = vec!["package.json".to_string()];
        let stack = detect(&ctx(&entries, Some(&pkg))).unwrap();
        assert_eq!(stack.name, "next");
    }

    #[test]
    fn detects_go_module() {
        let entries = vec!["go.mod".to_string()];
        assert_eq!(detect(&ctx(&entries, None)).unwrap().name, "go");
    }

    #[test]
    fn detects_rust_crate() {
        let entries = vec!["Cargo.toml".to_string()];
        assert_eq!(detect(&ctx(&entries, None)).unwrap().name, "rust");
    }

    #[test]
    fn falls_back_to_container_markers() {
        let entries = vec!["Dockerfile".to_string()];
        assert_eq!(detect(&ctx(&entries, None)).unwrap().name, "container");
    }

    #[test]
    fn no_signature_yields_none() {
        let entries = vec!["README.md".to_string()];
        assert!(detect(&ctx(&entries, None)).is_none());
    }

    #[test]
    fn service_name_strips_scope() {
        let mut pkg = PackageManifest::default();
        pkg.name = Some("@myorg/api".to_string());
        let name = service_name(Some(&pkg), Path::new("/root/api"));
        assert_eq!(name, "api");
    }

    #[test]
    fn service_name_falls_back_to_dirname() {
        let name = service_name(None, Path::new("/root/worker"));
        assert_eq!(name, "worker");
    }
}
