//! Command-line front end for `devport`: a thin wrapper over
//! `devport-registry` and `devport-core`. Process spawning, health
//! probing, and log multiplexing are out of scope — `up` resolves
//! dependency order and claims ports, then reports what it would hand
//! off to a process supervisor.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devport_core::{build_config, build_env_map, normalize_service_config, resolve_dependencies, scan, topological_sort};
use devport_protocol::{ClaimOptions, FindOptions, ProjectConfig, ReleaseOptions, ServiceConfig, ServiceStatus};
use devport_registry::ServiceRegistry;
use env_logger::Env;
use indexmap::IndexMap;

const DB_FILE: &str = ".devport.db";
const CONFIG_FILE_JSON: &str = "devport.json";
const CONFIG_FILE_TOML: &str = "devport.toml";

#[derive(Parser)]
#[command(name = "devport")]
#[command(about = "Developer-workstation port and dependency orchestrator")]
struct Cli {
    /// Project root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project root for services and write/refresh devport.json.
    Scan {
        /// Print the discovered config without writing it to disk.
        #[arg(long)]
        dry_run: bool,
    },
    /// Bring services up in dependency order, claiming a port for each.
    Up {
        /// Only bring up this service and its dependencies.
        #[arg(long)]
        service: Option<String>,
    },
    /// Claim a port for one identity.
    Claim {
        id: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        expires: Option<String>,
    },
    /// Release services matching a pattern.
    Release {
        pattern: String,
        #[arg(long)]
        expired: bool,
    },
    /// Find services matching a pattern.
    Find {
        #[arg(default_value = "*")]
        pattern: String,
        #[arg(long)]
        status: Option<String>,
    },
    /// Print one service's enriched record.
    Status { id: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let db_path = cli.root.join(DB_FILE);
    let registry = ServiceRegistry::open(&db_path).context("failed to open registry")?;

    match cli.command {
        Commands::Scan { dry_run } => cmd_scan(&cli.root, dry_run),
        Commands::Up { service } => cmd_up(&cli.root, &registry, service.as_deref()),
        Commands::Claim { id, port, expires } => cmd_claim(&registry, &id, port, expires),
        Commands::Release { pattern, expired } => cmd_release(&registry, &pattern, expired),
        Commands::Find { pattern, status } => cmd_find(&registry, &pattern, status),
        Commands::Status { id } => cmd_status(&registry, &id),
    }
}

/// Hand-authored configs may be written as JSON or TOML; JSON is checked
/// first since it is what `scan` itself writes.
fn load_existing_config(root: &PathBuf) -> Option<ProjectConfig> {
    if let Ok(raw) = fs::read_to_string(root.join(CONFIG_FILE_JSON)) {
        if let Ok(config) = serde_json::from_str(&raw) {
            return Some(config);
        }
    }
    let raw = fs::read_to_string(root.join(CONFIG_FILE_TOML)).ok()?;
    toml::from_str(&raw).ok()
}

fn cmd_scan(root: &PathBuf, dry_run: bool) -> Result<()> {
    let existing = load_existing_config(root);
    let result = scan(root, existing);
    for line in &result.guidance {
        println!("{line}");
    }
    for suggestion in &result.suggestions {
        println!("suggestion: {suggestion}");
    }

    let (config, collisions) = build_config(&result);
    for collision in &collisions {
        println!("warning: {collision}");
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    if !dry_run {
        let path = root.join(CONFIG_FILE_JSON);
        fs::write(&path, serde_json::to_string_pretty(&config)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn normalized_services(config: &ProjectConfig) -> IndexMap<String, ServiceConfig> {
    config
        .services
        .iter()
        .map(|(name, raw)| (name.clone(), normalize_service_config(raw)))
        .collect()
}

fn cmd_up(root: &PathBuf, registry: &ServiceRegistry, service: Option<&str>) -> Result<()> {
    let config = load_existing_config(root).context("no devport.json found; run `devport scan` first")?;
    let services = normalized_services(&config);

    let order = match service {
        Some(target) => resolve_dependencies(target, &services)?,
        None => topological_sort(&services)?,
    };

    let mut port_map: BTreeMap<String, u16> = BTreeMap::new();
    for name in &order {
        let cfg = &services[name];
        if cfg.no_port || cfg.remote.is_some() {
            continue;
        }
        let identity = format!("{}:{name}:main", config.project);
        let opts = ClaimOptions {
            port: cfg.port.and_then(|p| u16::try_from(p).ok()),
            ..ClaimOptions::default()
        };
        let claim = registry.claim(&identity, opts)?;
        port_map.insert(name.clone(), claim.port);
        println!("{name}: claimed port {} ({})", claim.port, claim.status);
    }

    for name in &order {
        let (env, collisions) = build_env_map(name, &services, &port_map);
        for collision in collisions {
            println!("warning: {collision}");
        }
        log::debug!("{name} env: {env:?}");
    }

    println!(
        "dependency order resolved for {} service(s); process spawning is handled by a supervisor outside devport",
        order.len()
    );
    Ok(())
}

fn cmd_claim(registry: &ServiceRegistry, id: &str, port: Option<u16>, expires: Option<String>) -> Result<()> {
    let opts = ClaimOptions {
        port,
        expires,
        ..ClaimOptions::default()
    };
    let result = registry.claim(id, opts)?;
    println!("{} -> port {} ({}){}", id, result.port, result.status, if result.existing { " [existing]" } else { "" });
    Ok(())
}

fn cmd_release(registry: &ServiceRegistry, pattern: &str, expired: bool) -> Result<()> {
    let result = registry.release(pattern, ReleaseOptions { expired })?;
    println!("{}", result.message);
    Ok(())
}

fn cmd_find(registry: &ServiceRegistry, pattern: &str, status: Option<String>) -> Result<()> {
    let status = status
        .map(|s| s.parse::<ServiceStatus>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let result = registry.find(pattern, FindOptions { status, ..FindOptions::default() })?;
    for svc in &result.services {
        println!(
            "{:<30} port={:<6} status={:<10} cmd={}",
            svc.id,
            svc.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            svc.status,
            svc.cmd.as_deref().unwrap_or("-"),
        );
    }
    println!("{} match(es)", result.count);
    Ok(())
}

fn cmd_status(registry: &ServiceRegistry, id: &str) -> Result<()> {
    let svc = registry.get(id)?;
    println!("{}", serde_json::to_string_pretty(&svc)?);
    Ok(())
}
