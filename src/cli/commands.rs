use crate::manifest::Manifest;
use crate::postman::{sync_named, PostmanClient};
use crate::registry::RouterRegistry;
use crate::runtime_config::RuntimeConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// Command-line interface for apirouter
///
/// Inspects the routers declared in a manifest and synchronizes them into
/// their Postman collections.
#[derive(Parser, Debug)]
#[command(name = "apirouter")]
#[command(about = "Inspect declared API routers and sync them to Postman", long_about = None)]
pub struct Cli {
    /// Router manifest (YAML or JSON)
    #[arg(
        short,
        long,
        env = "APIROUTER_MANIFEST",
        default_value = "config/routers.yaml"
    )]
    pub manifest: PathBuf,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List router names
    Routers,
    /// List Postman collection uids and the routers synced into each
    Collections,
    /// Dump the endpoints of one router, or of all routers
    Routes {
        /// Router name (all routers when omitted)
        name: Option<String>,
    },
    /// Sync a router (or `*` for all routers) into its Postman collection
    Sync {
        /// Router name, or `*`
        target: String,
    },
}

/// Run `command` against `registry`, writing human-readable output to `out`.
///
/// Postman settings are read from the environment.
pub fn run_command(
    registry: &RouterRegistry,
    command: &Commands,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    run_command_with(registry, command, &RuntimeConfig::from_env(), out)
}

pub fn run_command_with(
    registry: &RouterRegistry,
    command: &Commands,
    config: &RuntimeConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Routers => {
            for name in registry.names() {
                writeln!(out, "{name}")?;
            }
        }
        Commands::Collections => {
            for (uid, routers) in registry.collections() {
                writeln!(out, "{uid}\t{}", routers.join(","))?;
            }
        }
        Commands::Routes { name } => {
            let routers = match name {
                Some(name) => vec![registry
                    .get(name)
                    .with_context(|| format!("no router named '{name}'"))?],
                None => registry.routers(),
            };
            for router in routers {
                let mount = router.options().mountpath.trim_end_matches('/').to_string();
                writeln!(out, "[{}] {}", router.name(), router.base_url())?;
                for endpoint in router.endpoints() {
                    let hidden = if endpoint.hidden { " (hidden)" } else { "" };
                    writeln!(
                        out,
                        "  {:<7} {}{}  {}{hidden}",
                        endpoint.method.as_str(),
                        mount,
                        endpoint.route,
                        endpoint.name
                    )?;
                }
            }
        }
        Commands::Sync { target } => {
            let client = PostmanClient::from_config(config)?;
            let reports = sync_named(registry, &client, target)?;
            let mut failed = 0;
            for report in &reports {
                let routers = report.routers.join(",");
                match &report.result {
                    Ok(outcome) => {
                        writeln!(out, "{}\t{routers}\t{outcome}", report.collection_uid)?;
                    }
                    Err(e) => {
                        failed += 1;
                        writeln!(out, "{}\t{routers}\tfailed: {e}", report.collection_uid)?;
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} collection(s) failed to sync", reports.len());
            }
        }
    }
    Ok(())
}

/// Load the manifest and run the parsed command on stdout.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    let registry = Manifest::from_path(&cli.manifest)?
        .build_registry(&config)
        .with_context(|| format!("loading {}", cli.manifest.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command_with(&registry, &cli.command, &config, &mut out)
}
