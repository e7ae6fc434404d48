//! External tool manager for coordinating installations.
//!
//! The `ExternalToolManager` is the main entry point. It owns one
//! [`ToolInstaller`] per catalog entry, wires runtime dependencies between
//! them and runs batches of installs on a bounded worker pool.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::catalog::get_all_tool_definitions;
use super::downloader::{HttpTransport, Transport};
use super::env::command_for;
use super::error::InstallError;
use super::installer::{InstallContext, ToolInstaller};
use super::paths;
use super::types::{InstalledArtifact, PlatformTag, ToolDefinition, ToolId, ToolStatus};
use crate::config::ProvisionConfig;

// ============================================================================
// Tool Info
// ============================================================================

/// Combined information about a tool (definition + status).
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// The tool's static definition.
    pub definition: &'static ToolDefinition,
    /// Current installation status.
    pub status: ToolStatus,
}

// ============================================================================
// Install Report
// ============================================================================

/// Per-tool outcome of a batch install.
#[derive(Debug, Default)]
pub struct InstallReport {
    results: BTreeMap<ToolId, Result<InstalledArtifact, InstallError>>,
}

impl InstallReport {
    /// True when every tool in the batch installed.
    pub fn success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn get(&self, id: ToolId) -> Option<&Result<InstalledArtifact, InstallError>> {
        self.results.get(&id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (ToolId, &InstallError)> {
        self.results
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|e| (*id, e)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ToolId, &Result<InstalledArtifact, InstallError>)> {
        self.results.iter().map(|(id, result)| (*id, result))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn insert(&mut self, id: ToolId, result: Result<InstalledArtifact, InstallError>) {
        self.results.insert(id, result);
    }
}

// ============================================================================
// External Tool Manager
// ============================================================================

/// Manages tool installation and lookup.
///
/// Thread-safe; share it behind an `Arc` across tasks.
pub struct ExternalToolManager {
    config: ProvisionConfig,
    context: Arc<InstallContext>,
    installers: BTreeMap<ToolId, Arc<ToolInstaller>>,
}

impl ExternalToolManager {
    /// Creates a manager for the built-in catalog, downloading over HTTPS.
    pub fn new(config: ProvisionConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::with_catalog(config, get_all_tool_definitions(), transport)
    }

    /// Creates a manager for an explicit set of definitions and transport.
    ///
    /// Fails when a definition names a runtime that is not in the set, or
    /// when runtimes form a cycle.
    pub fn with_catalog(
        config: ProvisionConfig,
        definitions: Vec<&'static ToolDefinition>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let data_dir = config.resolved_data_dir()?;
        paths::ensure_dir_exists(&data_dir)?;
        let context = Arc::new(InstallContext::new(
            data_dir.clone(),
            config.platform,
            transport,
        ));

        let mut by_id = HashMap::new();
        for definition in &definitions {
            if by_id.insert(definition.id, *definition).is_some() {
                anyhow::bail!("Tool {} is defined twice", definition.id);
            }
        }

        let mut installers = BTreeMap::new();
        for definition in &definitions {
            build_installer(
                definition.id,
                &by_id,
                &context,
                &mut installers,
                &mut Vec::new(),
            )?;
        }

        info!(
            "ExternalToolManager initialized. Data dir: {}, Platform: {}, Tools: {}",
            data_dir.display(),
            config
                .platform
                .map(|p| p.key())
                .unwrap_or_else(|| "host".to_string()),
            installers.len()
        );

        Ok(Self {
            config,
            context,
            installers,
        })
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Absolute data directory.
    pub fn data_dir(&self) -> &Path {
        self.context.data_dir()
    }

    /// Platform installs resolve for.
    pub fn platform(&self) -> Result<PlatformTag, InstallError> {
        self.context.platform()
    }

    fn installer(&self, id: ToolId) -> Result<&Arc<ToolInstaller>, InstallError> {
        self.installers
            .get(&id)
            .ok_or(InstallError::NotManaged { tool: id })
    }

    // ========================================================================
    // Tool Queries
    // ========================================================================

    /// Gets the status of a specific tool. Reads the filesystem only.
    pub fn status(&self, id: ToolId) -> ToolStatus {
        let Ok(installer) = self.installer(id) else {
            return ToolStatus::NotInstalled;
        };
        match installer.artifact() {
            Ok(artifact) if artifact.is_installed() => ToolStatus::Installed {
                path: artifact.path().to_path_buf(),
            },
            Ok(_) => ToolStatus::NotInstalled,
            Err(_) => ToolStatus::UnsupportedPlatform,
        }
    }

    /// Lists all managed tools with their current status.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.installers
            .values()
            .map(|installer| ToolInfo {
                definition: installer.definition(),
                status: self.status(installer.id()),
            })
            .collect()
    }

    /// Gets the path to a tool's primary executable, if installed.
    pub fn executable_path(&self, id: ToolId) -> Option<PathBuf> {
        match self.status(id) {
            ToolStatus::Installed { path } => Some(path),
            _ => None,
        }
    }

    /// Builds a command that launches an installed tool.
    ///
    /// Tools with a runtime are launched through it. Nothing is installed
    /// here; call [`install`](Self::install) first.
    pub fn command(&self, id: ToolId) -> Result<Command, InstallError> {
        let installer = self.installer(id)?;
        let artifact = installed_artifact(installer)?;
        let runtime = installer
            .dependency()
            .map(|dependency| installed_artifact(dependency))
            .transpose()?;
        Ok(command_for(&artifact, runtime.as_ref()))
    }

    // ========================================================================
    // Installation
    // ========================================================================

    /// Installs one tool (and its runtime) unless already installed.
    pub async fn install(&self, id: ToolId) -> Result<InstalledArtifact, InstallError> {
        let installer = self.installer(id)?;
        let deadline = self.deadline();
        run_with_deadline(installer, deadline).await
    }

    /// Installs every managed tool. Returns true iff all succeeded.
    pub async fn install_all(&self) -> bool {
        let report = self.install_all_report().await;
        for (id, err) in report.failures() {
            error!("{} failed: {}", id, err);
        }
        report.success()
    }

    /// Installs every managed tool and reports per-tool outcomes.
    pub async fn install_all_report(&self) -> InstallReport {
        let ids: Vec<ToolId> = self.installers.keys().copied().collect();
        self.install_tools(&ids).await
    }

    /// Installs the given tools concurrently.
    ///
    /// A tool and its runtime form one unit, so the runtime is installed
    /// before the tool and never raced. At most `max_concurrency` units run
    /// at once. One failure does not stop the others.
    pub async fn install_tools(&self, ids: &[ToolId]) -> InstallReport {
        let mut report = InstallReport::default();
        let requested: BTreeSet<ToolId> = ids.iter().copied().collect();

        let mut known = Vec::new();
        for id in requested {
            match self.installer(id) {
                Ok(installer) => known.push(installer.clone()),
                Err(e) => report.insert(id, Err(e)),
            }
        }

        let units = plan_units(&known);
        let deadline = self.deadline();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut expected: BTreeSet<ToolId> = BTreeSet::new();
        let mut tasks = JoinSet::new();

        info!(
            "Installing {} tool(s) in {} unit(s), {} at a time",
            known.len(),
            units.len(),
            self.config.concurrency()
        );

        for unit in units {
            expected.extend(unit.iter().map(|installer| installer.id()));
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                run_unit(unit, deadline).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(results) => {
                    for (id, result) in results {
                        expected.remove(&id);
                        report.insert(id, result);
                    }
                }
                Err(e) => warn!("Install task ended abnormally: {}", e),
            }
        }

        for id in expected {
            report.insert(
                id,
                Err(InstallError::Aborted {
                    tool: id,
                    reason: "install task ended without a result".to_string(),
                }),
            );
        }

        report
    }

    fn deadline(&self) -> Option<Instant> {
        self.config
            .install_timeout()
            .map(|timeout| Instant::now() + timeout)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn build_installer(
    id: ToolId,
    by_id: &HashMap<ToolId, &'static ToolDefinition>,
    context: &Arc<InstallContext>,
    installers: &mut BTreeMap<ToolId, Arc<ToolInstaller>>,
    visiting: &mut Vec<ToolId>,
) -> Result<Arc<ToolInstaller>> {
    if let Some(existing) = installers.get(&id) {
        return Ok(existing.clone());
    }
    if visiting.contains(&id) {
        anyhow::bail!("Runtime dependency cycle through {}", id);
    }
    let definition = by_id
        .get(&id)
        .copied()
        .with_context(|| format!("Tool {} is required but not defined", id))?;

    visiting.push(id);
    let mut installer = ToolInstaller::new(definition, context.clone());
    if let Some(runtime) = definition.runtime {
        let dependency = build_installer(runtime, by_id, context, installers, visiting)
            .with_context(|| format!("Resolving runtime of {}", id))?;
        installer = installer.with_dependency(dependency);
    }
    visiting.pop();

    let installer = Arc::new(installer);
    installers.insert(id, installer.clone());
    Ok(installer)
}

/// Groups installers into dependency chains, runtimes first.
///
/// A tool that is the runtime of another requested tool runs inside that
/// tool's chain rather than as its own unit.
fn plan_units(installers: &[Arc<ToolInstaller>]) -> Vec<Vec<Arc<ToolInstaller>>> {
    let requested: BTreeSet<ToolId> = installers.iter().map(|i| i.id()).collect();
    let mut covered = BTreeSet::new();
    for installer in installers {
        let mut dependency = installer.dependency();
        while let Some(dep) = dependency {
            if requested.contains(&dep.id()) {
                covered.insert(dep.id());
            }
            dependency = dep.dependency();
        }
    }

    installers
        .iter()
        .filter(|installer| !covered.contains(&installer.id()))
        .map(|installer| {
            let mut chain = vec![installer.clone()];
            let mut dependency = installer.dependency();
            while let Some(dep) = dependency {
                chain.push(dep.clone());
                dependency = dep.dependency();
            }
            chain.reverse();
            chain
        })
        .collect()
}

async fn run_unit(
    unit: Vec<Arc<ToolInstaller>>,
    deadline: Option<Instant>,
) -> Vec<(ToolId, Result<InstalledArtifact, InstallError>)> {
    let mut results = Vec::with_capacity(unit.len());
    let mut failed: Option<(ToolId, String)> = None;

    for installer in unit {
        let result = match &failed {
            Some((dependency, reason)) => Err(InstallError::Dependency {
                tool: installer.id(),
                dependency: *dependency,
                reason: reason.clone(),
            }),
            None => run_with_deadline(&installer, deadline).await,
        };
        if let Err(e) = &result {
            if failed.is_none() {
                failed = Some((installer.id(), e.to_string()));
            }
        }
        debug!("{} finished: ok={}", installer.id(), result.is_ok());
        results.push((installer.id(), result));
    }

    results
}

async fn run_with_deadline(
    installer: &ToolInstaller,
    deadline: Option<Instant>,
) -> Result<InstalledArtifact, InstallError> {
    match deadline {
        None => installer.ensure_installed().await,
        Some(deadline) => {
            let started = Instant::now();
            timeout_at(deadline, installer.ensure_installed())
                .await
                .unwrap_or_else(|_| {
                    Err(InstallError::TimedOut {
                        tool: installer.id(),
                        after: started.elapsed(),
                    })
                })
        }
    }
}

fn installed_artifact(installer: &ToolInstaller) -> Result<InstalledArtifact, InstallError> {
    let artifact = installer.artifact()?;
    if artifact.is_installed() {
        Ok(artifact)
    } else {
        Err(InstallError::NotExecutable {
            tool: installer.id(),
            path: artifact.path().to_path_buf(),
        })
    }
}
