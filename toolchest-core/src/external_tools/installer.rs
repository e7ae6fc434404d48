//! Per-tool installation.
//!
//! A [`ToolInstaller`] turns one registry entry into an installed artifact:
//! fetch, verify, place the files, run the post-install hook, then set the
//! executable bit. The bit is written last, so a tool whose executables are
//! all marked executable is fully installed.

use futures::future::BoxFuture;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::downloader::{Fetcher, Transport};
use super::error::{ExtractError, InstallError};
use super::extractor::{self, Selector};
use super::types::{ArchiveLayout, InstalledArtifact, PlatformTag, ToolDefinition, ToolId, ToolSpec};

/// State shared by every installer of one manager.
pub struct InstallContext {
    data_dir: PathBuf,
    platform: Option<PlatformTag>,
    fetcher: Fetcher,
}

impl InstallContext {
    /// `platform` overrides host detection when set.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        platform: Option<PlatformTag>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let data_dir = data_dir.into();
        Self {
            fetcher: Fetcher::new(data_dir.clone(), transport),
            data_dir,
            platform,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Platform installs are resolved for.
    pub fn platform(&self) -> Result<PlatformTag, InstallError> {
        match self.platform {
            Some(platform) => Ok(platform),
            None => PlatformTag::current(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }
}

/// Installs a single tool, at most once at a time.
pub struct ToolInstaller {
    definition: &'static ToolDefinition,
    context: Arc<InstallContext>,
    dependency: Option<Arc<ToolInstaller>>,
    // Held until the blocking placement finishes, even if the caller is
    // cancelled first.
    flight: Arc<Mutex<()>>,
}

impl ToolInstaller {
    pub fn new(definition: &'static ToolDefinition, context: Arc<InstallContext>) -> Self {
        Self {
            definition,
            context,
            dependency: None,
            flight: Arc::new(Mutex::new(())),
        }
    }

    /// Installer that must succeed before this one runs.
    pub fn with_dependency(mut self, dependency: Arc<ToolInstaller>) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn id(&self) -> ToolId {
        self.definition.id
    }

    pub fn definition(&self) -> &'static ToolDefinition {
        self.definition
    }

    pub fn dependency(&self) -> Option<&Arc<ToolInstaller>> {
        self.dependency.as_ref()
    }

    fn resolve(&self) -> Result<(PlatformTag, &'static ToolSpec), InstallError> {
        let platform = self.context.platform()?;
        let definition: &'static ToolDefinition = self.definition;
        let spec = definition
            .spec(platform)
            .ok_or_else(|| InstallError::UnsupportedPlatform {
                tool: definition.id,
                platform: platform.key(),
            })?;
        Ok((platform, spec))
    }

    fn artifact_for(&self, spec: &ToolSpec) -> InstalledArtifact {
        let data_dir = self.context.data_dir();
        InstalledArtifact::new(
            self.id(),
            data_dir.join(spec.binary),
            spec.companions
                .iter()
                .map(|companion| data_dir.join(companion))
                .collect(),
        )
    }

    /// Where the tool's executables live on this platform. Touches nothing.
    pub fn artifact(&self) -> Result<InstalledArtifact, InstallError> {
        let (_, spec) = self.resolve()?;
        Ok(self.artifact_for(spec))
    }

    pub fn is_installed(&self) -> bool {
        self.artifact()
            .map(|artifact| artifact.is_installed())
            .unwrap_or(false)
    }

    /// Installs the tool unless it already is, and returns its executables.
    ///
    /// The runtime dependency, if any, is ensured first. Concurrent callers
    /// on the same installer share one download and extraction.
    pub fn ensure_installed(&self) -> BoxFuture<'_, Result<InstalledArtifact, InstallError>> {
        Box::pin(async move {
            if let Some(dependency) = &self.dependency {
                dependency
                    .ensure_installed()
                    .await
                    .map_err(|e| InstallError::Dependency {
                        tool: self.id(),
                        dependency: dependency.id(),
                        reason: e.to_string(),
                    })?;
            }

            let flight = self.flight.clone().lock_owned().await;

            let (platform, spec) = self.resolve()?;
            let artifact = self.artifact_for(spec);
            if artifact.is_installed() {
                debug!("{} already installed at {}", self.id(), artifact.path().display());
                return Ok(artifact);
            }

            info!(
                "Installing {} {} for {}",
                self.definition.display_name, self.definition.version, platform
            );

            let fetcher = self.context.fetcher();
            let download = fetcher
                .fetch_source(spec.url, &spec.checksum)
                .await
                .map_err(|source| InstallError::Download {
                    tool: self.id(),
                    source,
                })?;

            let definition = self.definition;
            let data_dir = self.context.data_dir().to_path_buf();
            let placed = artifact.clone();
            tokio::task::spawn_blocking(move || {
                let _flight = flight;
                finish_install(definition, spec, platform, &download, &data_dir, &placed)
            })
            .await
            .map_err(|e| InstallError::Aborted {
                tool: self.id(),
                reason: e.to_string(),
            })??;

            if !artifact.is_installed() {
                return Err(InstallError::NotExecutable {
                    tool: self.id(),
                    path: artifact.path().to_path_buf(),
                });
            }

            info!("Installed {} at {}", self.id(), artifact.path().display());
            Ok(artifact)
        })
    }
}

/// Places the files, runs the hook and sets the executable bits, in that order.
fn finish_install(
    definition: &ToolDefinition,
    spec: &ToolSpec,
    platform: PlatformTag,
    download: &Path,
    data_dir: &Path,
    artifact: &InstalledArtifact,
) -> Result<(), InstallError> {
    let tool = definition.id;
    let extract_failed = |source| InstallError::Extract { tool, source };

    match &spec.layout {
        ArchiveLayout::Direct => {
            if download != artifact.path() {
                copy_file(download, artifact.path()).map_err(extract_failed)?;
            }
        }
        ArchiveLayout::ExtractAll => {
            remove_stale(artifact).map_err(extract_failed)?;
            let expect: Vec<PathBuf> = artifact.executables().map(Path::to_path_buf).collect();
            extractor::extract(
                download,
                Selector::All {
                    dest_dir: data_dir,
                    expect: &expect,
                },
            )
            .map_err(extract_failed)?;
        }
        ArchiveLayout::PickMember { member } => {
            remove_stale(artifact).map_err(extract_failed)?;
            extractor::extract(
                download,
                Selector::Member {
                    name: member,
                    target: artifact.path(),
                },
            )
            .map_err(extract_failed)?;
        }
    }

    definition
        .hook
        .post_install(platform, artifact.path())
        .map_err(|source| InstallError::Hook {
            tool,
            path: artifact.path().to_path_buf(),
            source,
        })?;

    for path in artifact.executables() {
        extractor::make_executable(path).map_err(|source| InstallError::Permissions {
            tool,
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(())
}

/// Drops executables left by an earlier, unfinished install.
fn remove_stale(artifact: &InstalledArtifact) -> Result<(), ExtractError> {
    for path in artifact.executables() {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ExtractError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| ExtractError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(from, to).map_err(|source| ExtractError::Io {
        path: to.to_path_buf(),
        source,
    })?;
    Ok(())
}
