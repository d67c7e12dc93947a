//! The generation pass.
//!
//! Each declared target goes through resolution, color catalog preparation,
//! entitlement sync, Info.plist and entitlements rendering, and native target
//! reconciliation. Targets are processed one at a time against a single
//! in-memory project graph. A failing target is recorded in the report and
//! leaves no partial changes behind in the graph or the host entitlements; the
//! rest of the pass continues.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::OffsetDateTime;

use crate::android::fix_namespace_in_project;
use crate::assets::prepare_color_catalog;
use crate::defaults::TargetType;
use crate::descriptor::{
    DiscoveredTarget, ResolvedTarget, TargetConfig, TargetDescriptor, resolve,
};
use crate::entitlements::{Entitlements, sync_entitlements};
use crate::host::HostAppConfig;
use crate::ios::{IosPaths, MutationOutcome, ProjectGraph, ensure_target, info_plist, locate_project};
use crate::plist;
use crate::types::{Platform, TargetFailure, TargetsError};

/// Where a generation pass reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    pub project_root: PathBuf,
    pub ios_dir: PathBuf,
    pub android_dir: PathBuf,
    /// Host entitlements file. An existing file is the starting host set: its keys
    /// are kept and the pass only adds to them before writing it back.
    pub host_entitlements: Option<PathBuf>,
}

impl GenerationContext {
    /// Context with `ios/` and `android/` under `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            ios_dir: project_root.join("ios"),
            android_dir: project_root.join("android"),
            project_root,
            host_entitlements: None,
        }
    }

    pub fn with_ios_dir(mut self, ios_dir: impl Into<PathBuf>) -> Self {
        self.ios_dir = ios_dir.into();
        self
    }

    pub fn with_android_dir(mut self, android_dir: impl Into<PathBuf>) -> Self {
        self.android_dir = android_dir.into();
        self
    }

    pub fn with_host_entitlements(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_entitlements = Some(path.into());
        self
    }

    /// `<ios>/<HostProduct>/<HostProduct>.entitlements`, the file a prebuild
    /// creates for the host app.
    pub fn default_host_entitlements(&self, host: &HostAppConfig) -> PathBuf {
        let product = host.product_name();
        self.ios_dir
            .join(&product)
            .join(format!("{product}.entitlements"))
    }
}

/// How a target's descriptor is supplied.
#[derive(Debug)]
pub enum TargetSource {
    /// A `target.toml` / `target.json` file, loaded during the pass so that
    /// a malformed file only fails its own target.
    File(PathBuf),
    Config(TargetConfig),
}

/// One target to generate: its directory plus its descriptor.
#[derive(Debug)]
pub struct TargetEntry {
    pub dir: PathBuf,
    pub source: TargetSource,
}

impl TargetEntry {
    pub fn file(dir: impl Into<PathBuf>, descriptor_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            source: TargetSource::File(descriptor_path.into()),
        }
    }

    pub fn config(dir: impl Into<PathBuf>, config: impl Into<TargetConfig>) -> Self {
        Self {
            dir: dir.into(),
            source: TargetSource::Config(config.into()),
        }
    }

    /// Directory name, used in failures before the target has a name.
    pub fn label(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }
}

impl From<DiscoveredTarget> for TargetEntry {
    fn from(found: DiscoveredTarget) -> Self {
        TargetEntry::file(found.dir, found.descriptor_path)
    }
}

/// Per-target result of a pass.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub label: String,
    pub name: String,
    pub product_name: String,
    pub target_type: TargetType,
    pub bundle_identifier: String,
    pub deployment_target: String,
    pub platforms: Vec<Platform>,
    pub app_group: Option<String>,
    pub ios: Option<IosSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IosSummary {
    #[serde(flatten)]
    pub mutation: MutationOutcome,
    pub entitlements_written: bool,
    pub info_plist_written: bool,
}

/// Outcome of a whole pass.
#[derive(Debug, Serialize)]
pub struct GenerationReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub targets: Vec<TargetSummary>,
    pub failures: Vec<TargetFailure>,
    pub project_file: Option<PathBuf>,
    pub project_written: bool,
    pub host_entitlements_written: bool,
    pub android_namespace_fixed: bool,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The Xcode project, loaded on first use.
#[derive(Default)]
struct LazyProject {
    loaded: Option<LoadedProject>,
}

struct LoadedProject {
    path: PathBuf,
    graph: ProjectGraph,
    /// Serialized form at load time.
    original: String,
}

impl LazyProject {
    fn graph(&mut self, ios_dir: &Path) -> Result<&mut ProjectGraph, TargetsError> {
        if self.loaded.is_none() {
            let path = locate_project(ios_dir)?;
            let graph = ProjectGraph::load(&path)?;
            tracing::debug!(path = %path.display(), objects = graph.len(), "loaded Xcode project");
            let original = graph.to_pbxproj();
            self.loaded = Some(LoadedProject {
                path,
                graph,
                original,
            });
        }
        match &mut self.loaded {
            Some(project) => Ok(&mut project.graph),
            None => Err(TargetsError::MalformedGraph("project failed to load".to_string())),
        }
    }
}

/// Runs one generation pass over `targets`.
///
/// Returns the host configuration with the entitlements the targets require
/// added, plus the report. Per-target failures are collected in the report;
/// the error return is reserved for writes that affect the whole pass (the
/// project file and the host entitlements file).
pub fn generate(
    mut host: HostAppConfig,
    ctx: &GenerationContext,
    targets: Vec<TargetEntry>,
) -> Result<(HostAppConfig, GenerationReport), TargetsError> {
    let generated_at = OffsetDateTime::now_utc();
    let stored_host_entitlements = match &ctx.host_entitlements {
        Some(path) => plist::read_dict(path)?,
        None => None,
    };
    if let Some(stored) = &stored_host_entitlements {
        let mut merged = Entitlements::from_stored(stored);
        merged.overlay(&host.ios.entitlements);
        host.ios.entitlements = merged;
    }
    let initial_host_entitlements = host.ios.entitlements.clone();
    let mut project = LazyProject::default();
    let mut products: BTreeMap<String, String> = BTreeMap::new();
    let mut summaries = Vec::new();
    let mut failures = Vec::new();
    let mut wants_android = false;

    for entry in targets {
        let label = entry.label();
        tracing::info!(label = %label, "generating target");
        match process_target(&mut host, ctx, &mut project, &mut products, entry, &label) {
            Ok(summary) => {
                wants_android |= summary.platforms.contains(&Platform::Android);
                summaries.push(summary);
            }
            Err(failure) => {
                tracing::warn!(label = %label, error = %failure.error, "target failed");
                failures.push(failure);
            }
        }
    }

    let mut android_namespace_fixed = false;
    if wants_android {
        match fix_namespace_in_project(&ctx.android_dir, host.android.package.as_deref()) {
            Ok(changed) => android_namespace_fixed = changed,
            Err(error) => failures.push(TargetFailure {
                target: "android".to_string(),
                platform: Some(Platform::Android),
                error,
            }),
        }
    }

    let (project_file, project_written) = match project.loaded {
        Some(loaded) => {
            let written = loaded.graph.to_pbxproj() != loaded.original
                && loaded.graph.save(&loaded.path)?;
            if written {
                tracing::info!(path = %loaded.path.display(), "wrote Xcode project");
            }
            (Some(loaded.path), written)
        }
        None => (None, false),
    };

    let host_entitlements_written = match (&ctx.host_entitlements, stored_host_entitlements) {
        (Some(path), Some(stored)) => {
            let mut updated = stored.clone();
            host.ios.entitlements.store_into(&mut updated);
            let changed = updated != stored;
            if changed {
                plist::write_dict(path, &updated)?;
            }
            changed
        }
        (Some(path), None) if host.ios.entitlements != initial_host_entitlements => {
            plist::write_if_changed(path, &host.ios.entitlements.to_plist())?
        }
        _ => false,
    };

    let report = GenerationReport {
        generated_at,
        targets: summaries,
        failures,
        project_file,
        project_written,
        host_entitlements_written,
        android_namespace_fixed,
    };
    Ok((host, report))
}

fn process_target(
    host: &mut HostAppConfig,
    ctx: &GenerationContext,
    project: &mut LazyProject,
    products: &mut BTreeMap<String, String>,
    entry: TargetEntry,
    label: &str,
) -> Result<TargetSummary, TargetFailure> {
    let fail = |platform: Option<Platform>, error: TargetsError| TargetFailure {
        target: label.to_string(),
        platform,
        error,
    };

    let TargetEntry { dir, source } = entry;
    let config = match source {
        TargetSource::File(path) => TargetDescriptor::load(&path).map(TargetConfig::from),
        TargetSource::Config(config) => Ok(config),
    }
    .map_err(|e| fail(None, e))?;
    let resolved = resolve(&config, host).map_err(|e| fail(None, e))?;

    if let Some(previous) = products.get(&resolved.product_name) {
        return Err(fail(
            None,
            TargetsError::Configuration(format!(
                "product name '{}' is already used by target '{previous}'",
                resolved.product_name
            )),
        ));
    }
    products.insert(resolved.product_name.clone(), label.to_string());

    let ios = if resolved.supports(Platform::Ios) {
        let summary = generate_ios(host, ctx, project, &dir, &resolved)
            .map_err(|e| fail(Some(Platform::Ios), e))?;
        Some(summary)
    } else {
        None
    };

    Ok(TargetSummary {
        label: label.to_string(),
        name: resolved.name.clone(),
        product_name: resolved.product_name.clone(),
        target_type: resolved.target_type,
        bundle_identifier: resolved.ios.bundle_identifier.clone(),
        deployment_target: resolved.ios.deployment_target.clone(),
        platforms: resolved.platforms.iter().copied().collect(),
        app_group: resolved.app_group.clone(),
        ios,
    })
}

fn generate_ios(
    host: &mut HostAppConfig,
    ctx: &GenerationContext,
    project: &mut LazyProject,
    dir: &Path,
    resolved: &ResolvedTarget,
) -> Result<IosSummary, TargetsError> {
    prepare_color_catalog(dir, &resolved.ios.colors)?;

    let mut host_entitlements = host.ios.entitlements.clone();
    let entitlements = sync_entitlements(&mut host_entitlements, resolved)?;

    let paths = IosPaths::new(&ctx.ios_dir, dir);
    let graph = project.graph(&ctx.ios_dir)?;
    let snapshot = graph.clone();

    let result = ensure_target(graph, resolved, &paths).and_then(|mutation| {
        let product = resolved.product_name.as_str();
        let entitlements_written =
            plist::write_if_changed(&paths.entitlements_path(product), &entitlements.to_plist())?;
        let info_plist_written =
            plist::write_if_changed(&paths.info_plist_path(product), &info_plist(resolved))?;
        Ok(IosSummary {
            mutation,
            entitlements_written,
            info_plist_written,
        })
    });

    match result {
        Ok(summary) => {
            host.ios.entitlements = host_entitlements;
            Ok(summary)
        }
        Err(error) => {
            *graph = snapshot;
            Err(error)
        }
    }
}
