//! Brings a native target node in line with its resolved descriptor.
//!
//! Every step compares before it writes, so running the mutator twice against
//! the same graph leaves the second run with nothing to do. Target creation is
//! not handled here: the node must already exist under the sanitized product
//! name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;
use walkdir::WalkDir;

use super::graph::{ObjectId, ProjectGraph};
use crate::assets::{ASSET_CATALOG, ColorValue, write_colorsets};
use crate::descriptor::ResolvedTarget;
use crate::types::TargetsError;

/// Name of the generated entitlements file inside a product directory.
pub const ENTITLEMENTS_FILE: &str = "generated.entitlements";
/// Name of the generated Info.plist inside a product directory.
pub const INFO_PLIST_FILE: &str = "Info.plist";

const ASSET_CATALOG_FILE_TYPE: &str = "folder.assetcatalog";

/// Filesystem locations the mutator reads from and writes to.
#[derive(Debug, Clone)]
pub struct IosPaths {
    /// The native iOS project directory (`<project>/ios`).
    pub ios_dir: PathBuf,
    /// The target's descriptor directory, holding prepared assets.
    pub target_dir: PathBuf,
}

impl IosPaths {
    pub fn new(ios_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            ios_dir: ios_dir.into(),
            target_dir: target_dir.into(),
        }
    }

    /// `<ios>/<Product>`, where generated files for the product live.
    pub fn product_dir(&self, product_name: &str) -> PathBuf {
        self.ios_dir.join(product_name)
    }

    pub fn entitlements_path(&self, product_name: &str) -> PathBuf {
        self.product_dir(product_name).join(ENTITLEMENTS_FILE)
    }

    pub fn info_plist_path(&self, product_name: &str) -> PathBuf {
        self.product_dir(product_name).join(INFO_PLIST_FILE)
    }
}

/// What [`ensure_target`] changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub target: ObjectId,
    pub product_type_changed: bool,
    /// Number of (configuration, setting) pairs rewritten.
    pub settings_changed: usize,
    pub group_created: bool,
    pub assets_copied: bool,
    /// Declared colorsets rewritten inside an already copied catalog.
    pub colors_refreshed: usize,
    pub asset_registered: bool,
}

impl MutationOutcome {
    fn new(target: ObjectId) -> Self {
        Self {
            target,
            product_type_changed: false,
            settings_changed: 0,
            group_created: false,
            assets_copied: false,
            colors_refreshed: 0,
            asset_registered: false,
        }
    }

    /// True when the run changed nothing.
    pub fn is_noop(&self) -> bool {
        !self.product_type_changed
            && self.settings_changed == 0
            && !self.group_created
            && !self.assets_copied
            && self.colors_refreshed == 0
            && !self.asset_registered
    }
}

/// Reconciles the native target named after `target.product_name`.
///
/// The prepared asset catalog is copied to `<ios>/<Product>/Assets.xcassets`
/// only when that directory does not exist yet, so hand edits there survive.
/// After the first copy only the colorsets of declared colors are rewritten in
/// place. Other assets added to the target directory later do not reach the
/// copy until it is removed.
///
/// # Errors
///
/// Returns [`TargetsError::ProjectGraph`] when no native target has the
/// product name, and I/O errors from the asset copy.
pub fn ensure_target(
    graph: &mut ProjectGraph,
    target: &ResolvedTarget,
    paths: &IosPaths,
) -> Result<MutationOutcome, TargetsError> {
    let product = target.product_name.as_str();
    let id = graph
        .find_native_target_by_name(product)
        .ok_or_else(|| TargetsError::ProjectGraph {
            product_name: product.to_string(),
        })?;
    let mut outcome = MutationOutcome::new(id.clone());

    outcome.product_type_changed = graph.set_product_type(&id, target.defaults.product_type)?;

    let settings = [
        ("PRODUCT_BUNDLE_IDENTIFIER", target.ios.bundle_identifier.clone()),
        (
            target.defaults.deployment_setting.build_setting(),
            target.ios.deployment_target.clone(),
        ),
        ("CODE_SIGN_ENTITLEMENTS", format!("{product}/{ENTITLEMENTS_FILE}")),
        ("INFOPLIST_FILE", format!("{product}/{INFO_PLIST_FILE}")),
        ("INFOPLIST_KEY_CFBundleDisplayName", target.display_name.clone()),
    ];
    for (key, value) in &settings {
        outcome.settings_changed += graph.set_build_setting(&id, key, value)?;
    }

    sync_assets(graph, &id, product, &target.ios.colors, paths, &mut outcome)?;

    if outcome.is_noop() {
        tracing::debug!(product, "native target already up to date");
    } else {
        tracing::info!(
            product,
            settings_changed = outcome.settings_changed,
            assets_copied = outcome.assets_copied,
            colors_refreshed = outcome.colors_refreshed,
            asset_registered = outcome.asset_registered,
            "updated native target"
        );
    }
    Ok(outcome)
}

fn sync_assets(
    graph: &mut ProjectGraph,
    id: &ObjectId,
    product: &str,
    colors: &BTreeMap<String, ColorValue>,
    paths: &IosPaths,
    outcome: &mut MutationOutcome,
) -> Result<(), TargetsError> {
    let source = paths.target_dir.join(ASSET_CATALOG);
    if !source.is_dir() {
        tracing::warn!(
            product,
            path = %source.display(),
            "asset catalog not found, skipping asset sync"
        );
        return Ok(());
    }

    let destination = paths.product_dir(product).join(ASSET_CATALOG);
    if destination.exists() {
        outcome.colors_refreshed = write_colorsets(&destination, colors)?;
    } else {
        copy_tree_atomically(&source, &destination)?;
        outcome.assets_copied = true;
    }

    let main = graph.main_group()?;
    let (group, created) = graph.ensure_group(&main, product)?;
    outcome.group_created = created;
    if !graph.group_contains_path(&group, ASSET_CATALOG) {
        graph.add_resource(id, &group, ASSET_CATALOG, ASSET_CATALOG_FILE_TYPE)?;
        outcome.asset_registered = true;
    }
    Ok(())
}

/// Copies a directory tree so that `destination` either appears complete or
/// not at all: the tree is staged next to it and renamed into place.
fn copy_tree_atomically(source: &Path, destination: &Path) -> Result<(), TargetsError> {
    let parent = destination.parent().ok_or_else(|| {
        TargetsError::Configuration(format!("{} has no parent directory", destination.display()))
    })?;
    fs::create_dir_all(parent).map_err(|e| TargetsError::io(parent, e))?;

    let staging = parent.join(format!(".{ASSET_CATALOG}.{}.partial", Uuid::new_v4().simple()));
    let result = copy_tree(source, &staging).and_then(|()| {
        fs::rename(&staging, destination).map_err(|e| TargetsError::io(destination, e))
    });
    if result.is_err() {
        let _ = fs::remove_dir_all(&staging);
    }
    result
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), TargetsError> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            TargetsError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| TargetsError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| TargetsError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
