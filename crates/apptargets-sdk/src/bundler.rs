//! Bundler configuration for targets that ship their own entry point.
//!
//! [`BundlerTargetRouter::apply`] wraps the bundler's transform and serializer
//! hooks. Every module is transformed with import-graph optimizations off and
//! eager evaluation on, and bundles built from a registered target entry get no
//! run-before-main modules, so host startup code stays out of extensions.
//! Existing hooks are always called through, never replaced.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::ResolvedTarget;

/// Options returned by the transform-options hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    pub experimental_import_support: bool,
    pub inline_requires: bool,
    /// Options this module does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What the bundler is transforming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Entry file of the bundle being built.
    pub entry_point: String,
    pub dev: bool,
}

pub type TransformOptionsHook = Arc<dyn Fn(&TransformRequest) -> TransformOptions + Send + Sync>;
/// Given an entry point, returns modules to run before the main module.
pub type RunBeforeMainHook = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// The parts of the bundler configuration the router touches.
#[derive(Clone, Default)]
pub struct BundlerConfig {
    pub get_transform_options: Option<TransformOptionsHook>,
    pub get_modules_run_before_main_module: Option<RunBeforeMainHook>,
}

impl fmt::Debug for BundlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundlerConfig")
            .field("get_transform_options", &self.get_transform_options.is_some())
            .field(
                "get_modules_run_before_main_module",
                &self.get_modules_run_before_main_module.is_some(),
            )
            .finish()
    }
}

impl BundlerConfig {
    /// Runs the transform hook, or returns default options when there is none.
    pub fn transform_options(&self, request: &TransformRequest) -> TransformOptions {
        self.get_transform_options
            .as_ref()
            .map(|hook| hook(request))
            .unwrap_or_default()
    }

    /// Runs the serializer hook, or returns no modules when there is none.
    pub fn modules_run_before_main(&self, entry_point: &str) -> Vec<String> {
        self.get_modules_run_before_main_module
            .as_ref()
            .map(|hook| hook(entry_point))
            .unwrap_or_default()
    }
}

/// Knows which entry points belong to targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlerTargetRouter {
    project_root: PathBuf,
    entries: BTreeSet<PathBuf>,
}

impl BundlerTargetRouter {
    /// A router for `entries`, which may be relative to `project_root`.
    pub fn new<I, P>(project_root: impl Into<PathBuf>, entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let project_root = project_root.into();
        let entries = entries
            .into_iter()
            .map(|entry| normalize(&project_root, entry.as_ref()))
            .collect();
        Self {
            project_root,
            entries,
        }
    }

    /// Registers the entry point of every target that declares one. `entry` is
    /// relative to the target's directory.
    pub fn from_targets<'a>(
        project_root: impl Into<PathBuf>,
        targets: impl IntoIterator<Item = (&'a Path, &'a ResolvedTarget)>,
    ) -> Self {
        let entries: Vec<PathBuf> = targets
            .into_iter()
            .filter_map(|(dir, target)| target.ios.entry.as_ref().map(|entry| dir.join(entry)))
            .collect();
        Self::new(project_root, entries)
    }

    pub fn is_target_entry(&self, entry_point: &str) -> bool {
        self.entries
            .contains(&normalize(&self.project_root, Path::new(entry_point)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wraps both hooks of `config`.
    pub fn apply(&self, config: BundlerConfig) -> BundlerConfig {
        let inner_transform = config.get_transform_options.clone();
        let transform: TransformOptionsHook = Arc::new(move |request: &TransformRequest| {
            let mut options = inner_transform
                .as_ref()
                .map(|hook| hook(request))
                .unwrap_or_default();
            options.experimental_import_support = false;
            options.inline_requires = false;
            options
        });

        let router = self.clone();
        let inner_serializer = config.get_modules_run_before_main_module.clone();
        let serializer: RunBeforeMainHook = Arc::new(move |entry_point: &str| {
            let inherited = inner_serializer
                .as_ref()
                .map(|hook| hook(entry_point))
                .unwrap_or_default();
            if router.is_target_entry(entry_point) {
                Vec::new()
            } else {
                inherited
            }
        });

        BundlerConfig {
            get_transform_options: Some(transform),
            get_modules_run_before_main_module: Some(serializer),
        }
    }
}

fn normalize(root: &Path, entry: &Path) -> PathBuf {
    let joined = if entry.is_absolute() {
        entry.to_path_buf()
    } else {
        root.join(entry)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn router() -> BundlerTargetRouter {
        BundlerTargetRouter::new("/app", ["./targets/share/index.js"])
    }

    #[test]
    fn transform_hook_calls_through_and_forces_eager_evaluation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let base = BundlerConfig {
            get_transform_options: Some(Arc::new(move |_: &TransformRequest| {
                seen.fetch_add(1, Ordering::SeqCst);
                let mut options = TransformOptions {
                    experimental_import_support: true,
                    inline_requires: true,
                    ..TransformOptions::default()
                };
                options.extra.insert("unstable_disableES6Transforms".into(), true.into());
                options
            })),
            get_modules_run_before_main_module: None,
        };

        let config = router().apply(base);
        let request = TransformRequest {
            entry_point: "/app/index.js".into(),
            dev: true,
        };
        let options = config.transform_options(&request);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!options.experimental_import_support);
        assert!(!options.inline_requires);
        assert_eq!(options.extra["unstable_disableES6Transforms"], true);
    }

    #[test]
    fn target_entries_get_no_run_before_main_modules() {
        let base = BundlerConfig {
            get_transform_options: None,
            get_modules_run_before_main_module: Some(Arc::new(|_: &str| vec!["InitializeCore".to_string()])),
        };
        let config = router().apply(base);
        assert!(config.modules_run_before_main("/app/targets/share/index.js").is_empty());
        assert!(config.modules_run_before_main("targets/share/../share/index.js").is_empty());
        assert_eq!(config.modules_run_before_main("/app/index.js"), ["InitializeCore"]);
    }

    #[test]
    fn missing_hooks_fall_back_to_defaults() {
        let config = router().apply(BundlerConfig::default());
        let options = config.transform_options(&TransformRequest {
            entry_point: "index.js".into(),
            dev: false,
        });
        assert_eq!(options, TransformOptions::default());
        assert!(config.modules_run_before_main("/app/index.js").is_empty());
    }

    #[test]
    fn transform_options_serialize_in_camel_case() {
        let json = serde_json::to_value(TransformOptions::default()).unwrap();
        assert_eq!(json["experimentalImportSupport"], false);
        assert_eq!(json["inlineRequires"], false);
    }
}
