//! iOS project synthesis: the pbxproj codec, the project graph, and the
//! per-target mutator.

pub mod graph;
pub mod infoplist;
pub mod mutator;
pub mod pbxproj;

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::TargetsError;

pub use graph::{NativeTargetNode, ObjectId, ProjectGraph};
pub use infoplist::info_plist;
pub use mutator::{IosPaths, MutationOutcome, ensure_target};

/// Finds `<ios>/<Name>.xcodeproj/project.pbxproj`.
///
/// When several projects exist the alphabetically first one wins, which
/// matches what a prebuild produces (exactly one project).
pub fn locate_project(ios_dir: &Path) -> Result<PathBuf, TargetsError> {
    let entries = fs::read_dir(ios_dir).map_err(|e| TargetsError::io(ios_dir, e))?;
    let mut projects: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "xcodeproj"))
        .map(|path| path.join("project.pbxproj"))
        .filter(|path| path.is_file())
        .collect();
    projects.sort();
    projects.into_iter().next().ok_or_else(|| {
        TargetsError::Configuration(format!(
            "no .xcodeproj with a project.pbxproj found in {}",
            ios_dir.display()
        ))
    })
}
