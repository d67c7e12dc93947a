//! Android build script adjustment.
//!
//! The only Android-side change is keeping the app module's `namespace` equal
//! to the configured package. Both Groovy (`namespace "x"`) and Kotlin DSL
//! (`namespace = "x"`) declarations are recognized. A script without a
//! namespace declaration is left alone.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::types::TargetsError;

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(?P<lead>\s*namespace\s*(?:=\s*)?)(?P<quote>["'])(?P<value>[^"'\n]*)["']"#)
        .unwrap_or_else(|e| panic!("namespace pattern is invalid: {e}"))
});

/// Rewrites the namespace declaration to `package`.
///
/// Returns the input unchanged when `package` is `None`, when no declaration
/// exists, or when it already matches.
pub fn fix_namespace(text: &str, package: Option<&str>) -> String {
    let Some(package) = package else {
        return text.to_string();
    };
    let Some(caps) = NAMESPACE.captures(text) else {
        return text.to_string();
    };
    if &caps["value"] == package {
        return text.to_string();
    }
    let Some(whole) = caps.get(0) else {
        return text.to_string();
    };
    let quote = &caps["quote"];
    let replacement = format!("{}{quote}{package}{quote}", &caps["lead"]);
    let mut out = String::with_capacity(text.len() + package.len());
    out.push_str(&text[..whole.start()]);
    out.push_str(&replacement);
    out.push_str(&text[whole.end()..]);
    out
}

/// The app module build script, preferring Groovy over Kotlin DSL.
pub fn app_build_script(android_dir: &Path) -> Option<PathBuf> {
    ["app/build.gradle", "app/build.gradle.kts"]
        .into_iter()
        .map(|relative| android_dir.join(relative))
        .find(|path| path.is_file())
}

/// Applies [`fix_namespace`] to the app module's build script on disk.
///
/// Returns whether the file was rewritten. A missing build script is not an
/// error: there is nothing to fix.
pub fn fix_namespace_in_project(android_dir: &Path, package: Option<&str>) -> Result<bool, TargetsError> {
    let Some(script) = app_build_script(android_dir) else {
        tracing::debug!(dir = %android_dir.display(), "no app build script, skipping namespace fix");
        return Ok(false);
    };
    let text = fs::read_to_string(&script).map_err(|e| TargetsError::io(&script, e))?;
    let fixed = fix_namespace(&text, package);
    if fixed == text {
        return Ok(false);
    }
    fs::write(&script, fixed).map_err(|e| TargetsError::io(&script, e))?;
    tracing::info!(script = %script.display(), package, "updated android namespace");
    Ok(true)
}
