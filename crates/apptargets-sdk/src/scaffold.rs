//! Target scaffolding from embedded templates
//!
//! Templates live under `templates/target` and are compiled into the crate.
//! Files ending in `.template` are rendered with `{{VAR}}` substitution and
//! written without the suffix.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{Dir, DirEntry, include_dir};

use crate::defaults::{TargetType, lookup_defaults};
use crate::descriptor::sanitize;
use crate::types::TargetsError;

const TARGET_TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates/target");

/// Template variable that can be replaced in template files
#[derive(Debug, Clone)]
pub struct TemplateVar {
    pub name: &'static str,
    pub value: String,
}

/// Creates `<targets_root>/<slug>/` with a starter descriptor for `target_type`.
///
/// The directory name is the kebab-cased `name`. Existing directories are
/// never overwritten.
///
/// # Returns
///
/// * `Ok(PathBuf)` - The new target directory
/// * `Err(TargetsError)` - If the name is unusable, the directory exists, or a
///   template could not be rendered
pub fn scaffold_target(
    targets_root: &Path,
    target_type: TargetType,
    name: &str,
) -> Result<PathBuf, TargetsError> {
    let product_name = sanitize(name);
    let slug = directory_slug(name);
    if product_name.is_empty() || slug.is_empty() {
        return Err(TargetsError::Configuration(format!(
            "target name '{name}' has no alphanumeric characters"
        )));
    }
    let target_dir = targets_root.join(&slug);
    if target_dir.exists() {
        return Err(TargetsError::Configuration(format!(
            "{} already exists; pick another name or edit the existing target",
            target_dir.display()
        )));
    }

    let defaults = lookup_defaults(target_type);
    let vars = [
        TemplateVar {
            name: "TARGET_TYPE",
            value: target_type.as_str().to_string(),
        },
        TemplateVar {
            name: "TARGET_NAME",
            value: toml::Value::String(name.to_string()).to_string(),
        },
        TemplateVar {
            name: "PRODUCT_NAME",
            value: product_name,
        },
        TemplateVar {
            name: "DEPLOYMENT_TARGET",
            value: defaults.minimum_deployment_target.to_string(),
        },
        TemplateVar {
            name: "BUNDLE_SUFFIX",
            value: defaults.bundle_identifier_suffix.to_string(),
        },
        TemplateVar {
            name: "EXTENSION_POINT",
            value: defaults
                .extension_point_identifier
                .unwrap_or("none (application)")
                .to_string(),
        },
    ];

    render_dir(&TARGET_TEMPLATES, &target_dir, &vars)?;
    tracing::info!(dir = %target_dir.display(), %target_type, "scaffolded target");
    Ok(target_dir)
}

/// `"Content Share!"` becomes `"content-share"`.
fn directory_slug(name: &str) -> String {
    let lowered: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    lowered
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn render_dir(dir: &Dir, out_root: &Path, vars: &[TemplateVar]) -> Result<(), TargetsError> {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub) => render_dir(sub, out_root, vars)?,
            DirEntry::File(file) => {
                // file.path() is relative to the embedded root
                let mut relative = file.path().to_path_buf();
                let mut contents = file.contents().to_vec();

                if relative.extension().is_some_and(|ext| ext == "template") {
                    relative.set_extension("");
                    let text = std::str::from_utf8(&contents).map_err(|e| TargetsError::Parse {
                        path: relative.clone(),
                        message: e.to_string(),
                    })?;
                    let rendered = render_template(text, vars);
                    validate_no_unreplaced_placeholders(&rendered, &relative)?;
                    contents = rendered.into_bytes();
                }

                let out_path = out_root.join(relative);
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent).map_err(|e| TargetsError::io(parent, e))?;
                }
                fs::write(&out_path, contents).map_err(|e| TargetsError::io(&out_path, e))?;
            }
        }
    }
    Ok(())
}

/// Validates that no unreplaced template placeholders remain in the rendered content
fn validate_no_unreplaced_placeholders(content: &str, file_path: &Path) -> Result<(), TargetsError> {
    let mut pos = 0;
    let mut unreplaced = Vec::new();

    while let Some(start) = content[pos..].find("{{") {
        let abs_start = pos + start;
        let Some(end) = content[abs_start..].find("}}") else {
            break;
        };
        let var_name = &content[abs_start + 2..abs_start + end];
        if !var_name.is_empty() && !var_name.contains(' ') && !var_name.contains('$') {
            unreplaced.push(content[abs_start..abs_start + end + 2].to_string());
        }
        pos = abs_start + end + 2;
    }

    if !unreplaced.is_empty() {
        return Err(TargetsError::Configuration(format!(
            "template validation failed for {}: unreplaced placeholders {:?}",
            file_path.display(),
            unreplaced
        )));
    }
    Ok(())
}

fn render_template(input: &str, vars: &[TemplateVar]) -> String {
    let mut output = input.to_string();
    for var in vars {
        output = output.replace(&format!("{{{{{}}}}}", var.name), &var.value);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{TargetConfig, TargetDescriptor, resolve};
    use crate::host::HostAppConfig;

    #[test]
    fn scaffolded_descriptor_resolves() {
        let dir = tempfile::TempDir::new().unwrap();
        let target_dir = scaffold_target(dir.path(), TargetType::Widget, "Clock \"Face\"").unwrap();
        assert!(target_dir.ends_with("clock-face"));
        assert!(target_dir.join("README.md").is_file());

        let descriptor = TargetDescriptor::load(&target_dir.join("target.toml")).unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("Clock \"Face\""));
        let host = HostAppConfig::new("Host").with_bundle_identifier("com.example.app");
        let resolved = resolve(&TargetConfig::from(descriptor), &host).unwrap();
        assert_eq!(resolved.product_name, "ClockFace");
        assert_eq!(resolved.ios.deployment_target, "14.0");
    }

    #[test]
    fn every_type_scaffolds_without_leftover_placeholders() {
        let dir = tempfile::TempDir::new().unwrap();
        for ty in TargetType::ALL {
            scaffold_target(dir.path(), ty, &format!("sample {ty}")).unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), TargetType::ALL.len());
    }

    #[test]
    fn refuses_to_overwrite_or_accept_empty_names() {
        let dir = tempfile::TempDir::new().unwrap();
        scaffold_target(dir.path(), TargetType::Share, "share").unwrap();
        assert!(matches!(
            scaffold_target(dir.path(), TargetType::Share, "Share!"),
            Err(TargetsError::Configuration(_))
        ));
        assert!(scaffold_target(dir.path(), TargetType::Share, "!!!").is_err());
    }

    #[test]
    fn detects_unreplaced_placeholders() {
        let path = Path::new("target.toml");
        assert!(validate_no_unreplaced_placeholders("name = {{TARGET_NAME}}", path).is_err());
        assert!(validate_no_unreplaced_placeholders("gradle ${{ project }}", path).is_ok());
        assert!(validate_no_unreplaced_placeholders("plain", path).is_ok());
    }

    #[test]
    fn slugs_are_kebab_case() {
        assert_eq!(directory_slug("Content Share!"), "content-share");
        assert_eq!(directory_slug("--A__b--"), "a-b");
    }
}
