//! Asset catalog preparation for declared color tokens.
//!
//! Each declared color becomes a `.colorset` inside the target's
//! `Assets.xcassets`. The catalog is what the iOS mutator later copies into the
//! Xcode project tree and registers as a resource. Once that copy exists, later
//! passes rewrite only the declared colorsets inside it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::TargetsError;

/// Directory name of the prepared asset catalog inside a target directory.
pub const ASSET_CATALOG: &str = "Assets.xcassets";

/// A color token: one hex value, or light and dark variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Single(String),
    Themed {
        light: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dark: Option<String>,
    },
}

impl ColorValue {
    fn light(&self) -> &str {
        match self {
            ColorValue::Single(hex) => hex,
            ColorValue::Themed { light, .. } => light,
        }
    }

    fn dark(&self) -> Option<&str> {
        match self {
            ColorValue::Single(_) => None,
            ColorValue::Themed { dark, .. } => dark.as_deref(),
        }
    }
}

/// Maps a declared color name to its colorset name.
///
/// `$accent` and `$widgetBackground` name the colors WidgetKit and the asset
/// compiler look up by convention.
pub fn colorset_name(name: &str) -> String {
    match name {
        "$accent" => "AccentColor".to_string(),
        "$widgetBackground" => "WidgetBackground".to_string(),
        other => other.to_string(),
    }
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into 0-1 RGBA components.
pub fn parse_hex(input: &str) -> Result<[f64; 4], TargetsError> {
    let hex = input.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => {
            return Err(TargetsError::Configuration(format!(
                "invalid color '{input}', expected #rgb, #rrggbb or #rrggbbaa"
            )));
        }
    };
    let mut components = [1.0; 4];
    for (i, slot) in components.iter_mut().enumerate().take(expanded.len() / 2) {
        let byte = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16).map_err(|_| {
            TargetsError::Configuration(format!("invalid color '{input}': not hexadecimal"))
        })?;
        *slot = f64::from(byte) / 255.0;
    }
    Ok(components)
}

fn color_json(hex: &str) -> Result<Value, TargetsError> {
    let [r, g, b, a] = parse_hex(hex)?;
    Ok(json!({
        "color-space": "srgb",
        "components": {
            "red": format!("{r:.3}"),
            "green": format!("{g:.3}"),
            "blue": format!("{b:.3}"),
            "alpha": format!("{a:.3}"),
        }
    }))
}

fn colorset_contents(color: &ColorValue) -> Result<Value, TargetsError> {
    let mut colors = vec![json!({ "idiom": "universal", "color": color_json(color.light())? })];
    if let Some(dark) = color.dark() {
        colors.push(json!({
            "idiom": "universal",
            "appearances": [{ "appearance": "luminosity", "value": "dark" }],
            "color": color_json(dark)?,
        }));
    }
    Ok(json!({
        "colors": colors,
        "info": { "author": "xcode", "version": 1 },
    }))
}

/// Writes a colorset for every declared color into `<target_dir>/Assets.xcassets`.
///
/// Returns the catalog path, or `None` when the target declares no colors. Files
/// are rewritten only when their contents change.
pub fn prepare_color_catalog(
    target_dir: &Path,
    colors: &BTreeMap<String, ColorValue>,
) -> Result<Option<PathBuf>, TargetsError> {
    if colors.is_empty() {
        return Ok(None);
    }
    let catalog = target_dir.join(ASSET_CATALOG);
    write_json_if_changed(
        &catalog.join("Contents.json"),
        &json!({ "info": { "author": "xcode", "version": 1 } }),
    )?;
    write_colorsets(&catalog, colors)?;
    Ok(Some(catalog))
}

/// Writes the colorset of every declared color into `catalog`, leaving the
/// catalog's other entries alone. Returns how many colorsets changed.
pub fn write_colorsets(
    catalog: &Path,
    colors: &BTreeMap<String, ColorValue>,
) -> Result<usize, TargetsError> {
    let mut changed = 0;
    for (name, color) in colors {
        let colorset = catalog.join(format!("{}.colorset", colorset_name(name)));
        if write_json_if_changed(&colorset.join("Contents.json"), &colorset_contents(color)?)? {
            changed += 1;
        }
    }
    Ok(changed)
}

fn write_json_if_changed(path: &Path, value: &Value) -> Result<bool, TargetsError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    if fs::read_to_string(path).map(|existing| existing == text).unwrap_or(false) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TargetsError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| TargetsError::io(path, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_hex("#fff").unwrap(), [1.0, 1.0, 1.0, 1.0]);
        let [r, g, b, a] = parse_hex("#FF000080").unwrap();
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
        assert!((a - 128.0 / 255.0).abs() < 1e-9);
        assert!(parse_hex("#12").is_err());
        assert!(parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn themed_colors_deserialize_from_either_shape() {
        let colors: BTreeMap<String, ColorValue> = serde_json::from_str(
            r##"{ "$accent": "#ff0000", "tint": { "light": "#000", "dark": "#fff" } }"##,
        )
        .unwrap();
        assert_eq!(colors["$accent"], ColorValue::Single("#ff0000".into()));
        assert_eq!(colors["tint"].dark(), Some("#fff"));
    }

    #[test]
    fn writes_colorsets_with_dark_appearance() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut colors = BTreeMap::new();
        colors.insert("$widgetBackground".to_string(), ColorValue::Single("#102030".into()));
        colors.insert(
            "tint".to_string(),
            ColorValue::Themed {
                light: "#000000".into(),
                dark: Some("#ffffff".into()),
            },
        );

        let catalog = prepare_color_catalog(dir.path(), &colors).unwrap().unwrap();
        assert!(catalog.join("Contents.json").exists());
        let background: Value = serde_json::from_str(
            &fs::read_to_string(catalog.join("WidgetBackground.colorset/Contents.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(background["colors"].as_array().unwrap().len(), 1);
        let tint: Value = serde_json::from_str(
            &fs::read_to_string(catalog.join("tint.colorset/Contents.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(tint["colors"][1]["appearances"][0]["value"], "dark");
        assert_eq!(tint["colors"][1]["color"]["components"]["red"], "1.000");
    }

    #[test]
    fn no_colors_means_no_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(prepare_color_catalog(dir.path(), &BTreeMap::new()).unwrap().is_none());
        assert!(!dir.path().join(ASSET_CATALOG).exists());
    }
}
