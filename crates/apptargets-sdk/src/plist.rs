//! XML property list rendering for entitlements and Info.plist files.
//!
//! Generated plists are derived from descriptors on every pass and never read
//! back. Output is deterministic so unchanged inputs produce byte-identical files.
//! Files the pass merges into instead of owning (the host entitlements) go
//! through [`read_dict`] and [`write_dict`], which keep every value the file
//! holds, including types [`PlistValue`] has no variant for.

use std::fs;
use std::path::Path;

use crate::types::TargetsError;

/// A property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Bool(bool),
    Integer(i64),
    String(String),
    Array(Vec<PlistValue>),
    /// Dictionary with insertion-ordered keys.
    Dict(Vec<(String, PlistValue)>),
}

impl PlistValue {
    pub fn string(value: impl Into<String>) -> Self {
        PlistValue::String(value.into())
    }

    /// Builds a dictionary from key/value pairs.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, PlistValue)>) -> Self {
        PlistValue::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
"#;

/// Renders a complete XML plist document.
pub fn to_xml(root: &PlistValue) -> String {
    let mut out = String::from(HEADER);
    write_value(&mut out, root, 0);
    out.push_str("</plist>\n");
    out
}

/// Writes a plist to disk, skipping the write when the file already has the same
/// contents. Returns whether the file changed.
pub fn write_if_changed(path: &Path, root: &PlistValue) -> Result<bool, TargetsError> {
    let xml = to_xml(root);
    if fs::read_to_string(path).map(|existing| existing == xml).unwrap_or(false) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TargetsError::io(parent, e))?;
    }
    fs::write(path, xml).map_err(|e| TargetsError::io(path, e))?;
    Ok(true)
}

/// Top-level dictionary of an existing plist file, `None` when the file is absent.
pub fn read_dict(path: &Path) -> Result<Option<::plist::Dictionary>, TargetsError> {
    if !path.exists() {
        return Ok(None);
    }
    let value = ::plist::Value::from_file(path).map_err(|e| TargetsError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    value.into_dictionary().map(Some).ok_or_else(|| TargetsError::Parse {
        path: path.to_path_buf(),
        message: "top-level value is not a dictionary".to_string(),
    })
}

/// Writes `dict` as an XML plist.
pub fn write_dict(path: &Path, dict: &::plist::Dictionary) -> Result<(), TargetsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TargetsError::io(parent, e))?;
    }
    ::plist::Value::Dictionary(dict.clone())
        .to_file_xml(path)
        .map_err(|e| TargetsError::io(path, std::io::Error::other(e)))
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
    let indent = "\t".repeat(depth);
    match value {
        PlistValue::Bool(true) => out.push_str(&format!("{indent}<true/>\n")),
        PlistValue::Bool(false) => out.push_str(&format!("{indent}<false/>\n")),
        PlistValue::Integer(n) => out.push_str(&format!("{indent}<integer>{n}</integer>\n")),
        PlistValue::String(s) => {
            out.push_str(&format!("{indent}<string>{}</string>\n", escape(s)))
        }
        PlistValue::Array(items) if items.is_empty() => out.push_str(&format!("{indent}<array/>\n")),
        PlistValue::Array(items) => {
            out.push_str(&format!("{indent}<array>\n"));
            for item in items {
                write_value(out, item, depth + 1);
            }
            out.push_str(&format!("{indent}</array>\n"));
        }
        PlistValue::Dict(entries) if entries.is_empty() => {
            out.push_str(&format!("{indent}<dict/>\n"))
        }
        PlistValue::Dict(entries) => {
            out.push_str(&format!("{indent}<dict>\n"));
            for (key, item) in entries {
                out.push_str(&format!("{indent}\t<key>{}</key>\n", escape(key)));
                write_value(out, item, depth + 1);
            }
            out.push_str(&format!("{indent}</dict>\n"));
        }
    }
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_dictionary() {
        let value = PlistValue::dict([
            ("CFBundleName", PlistValue::string("Share & Go")),
            (
                "NSExtension",
                PlistValue::dict([
                    ("NSExtensionPointIdentifier", PlistValue::string("com.apple.share-services")),
                    ("Enabled", PlistValue::Bool(true)),
                ]),
            ),
            ("Groups", PlistValue::Array(vec![])),
        ]);
        let xml = to_xml(&value);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("\t<key>CFBundleName</key>\n\t<string>Share &amp; Go</string>\n"));
        assert!(xml.contains("\t\t<key>Enabled</key>\n\t\t<true/>\n"));
        assert!(xml.contains("\t<array/>\n"));
        assert!(xml.ends_with("</dict>\n</plist>\n"));
    }

    #[test]
    fn write_if_changed_reports_no_change_on_second_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/Info.plist");
        let value = PlistValue::dict([("Key", PlistValue::Integer(3))]);
        assert!(write_if_changed(&path, &value).unwrap());
        assert!(!write_if_changed(&path, &value).unwrap());
    }

    #[test]
    fn read_dict_keeps_values_outside_the_rendered_subset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Host.entitlements");
        assert!(read_dict(&path).unwrap().is_none());

        fs::write(
            &path,
            format!(
                "{HEADER}<dict>\n\t<key>limit</key>\n\t<integer>7</integer>\n\t<key>ratio</key>\n\t<real>0.5</real>\n</dict>\n</plist>\n"
            ),
        )
        .unwrap();
        let dict = read_dict(&path).unwrap().unwrap();
        assert_eq!(dict.get("ratio").and_then(|v| v.as_real()), Some(0.5));

        write_dict(&path, &dict).unwrap();
        assert_eq!(read_dict(&path).unwrap().unwrap(), dict);
    }

    #[test]
    fn read_dict_rejects_a_non_dictionary_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("list.plist");
        fs::write(&path, to_xml(&PlistValue::Array(vec![PlistValue::Bool(true)]))).unwrap();
        assert!(matches!(read_dict(&path), Err(TargetsError::Parse { .. })));
    }
}
