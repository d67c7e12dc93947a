//! Typed view over the Xcode project object graph.
//!
//! The graph is an arena of objects keyed by their 24-character object id.
//! Objects reference each other only through ids, so every lookup goes through
//! the arena and there are no borrowed links to keep alive across mutations.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use super::pbxproj::{self, PbxValue};
use crate::types::TargetsError;

/// Identifier of an object in the project graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One object of the graph: an `isa` plus its properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxObject {
    props: IndexMap<String, PbxValue>,
}

impl PbxObject {
    fn new(isa: &str) -> Self {
        let mut props = IndexMap::new();
        props.insert("isa".to_string(), PbxValue::string(isa));
        Self { props }
    }

    fn with(mut self, key: &str, value: PbxValue) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn isa(&self) -> &str {
        self.str("isa").unwrap_or("")
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(PbxValue::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&PbxValue> {
        self.props.get(key)
    }

    /// Ids listed in an array-valued property. Missing keys read as empty.
    pub fn ids(&self, key: &str) -> Vec<ObjectId> {
        self.props
            .get(key)
            .and_then(PbxValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(PbxValue::as_str)
                    .map(ObjectId::new)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn push_id(&mut self, key: &str, id: &ObjectId) {
        let entry = self
            .props
            .entry(key.to_string())
            .or_insert_with(|| PbxValue::Array(Vec::new()));
        if let PbxValue::Array(items) = entry {
            items.push(PbxValue::string(id.as_str()));
        } else {
            *entry = PbxValue::Array(vec![PbxValue::string(id.as_str())]);
        }
    }

    /// Sets a string property, returning whether it changed.
    fn set_str(&mut self, key: &str, value: &str) -> bool {
        if self.str(key) == Some(value) {
            return false;
        }
        self.props.insert(key.to_string(), PbxValue::string(value));
        true
    }
}

/// Summary of a `PBXNativeTarget` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTargetNode {
    pub id: ObjectId,
    pub name: String,
    pub product_type: Option<String>,
    pub build_configuration_list: Option<ObjectId>,
    pub build_phases: Vec<ObjectId>,
}

/// The parsed `project.pbxproj`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGraph {
    /// Top-level keys in document order. `objects` only holds a placeholder,
    /// the real objects live in the arena.
    root: IndexMap<String, PbxValue>,
    objects: IndexMap<ObjectId, PbxObject>,
}

impl ProjectGraph {
    /// Parses a project from text. `path` is used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, TargetsError> {
        let mut root = pbxproj::parse(text, path)?;
        // Keep the slot so the key stays in place when written back.
        let objects = root
            .get_mut("objects")
            .map(|slot| std::mem::replace(slot, PbxValue::Array(Vec::new())));
        let Some(PbxValue::Object(objects)) = objects else {
            return Err(TargetsError::MalformedGraph(
                "missing 'objects' dictionary".to_string(),
            ));
        };

        let mut arena = IndexMap::with_capacity(objects.len());
        for (id, object) in objects {
            let PbxValue::Object(props) = object else {
                return Err(TargetsError::MalformedGraph(format!(
                    "object {id} is not a dictionary"
                )));
            };
            arena.insert(ObjectId(id), PbxObject { props });
        }

        let graph = Self {
            root,
            objects: arena,
        };
        graph.root_project()?;
        Ok(graph)
    }

    /// Reads and parses `project.pbxproj` from disk.
    pub fn load(path: &Path) -> Result<Self, TargetsError> {
        let text = fs::read_to_string(path).map_err(|e| TargetsError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Serializes the graph in Xcode's layout.
    pub fn to_pbxproj(&self) -> String {
        let objects: IndexMap<String, PbxValue> = self
            .objects
            .iter()
            .map(|(id, object)| (id.0.clone(), PbxValue::Object(object.props.clone())))
            .collect();
        let mut root = self.root.clone();
        root.insert("objects".to_string(), PbxValue::Object(objects));
        pbxproj::write(&root)
    }

    /// Writes the graph to disk when its serialized form differs from the file.
    /// Returns whether the file changed.
    pub fn save(&self, path: &Path) -> Result<bool, TargetsError> {
        let text = self.to_pbxproj();
        if fs::read_to_string(path).map(|existing| existing == text).unwrap_or(false) {
            return Ok(false);
        }
        fs::write(path, text).map_err(|e| TargetsError::io(path, e))?;
        Ok(true)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&PbxObject> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn object_mut(&mut self, id: &ObjectId) -> Result<&mut PbxObject, TargetsError> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| TargetsError::MalformedGraph(format!("dangling reference {id}")))
    }

    /// Id of the `PBXProject` object named by `rootObject`.
    pub fn root_project(&self) -> Result<ObjectId, TargetsError> {
        let id = self
            .root
            .get("rootObject")
            .and_then(PbxValue::as_str)
            .map(ObjectId::new)
            .ok_or_else(|| TargetsError::MalformedGraph("missing rootObject".to_string()))?;
        match self.objects.get(&id) {
            Some(object) if object.isa() == "PBXProject" => Ok(id),
            _ => Err(TargetsError::MalformedGraph(format!(
                "rootObject {id} is not a PBXProject"
            ))),
        }
    }

    /// The project's top-level group.
    pub fn main_group(&self) -> Result<ObjectId, TargetsError> {
        let project = self.root_project()?;
        self.objects
            .get(&project)
            .and_then(|p| p.str("mainGroup"))
            .map(ObjectId::new)
            .filter(|id| self.objects.contains_key(id))
            .ok_or_else(|| TargetsError::MalformedGraph("project has no mainGroup".to_string()))
    }

    /// All native targets, in arena order.
    pub fn native_targets(&self) -> Vec<NativeTargetNode> {
        self.objects
            .keys()
            .filter_map(|id| self.native_target(id))
            .collect()
    }

    pub fn native_target(&self, id: &ObjectId) -> Option<NativeTargetNode> {
        let object = self.objects.get(id)?;
        if object.isa() != "PBXNativeTarget" {
            return None;
        }
        Some(NativeTargetNode {
            id: id.clone(),
            name: object.str("name").unwrap_or_default().to_string(),
            product_type: object.str("productType").map(str::to_string),
            build_configuration_list: object.str("buildConfigurationList").map(ObjectId::new),
            build_phases: object.ids("buildPhases"),
        })
    }

    /// Finds the native target whose `name` equals `name`.
    pub fn find_native_target_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.isa() == "PBXNativeTarget" && object.str("name") == Some(name))
            .map(|(id, _)| id.clone())
    }

    pub fn set_product_type(&mut self, target: &ObjectId, product_type: &str) -> Result<bool, TargetsError> {
        Ok(self.object_mut(target)?.set_str("productType", product_type))
    }

    /// Build configurations (`XCBuildConfiguration`) of a target.
    pub fn build_configurations(&self, target: &ObjectId) -> Vec<ObjectId> {
        self.native_target(target)
            .and_then(|node| node.build_configuration_list)
            .and_then(|list| self.objects.get(&list))
            .map(|list| list.ids("buildConfigurations"))
            .unwrap_or_default()
    }

    /// Sets a build setting on every configuration of the target.
    ///
    /// Returns the number of configurations whose value changed.
    pub fn set_build_setting(
        &mut self,
        target: &ObjectId,
        key: &str,
        value: &str,
    ) -> Result<usize, TargetsError> {
        let configurations = self.build_configurations(target);
        if configurations.is_empty() {
            return Err(TargetsError::MalformedGraph(format!(
                "target {target} has no build configurations"
            )));
        }
        let mut changed = 0;
        for id in configurations {
            let config = self.object_mut(&id)?;
            let settings = config
                .props
                .entry("buildSettings".to_string())
                .or_insert_with(|| PbxValue::Object(IndexMap::new()));
            let PbxValue::Object(settings) = settings else {
                return Err(TargetsError::MalformedGraph(format!(
                    "buildSettings of {id} is not a dictionary"
                )));
            };
            if settings.get(key).and_then(PbxValue::as_str) != Some(value) {
                settings.insert(key.to_string(), PbxValue::string(value));
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Reads a build setting from the target's first configuration.
    pub fn build_setting(&self, target: &ObjectId, key: &str) -> Option<&str> {
        let first = self.build_configurations(target).into_iter().next()?;
        self.objects
            .get(&first)?
            .get("buildSettings")?
            .as_object()?
            .get(key)?
            .as_str()
    }

    /// Child group of `parent` whose name (or path) is `name`.
    pub fn find_child_group(&self, parent: &ObjectId, name: &str) -> Option<ObjectId> {
        self.objects.get(parent)?.ids("children").into_iter().find(|id| {
            self.objects.get(id).is_some_and(|child| {
                child.isa() == "PBXGroup"
                    && (child.str("name") == Some(name)
                        || (child.str("name").is_none() && child.str("path") == Some(name)))
            })
        })
    }

    /// Returns the child group named `name` under `parent`, creating it with
    /// `path = name` when absent. The flag reports whether it was created.
    pub fn ensure_group(&mut self, parent: &ObjectId, name: &str) -> Result<(ObjectId, bool), TargetsError> {
        if let Some(existing) = self.find_child_group(parent, name) {
            return Ok((existing, false));
        }
        let group = PbxObject::new("PBXGroup")
            .with("children", PbxValue::Array(Vec::new()))
            .with("path", PbxValue::string(name))
            .with("sourceTree", PbxValue::string("<group>"));
        let id = self.insert(group);
        self.object_mut(parent)?.push_id("children", &id);
        Ok((id, true))
    }

    /// Whether any file reference directly under `group` has this path.
    pub fn group_contains_path(&self, group: &ObjectId, path: &str) -> bool {
        let Some(group) = self.objects.get(group) else {
            return false;
        };
        group.ids("children").iter().any(|id| {
            self.objects.get(id).is_some_and(|child| {
                child.isa() == "PBXFileReference"
                    && (child.str("path") == Some(path) || child.str("name") == Some(path))
            })
        })
    }

    /// The target's `PBXResourcesBuildPhase`, appended to its build phases when
    /// missing.
    pub fn ensure_resources_phase(&mut self, target: &ObjectId) -> Result<ObjectId, TargetsError> {
        let node = self
            .native_target(target)
            .ok_or_else(|| TargetsError::MalformedGraph(format!("{target} is not a native target")))?;
        let existing = node.build_phases.iter().find(|id| {
            self.objects
                .get(*id)
                .is_some_and(|phase| phase.isa() == "PBXResourcesBuildPhase")
        });
        if let Some(phase) = existing {
            return Ok(phase.clone());
        }
        let phase = PbxObject::new("PBXResourcesBuildPhase")
            .with("buildActionMask", PbxValue::string("2147483647"))
            .with("files", PbxValue::Array(Vec::new()))
            .with("runOnlyForDeploymentPostprocessing", PbxValue::string("0"));
        let id = self.insert(phase);
        self.object_mut(target)?.push_id("buildPhases", &id);
        Ok(id)
    }

    /// Adds a file reference for `path` under `group` and a build file for it in
    /// the target's resources phase. Returns the file reference id.
    pub fn add_resource(
        &mut self,
        target: &ObjectId,
        group: &ObjectId,
        path: &str,
        file_type: &str,
    ) -> Result<ObjectId, TargetsError> {
        let phase = self.ensure_resources_phase(target)?;
        let file_ref = self.insert(
            PbxObject::new("PBXFileReference")
                .with("lastKnownFileType", PbxValue::string(file_type))
                .with("path", PbxValue::string(path))
                .with("sourceTree", PbxValue::string("<group>")),
        );
        self.object_mut(group)?.push_id("children", &file_ref);
        let build_file = self.insert(
            PbxObject::new("PBXBuildFile").with("fileRef", PbxValue::string(file_ref.as_str())),
        );
        self.object_mut(&phase)?.push_id("files", &build_file);
        Ok(file_ref)
    }

    fn insert(&mut self, object: PbxObject) -> ObjectId {
        let id = self.generate_id();
        self.objects.insert(id.clone(), object);
        id
    }

    /// A fresh 24-character uppercase hex id not yet used in this graph.
    fn generate_id(&self) -> ObjectId {
        loop {
            let raw = Uuid::new_v4().simple().to_string().to_uppercase();
            let id = ObjectId(raw[..24].to_string());
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
    }
}
