//! Typed project model.
//!
//! Each record lists its fields in canonical schema order through
//! [`Record::fields`]. The reconciler and the fresh-document writer walk that
//! view instead of knowing about individual record types.

use std::path::PathBuf;

use crate::ordered::OrderedKeyMap;

pub const PROJECT_TAG: &str = "project";
pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const POM_SCHEMA_LOCATION: &str =
  "http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd";

const DEFAULT_DEPENDENCY_TYPE: &str = "jar";
const DEFAULT_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Project {
  pub model_version: Option<String>,
  pub parent: Option<Parent>,
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
  pub version: Option<String>,
  pub packaging: Option<String>,
  pub name: Option<String>,
  pub description: Option<String>,
  pub url: Option<String>,
  pub modules: Vec<String>,
  pub properties: OrderedKeyMap,
  pub dependency_management: Option<DependencyManagement>,
  pub dependencies: Vec<Dependency>,
  pub build: Option<Build>,
  /// File this model was read from, if any.
  pub pom_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parent {
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
  pub version: Option<String>,
  pub relative_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyManagement {
  pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dependency {
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
  pub version: Option<String>,
  pub type_: Option<String>,
  pub classifier: Option<String>,
  pub scope: Option<String>,
  pub exclusions: Vec<Exclusion>,
  pub optional: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Exclusion {
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Build {
  pub final_name: Option<String>,
  pub plugin_management: Option<PluginManagement>,
  pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PluginManagement {
  pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plugin {
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
  pub version: Option<String>,
  pub dependencies: Vec<Dependency>,
}

impl Project {
  /// Convenience constructor used when creating a model from scratch.
  pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
    Self {
      model_version: Some("4.0.0".to_string()),
      group_id: Some(group_id.to_string()),
      artifact_id: Some(artifact_id.to_string()),
      version: Some(version.to_string()),
      ..Self::default()
    }
  }
}

impl Dependency {
  pub fn new(group_id: &str, artifact_id: &str, version: Option<&str>) -> Self {
    Self {
      group_id: Some(group_id.to_string()),
      artifact_id: Some(artifact_id.to_string()),
      version: version.map(str::to_string),
      ..Self::default()
    }
  }

  /// `groupId:artifactId:type:classifier`, with `type` defaulting to `jar`.
  pub fn management_key(&self) -> String {
    format!(
      "{}:{}:{}:{}",
      self.group_id.as_deref().unwrap_or_default(),
      self.artifact_id.as_deref().unwrap_or_default(),
      self.type_.as_deref().unwrap_or(DEFAULT_DEPENDENCY_TYPE),
      self.classifier.as_deref().unwrap_or_default()
    )
  }
}

impl Exclusion {
  pub fn key(&self) -> String {
    format!(
      "{}:{}",
      self.group_id.as_deref().unwrap_or_default(),
      self.artifact_id.as_deref().unwrap_or_default()
    )
  }
}

impl Plugin {
  pub fn new(group_id: Option<&str>, artifact_id: &str, version: Option<&str>) -> Self {
    Self {
      group_id: group_id.map(str::to_string),
      artifact_id: Some(artifact_id.to_string()),
      version: version.map(str::to_string),
      ..Self::default()
    }
  }

  /// `groupId:artifactId`, with the Maven plugin group as default.
  pub fn key(&self) -> String {
    format!(
      "{}:{}",
      self.group_id.as_deref().unwrap_or(DEFAULT_PLUGIN_GROUP_ID),
      self.artifact_id.as_deref().unwrap_or_default()
    )
  }
}

/// A view of one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
  pub tag: &'static str,
  pub value: FieldValue<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
  Text(Option<&'a str>),
  /// `None` when the nested record is absent.
  Record(Option<Vec<Field<'a>>>),
  /// Items wrapped in a container element, each item tagged `item`.
  List {
    item: &'static str,
    items: Vec<FieldValue<'a>>,
  },
  Properties(&'a OrderedKeyMap),
}

impl FieldValue<'_> {
  /// True when the value would produce no content at all.
  pub fn is_empty(&self) -> bool {
    match self {
      FieldValue::Text(value) => value.is_none_or(str::is_empty),
      FieldValue::Record(fields) => fields
        .as_ref()
        .is_none_or(|fields| fields.iter().all(|field| field.value.is_empty())),
      FieldValue::List { items, .. } => items.is_empty(),
      FieldValue::Properties(map) => map.is_empty(),
    }
  }
}

impl<'a> Field<'a> {
  fn text(tag: &'static str, value: &'a Option<String>) -> Self {
    Self {
      tag,
      value: FieldValue::Text(value.as_deref()),
    }
  }

  fn record<R: Record>(tag: &'static str, value: Option<&'a R>) -> Self {
    Self {
      tag,
      value: FieldValue::Record(value.map(|record| record.fields())),
    }
  }

  fn records<R: Record>(tag: &'static str, item: &'static str, values: &'a [R]) -> Self {
    Self {
      tag,
      value: FieldValue::List {
        item,
        items: values
          .iter()
          .map(|value| FieldValue::Record(Some(value.fields())))
          .collect(),
      },
    }
  }

  fn texts(tag: &'static str, item: &'static str, values: &'a [String]) -> Self {
    Self {
      tag,
      value: FieldValue::List {
        item,
        items: values
          .iter()
          .map(|value| FieldValue::Text(Some(value.as_str())))
          .collect(),
      },
    }
  }

  fn properties(tag: &'static str, map: &'a OrderedKeyMap) -> Self {
    Self {
      tag,
      value: FieldValue::Properties(map),
    }
  }
}

/// A record of the model with a fixed, ordered set of fields.
pub trait Record {
  fn fields(&self) -> Vec<Field<'_>>;
}

impl Record for Project {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("modelVersion", &self.model_version),
      Field::record("parent", self.parent.as_ref()),
      Field::text("groupId", &self.group_id),
      Field::text("artifactId", &self.artifact_id),
      Field::text("version", &self.version),
      Field::text("packaging", &self.packaging),
      Field::text("name", &self.name),
      Field::text("description", &self.description),
      Field::text("url", &self.url),
      Field::texts("modules", "module", &self.modules),
      Field::properties("properties", &self.properties),
      Field::record("dependencyManagement", self.dependency_management.as_ref()),
      Field::records("dependencies", "dependency", &self.dependencies),
      Field::record("build", self.build.as_ref()),
    ]
  }
}

impl Record for Parent {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("groupId", &self.group_id),
      Field::text("artifactId", &self.artifact_id),
      Field::text("version", &self.version),
      Field::text("relativePath", &self.relative_path),
    ]
  }
}

impl Record for DependencyManagement {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![Field::records("dependencies", "dependency", &self.dependencies)]
  }
}

impl Record for Dependency {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("groupId", &self.group_id),
      Field::text("artifactId", &self.artifact_id),
      Field::text("version", &self.version),
      Field::text("type", &self.type_),
      Field::text("classifier", &self.classifier),
      Field::text("scope", &self.scope),
      Field::records("exclusions", "exclusion", &self.exclusions),
      Field::text("optional", &self.optional),
    ]
  }
}

impl Record for Exclusion {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("groupId", &self.group_id),
      Field::text("artifactId", &self.artifact_id),
    ]
  }
}

impl Record for Build {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("finalName", &self.final_name),
      Field::record("pluginManagement", self.plugin_management.as_ref()),
      Field::records("plugins", "plugin", &self.plugins),
    ]
  }
}

impl Record for PluginManagement {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![Field::records("plugins", "plugin", &self.plugins)]
  }
}

impl Record for Plugin {
  fn fields(&self) -> Vec<Field<'_>> {
    vec![
      Field::text("groupId", &self.group_id),
      Field::text("artifactId", &self.artifact_id),
      Field::text("version", &self.version),
      Field::records("dependencies", "dependency", &self.dependencies),
    ]
  }
}
