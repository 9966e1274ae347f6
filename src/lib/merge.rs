//! Overlays one project model onto another.
//!
//! Policies per field kind:
//!
//! - scalars: the source value wins when it is present and non-empty;
//! - nested records: merged recursively, cloned when the target lacks them;
//! - lists: source items whose identity key matches a target item are merged
//!   into it, the rest are appended in source order;
//! - property maps: key union, source entries win.
//!
//! The source is never modified.

use crate::model::{
  Build, Dependency, DependencyManagement, Exclusion, Parent, Plugin, PluginManagement, Project,
};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Merges `source` into `target` and returns `target`.
pub fn merge<'t>(target: &'t mut Project, source: &Project) -> &'t mut Project {
  #[cfg(feature = "tracing")]
  debug!(
    "Merging {} source dependencies into {} target dependencies",
    source.dependencies.len(),
    target.dependencies.len()
  );

  target.merge_from(source);
  target
}

/// Field-wise overlay of `source` onto `self`.
pub trait Merge {
  fn merge_from(&mut self, source: &Self);
}

/// Identity used to match list items across models.
pub trait Identity {
  fn identity(&self) -> String;
}

impl Identity for Dependency {
  fn identity(&self) -> String {
    self.management_key()
  }
}

impl Identity for Plugin {
  fn identity(&self) -> String {
    self.key()
  }
}

impl Identity for Exclusion {
  fn identity(&self) -> String {
    self.key()
  }
}

impl Identity for String {
  fn identity(&self) -> String {
    self.clone()
  }
}

fn merge_scalar(target: &mut Option<String>, source: &Option<String>) {
  if let Some(value) = source
    && !value.is_empty()
  {
    *target = Some(value.clone());
  }
}

fn merge_record<T: Merge + Clone>(target: &mut Option<T>, source: &Option<T>) {
  match (target.as_mut(), source) {
    (Some(target), Some(source)) => target.merge_from(source),
    (None, Some(source)) => *target = Some(source.clone()),
    (_, None) => {}
  }
}

fn merge_list<T: Merge + Identity + Clone>(target: &mut Vec<T>, source: &[T]) {
  for item in source {
    let identity = item.identity();
    match target.iter_mut().find(|existing| existing.identity() == identity) {
      Some(existing) => {
        #[cfg(feature = "tracing")]
        trace!("Merging {} in place", identity);

        existing.merge_from(item);
      }
      None => {
        #[cfg(feature = "tracing")]
        trace!("Appending {}", identity);

        target.push(item.clone());
      }
    }
  }
}

impl Merge for String {
  fn merge_from(&mut self, _source: &Self) {}
}

impl Merge for Project {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.model_version, &source.model_version);
    merge_record(&mut self.parent, &source.parent);
    merge_scalar(&mut self.group_id, &source.group_id);
    merge_scalar(&mut self.artifact_id, &source.artifact_id);
    merge_scalar(&mut self.version, &source.version);
    merge_scalar(&mut self.packaging, &source.packaging);
    merge_scalar(&mut self.name, &source.name);
    merge_scalar(&mut self.description, &source.description);
    merge_scalar(&mut self.url, &source.url);
    merge_list(&mut self.modules, &source.modules);
    self.properties.union_from(&source.properties);
    merge_record(&mut self.dependency_management, &source.dependency_management);
    merge_list(&mut self.dependencies, &source.dependencies);
    merge_record(&mut self.build, &source.build);
  }
}

impl Merge for Parent {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.group_id, &source.group_id);
    merge_scalar(&mut self.artifact_id, &source.artifact_id);
    merge_scalar(&mut self.version, &source.version);
    merge_scalar(&mut self.relative_path, &source.relative_path);
  }
}

impl Merge for DependencyManagement {
  fn merge_from(&mut self, source: &Self) {
    merge_list(&mut self.dependencies, &source.dependencies);
  }
}

impl Merge for Dependency {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.group_id, &source.group_id);
    merge_scalar(&mut self.artifact_id, &source.artifact_id);
    merge_scalar(&mut self.version, &source.version);
    merge_scalar(&mut self.type_, &source.type_);
    merge_scalar(&mut self.classifier, &source.classifier);
    merge_scalar(&mut self.scope, &source.scope);
    merge_list(&mut self.exclusions, &source.exclusions);
    merge_scalar(&mut self.optional, &source.optional);
  }
}

impl Merge for Exclusion {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.group_id, &source.group_id);
    merge_scalar(&mut self.artifact_id, &source.artifact_id);
  }
}

impl Merge for Build {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.final_name, &source.final_name);
    merge_record(&mut self.plugin_management, &source.plugin_management);
    merge_list(&mut self.plugins, &source.plugins);
  }
}

impl Merge for PluginManagement {
  fn merge_from(&mut self, source: &Self) {
    merge_list(&mut self.plugins, &source.plugins);
  }
}

impl Merge for Plugin {
  fn merge_from(&mut self, source: &Self) {
    merge_scalar(&mut self.group_id, &source.group_id);
    merge_scalar(&mut self.artifact_id, &source.artifact_id);
    merge_scalar(&mut self.version, &source.version);
    merge_list(&mut self.dependencies, &source.dependencies);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  #[test]
  fn test_scalar_overwrite_keeps_target_only_fields() {
    let mut target = Project {
      name: Some("Y".to_string()),
      description: Some("D".to_string()),
      ..Project::default()
    };
    let source = Project {
      name: Some("X".to_string()),
      description: Some(String::new()),
      ..Project::default()
    };

    merge(&mut target, &source);

    assert_eq!(target.name.as_deref(), Some("X"));
    assert_eq!(target.description.as_deref(), Some("D"));
  }

  #[test]
  fn test_list_merges_matching_identity_and_appends_new() {
    let mut target = Project::default();
    target
      .dependencies
      .push(Dependency::new("org.example", "lib", Some("1.0")));
    target
      .dependencies
      .push(Dependency::new("org.example", "other", None));

    let mut source = Project::default();
    let mut updated = Dependency::new("org.example", "lib", Some("2.0"));
    updated.scope = Some("test".to_string());
    source.dependencies.push(updated);
    source
      .dependencies
      .push(Dependency::new("org.example", "fresh", Some("3.0")));

    merge(&mut target, &source);

    assert_eq!(target.dependencies.len(), 3);
    assert_eq!(target.dependencies[0].version.as_deref(), Some("2.0"));
    assert_eq!(target.dependencies[0].scope.as_deref(), Some("test"));
    assert_eq!(target.dependencies[1].artifact_id.as_deref(), Some("other"));
    assert_eq!(target.dependencies[2].artifact_id.as_deref(), Some("fresh"));
  }

  #[test]
  fn test_classifier_makes_distinct_identity() {
    let mut target = Project::default();
    target.dependencies.push(Dependency::new("g", "a", Some("1")));

    let mut source = Project::default();
    let mut tests_jar = Dependency::new("g", "a", Some("1"));
    tests_jar.classifier = Some("tests".to_string());
    source.dependencies.push(tests_jar);

    merge(&mut target, &source);
    assert_eq!(target.dependencies.len(), 2);
  }

  #[test]
  fn test_properties_union_sorted() {
    let mut target = Project::default();
    target.properties.insert("z", "1");
    target.properties.insert("shared", "target");

    let mut source = Project::default();
    source.properties.insert("a", "2");
    source.properties.insert("shared", "source");

    merge(&mut target, &source);

    let entries: Vec<_> = target.properties.iter().collect();
    assert_eq!(entries, vec![("a", "2"), ("shared", "source"), ("z", "1")]);
  }

  #[test]
  fn test_nested_records_merge_or_clone() {
    let mut target = Project {
      parent: Some(Parent {
        group_id: Some("g".to_string()),
        version: Some("1".to_string()),
        ..Parent::default()
      }),
      ..Project::default()
    };
    let source = Project {
      parent: Some(Parent {
        version: Some("2".to_string()),
        ..Parent::default()
      }),
      build: Some(Build {
        plugins: vec![Plugin::new(None, "maven-surefire-plugin", Some("3.0"))],
        ..Build::default()
      }),
      ..Project::default()
    };

    merge(&mut target, &source);

    let parent = target.parent.as_ref().unwrap();
    assert_eq!(parent.group_id.as_deref(), Some("g"));
    assert_eq!(parent.version.as_deref(), Some("2"));
    assert_eq!(target.build, source.build);
  }

  #[test]
  fn test_plugin_default_group_matches_explicit_group() {
    let mut target = Project {
      build: Some(Build {
        plugins: vec![Plugin::new(None, "maven-jar-plugin", Some("1"))],
        ..Build::default()
      }),
      ..Project::default()
    };
    let source = Project {
      build: Some(Build {
        plugins: vec![Plugin::new(
          Some("org.apache.maven.plugins"),
          "maven-jar-plugin",
          Some("2"),
        )],
        ..Build::default()
      }),
      ..Project::default()
    };

    merge(&mut target, &source);

    let plugins = &target.build.as_ref().unwrap().plugins;
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].version.as_deref(), Some("2"));
  }

  #[test]
  fn test_repeated_merges_accumulate() {
    let mut target = Project::default();
    let first = Project {
      modules: vec!["core".to_string()],
      ..Project::default()
    };
    let second = Project {
      modules: vec!["core".to_string(), "cli".to_string()],
      ..Project::default()
    };

    merge(&mut target, &first);
    merge(&mut target, &second);

    assert_eq!(target.modules, vec!["core", "cli"]);
  }

  #[test]
  fn test_source_path_is_not_taken() {
    let mut target = Project {
      pom_file: Some(PathBuf::from("target/pom.xml")),
      ..Project::default()
    };
    let source = Project {
      pom_file: Some(PathBuf::from("source/pom.xml")),
      ..Project::default()
    };

    merge(&mut target, &source);
    assert_eq!(target.pom_file, Some(PathBuf::from("target/pom.xml")));
  }
}
