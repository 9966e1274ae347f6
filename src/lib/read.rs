//! Reads the typed [`Project`] model from document text.
//!
//! Values are trimmed, unknown elements are skipped, and property maps are
//! collected into an [`OrderedKeyMap`] so their source order is discarded.

use crate::model::{
  Build, Dependency, DependencyManagement, Exclusion, PROJECT_TAG, Parent, Plugin,
  PluginManagement, Project,
};
use crate::ordered::OrderedKeyMap;
use crate::parse::{ParseError, parse_document};
use crate::tree::Element;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Parses `text` into a [`Project`].
pub fn parse_project(text: &str) -> Result<Project, ParseError> {
  let document = parse_document(text)?;
  let root = &document.root;

  if root.name != PROJECT_TAG {
    return Err(ParseError::UnexpectedRoot(root.name.clone()));
  }

  let project = read_project(&Fields::new(root, PROJECT_TAG.to_string()))?;

  #[cfg(feature = "tracing")]
  debug!(
    "Read project with {} dependencies and {} properties",
    project.dependencies.len(),
    project.properties.len()
  );

  Ok(project)
}

/// Child elements of one record.
struct Fields<'e> {
  element: &'e Element,
  path: String,
}

impl<'e> Fields<'e> {
  fn new(element: &'e Element, path: String) -> Self {
    Self { element, path }
  }

  /// The single child named `tag`; a modelled tag may not repeat.
  fn child(&self, tag: &str) -> Result<Option<&'e Element>, ParseError> {
    let mut matches = self.element.child_elements().filter(|child| child.name == tag);
    let first = matches.next();
    if matches.next().is_some() {
      return Err(ParseError::DuplicateTag {
        path: self.path.clone(),
        tag: tag.to_string(),
      });
    }
    Ok(first)
  }

  fn child_path(&self, tag: &str) -> String {
    format!("{}/{}", self.path, tag)
  }

  fn text(&self, tag: &str) -> Result<Option<String>, ParseError> {
    self
      .child(tag)?
      .map(|child| read_text(child, &self.child_path(tag)))
      .transpose()
  }

  fn required_text(&self, tag: &'static str) -> Result<Option<String>, ParseError> {
    match self.text(tag)? {
      Some(value) => Ok(Some(value)),
      None => Err(ParseError::MissingField {
        path: self.path.clone(),
        tag,
      }),
    }
  }

  fn record<T>(
    &self,
    tag: &str,
    read: impl Fn(&Fields<'e>) -> Result<T, ParseError>,
  ) -> Result<Option<T>, ParseError> {
    match self.child(tag)? {
      Some(child) => Ok(Some(read(&Fields::new(child, self.child_path(tag)))?)),
      None => Ok(None),
    }
  }

  fn list<T>(
    &self,
    tag: &str,
    item: &str,
    read: impl Fn(&Fields<'e>) -> Result<T, ParseError>,
  ) -> Result<Vec<T>, ParseError> {
    let Some(container) = self.child(tag)? else {
      return Ok(Vec::new());
    };

    container
      .child_elements()
      .filter(|child| child.name == item)
      .enumerate()
      .map(|(index, child)| {
        let path = format!("{}/{}[{}]", self.child_path(tag), item, index);
        read(&Fields::new(child, path))
      })
      .collect()
  }

  fn text_list(&self, tag: &str, item: &str) -> Result<Vec<String>, ParseError> {
    let Some(container) = self.child(tag)? else {
      return Ok(Vec::new());
    };

    container
      .child_elements()
      .filter(|child| child.name == item)
      .enumerate()
      .map(|(index, child)| {
        read_text(
          child,
          &format!("{}/{}[{}]", self.child_path(tag), item, index),
        )
      })
      .collect()
  }

  fn properties(&self, tag: &str) -> Result<OrderedKeyMap, ParseError> {
    let mut map = OrderedKeyMap::new();
    let Some(container) = self.child(tag)? else {
      return Ok(map);
    };

    let path = self.child_path(tag);
    for child in container.child_elements() {
      let value = read_text(child, &format!("{}/{}", path, child.name))?;

      #[cfg(feature = "tracing")]
      trace!("Read property {}={}", child.name, value);

      if map.insert(child.name.clone(), value).is_some() {
        return Err(ParseError::DuplicateTag {
          path,
          tag: child.name.clone(),
        });
      }
    }
    Ok(map)
  }
}

fn read_text(element: &Element, path: &str) -> Result<String, ParseError> {
  if element.has_child_elements() {
    return Err(ParseError::UnexpectedChildren {
      path: path.to_string(),
    });
  }
  Ok(element.text().trim().to_string())
}

fn read_project(fields: &Fields<'_>) -> Result<Project, ParseError> {
  Ok(Project {
    model_version: fields.text("modelVersion")?,
    parent: fields.record("parent", read_parent)?,
    group_id: fields.text("groupId")?,
    artifact_id: fields.text("artifactId")?,
    version: fields.text("version")?,
    packaging: fields.text("packaging")?,
    name: fields.text("name")?,
    description: fields.text("description")?,
    url: fields.text("url")?,
    modules: fields.text_list("modules", "module")?,
    properties: fields.properties("properties")?,
    dependency_management: fields.record("dependencyManagement", |fields| {
      Ok(DependencyManagement {
        dependencies: fields.list("dependencies", "dependency", read_dependency)?,
      })
    })?,
    dependencies: fields.list("dependencies", "dependency", read_dependency)?,
    build: fields.record("build", read_build)?,
    pom_file: None,
  })
}

fn read_parent(fields: &Fields<'_>) -> Result<Parent, ParseError> {
  Ok(Parent {
    group_id: fields.text("groupId")?,
    artifact_id: fields.text("artifactId")?,
    version: fields.text("version")?,
    relative_path: fields.text("relativePath")?,
  })
}

fn read_dependency(fields: &Fields<'_>) -> Result<Dependency, ParseError> {
  Ok(Dependency {
    group_id: fields.text("groupId")?,
    artifact_id: fields.required_text("artifactId")?,
    version: fields.text("version")?,
    type_: fields.text("type")?,
    classifier: fields.text("classifier")?,
    scope: fields.text("scope")?,
    exclusions: fields.list("exclusions", "exclusion", |fields| {
      Ok(Exclusion {
        group_id: fields.text("groupId")?,
        artifact_id: fields.required_text("artifactId")?,
      })
    })?,
    optional: fields.text("optional")?,
  })
}

fn read_build(fields: &Fields<'_>) -> Result<Build, ParseError> {
  Ok(Build {
    final_name: fields.text("finalName")?,
    plugin_management: fields.record("pluginManagement", |fields| {
      Ok(PluginManagement {
        plugins: fields.list("plugins", "plugin", read_plugin)?,
      })
    })?,
    plugins: fields.list("plugins", "plugin", read_plugin)?,
  })
}

fn read_plugin(fields: &Fields<'_>) -> Result<Plugin, ParseError> {
  Ok(Plugin {
    group_id: fields.text("groupId")?,
    artifact_id: fields.required_text("artifactId")?,
    version: fields.text("version")?,
    dependencies: fields.list("dependencies", "dependency", read_dependency)?,
  })
}
