//! Reading, merging and writing POM files.
//!
//! Writing an existing file never re-renders it from scratch: the original
//! text is parsed into a formatting-preserving tree, the model is reconciled
//! into that tree and the tree is written back verbatim. Only a missing or
//! empty target gets a freshly laid-out document.
//!
//! Output is staged in a temporary file next to the target and moved over it
//! once complete, so a failed write never leaves a truncated file behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pom_sync::sync::{PomSync, PomSyncOptions};
//! use std::path::PathBuf;
//!
//! let options = PomSyncOptions {
//!     target_file: PathBuf::from("pom.xml"),
//!     source_file: PathBuf::from("template/pom.xml"),
//!     style: Default::default(),
//! };
//!
//! PomSync::sync_with_options(options).unwrap();
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::merge::merge;
use crate::model::Project;
use crate::parse::{ParseError, parse_document};
use crate::read::parse_project;
use crate::reconcile::{ReconcileError, Reconciler};
use crate::serialize::{Style, render_model};

const STREAM_ORIGIN: &str = "<stream>";

/// Entry points for reading and writing project models.
pub struct PomSync;

impl PomSync {
  /// Reads the model stored at `path` and remembers the path on it.
  pub fn read_model(path: impl AsRef<Path>) -> Result<Project, PomSyncError> {
    let path = path.as_ref();

    #[cfg(feature = "tracing")]
    debug!(?path, "Reading model");

    let text = fs::read_to_string(path).map_err(|source| PomSyncError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let mut project = parse_project(&text).map_err(|source| PomSyncError::Malformed {
      origin: path.display().to_string(),
      source,
    })?;
    project.pom_file = Some(path.to_path_buf());
    Ok(project)
  }

  /// Reads a model from any stream. The result has no recorded path.
  pub fn read_model_from<R: Read>(mut reader: R) -> Result<Project, PomSyncError> {
    let mut text = String::new();
    reader
      .read_to_string(&mut text)
      .map_err(|source| PomSyncError::Read {
        path: PathBuf::from(STREAM_ORIGIN),
        source,
      })?;

    parse_project(&text).map_err(|source| PomSyncError::Malformed {
      origin: STREAM_ORIGIN.to_string(),
      source,
    })
  }

  /// Writes `model` back to the file it was read from.
  pub fn write_model(model: &Project) -> Result<(), PomSyncError> {
    let path = model
      .pom_file
      .as_deref()
      .ok_or(PomSyncError::MissingSourcePath)?;
    Self::write_model_to(model, path)
  }

  /// Writes `model` to `path` with the default [`Style`] for fresh files.
  pub fn write_model_to(model: &Project, path: impl AsRef<Path>) -> Result<(), PomSyncError> {
    Self::write_model_with(model, path, &Style::default())
  }

  /// Writes `model` to `path`.
  ///
  /// A missing or empty file is rendered fresh using `style`. Anything else
  /// is reconciled in place and keeps its own formatting.
  pub fn write_model_with(
    model: &Project,
    path: impl AsRef<Path>,
    style: &Style,
  ) -> Result<(), PomSyncError> {
    let path = path.as_ref();
    let content = Self::render(model, path, style)?;
    Self::persist(path, &content)?;

    #[cfg(feature = "tracing")]
    info!(?path, "Model written");

    Ok(())
  }

  /// Reads the model at `path`, or starts a new one there when the file is
  /// missing or blank.
  pub fn read_model_or_new(path: impl AsRef<Path>) -> Result<Project, PomSyncError> {
    let path = path.as_ref();

    let mut project = match Self::read_existing(path)? {
      Some(text) => parse_project(&text).map_err(|source| PomSyncError::Malformed {
        origin: path.display().to_string(),
        source,
      })?,
      None => {
        #[cfg(feature = "tracing")]
        debug!(?path, "No prior content, starting a new model");

        Project::default()
      }
    };
    project.pom_file = Some(path.to_path_buf());
    Ok(project)
  }

  /// Merges `source` into `target`; see [`crate::merge`] for the policies.
  pub fn merge<'t>(target: &'t mut Project, source: &Project) -> &'t mut Project {
    merge(target, source)
  }

  /// Merges the source file into the target file, in place.
  pub fn sync_with_options(options: PomSyncOptions) -> Result<(), PomSyncError> {
    #[cfg(feature = "tracing")]
    info!("Starting pom sync");

    let PomSyncOptions {
      target_file,
      source_file,
      style,
    } = options;

    #[cfg(feature = "tracing")]
    debug!(?target_file, ?source_file, "Resolved file paths");

    if !source_file.exists() {
      return Err(PomSyncError::SourceNotFound(source_file));
    }

    let mut target = Self::read_model(&target_file)?;
    let source = Self::read_model(&source_file)?;

    merge(&mut target, &source);

    Self::write_model_with(&target, &target_file, &style)?;

    #[cfg(feature = "tracing")]
    info!("Sync completed successfully");

    Ok(())
  }

  /// Produces the complete new content for `path`.
  fn render(model: &Project, path: &Path, style: &Style) -> Result<String, PomSyncError> {
    let reconcile_error = |source: ReconcileError| PomSyncError::Reconcile {
      path: path.to_path_buf(),
      source,
    };

    let Some(existing) = Self::read_existing(path)? else {
      #[cfg(feature = "tracing")]
      debug!(?path, "No prior content, rendering fresh document");

      return render_model(model, style).map_err(reconcile_error);
    };

    let mut document = parse_document(&existing).map_err(|source| PomSyncError::Malformed {
      origin: path.display().to_string(),
      source,
    })?;
    Reconciler::detect(&document, style)
      .reconcile(model, &mut document)
      .map_err(reconcile_error)?;

    Ok(document.to_string())
  }

  /// Content of `path`, or `None` when it is missing or only whitespace.
  fn read_existing(path: &Path) -> Result<Option<String>, PomSyncError> {
    match fs::read_to_string(path) {
      Ok(text) if text.trim().is_empty() => Ok(None),
      Ok(text) => Ok(Some(text)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(PomSyncError::Read {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  /// Replaces `path` with `content` through a temporary file in the same
  /// directory.
  fn persist(path: &Path, content: &str) -> Result<(), PomSyncError> {
    let write_error = |source: io::Error| PomSyncError::Write {
      path: path.to_path_buf(),
      source,
    };

    let directory = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory).map_err(write_error)?;
    staged.write_all(content.as_bytes()).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;

    // A new target takes the mode a plain create would give it.
    let metadata = match fs::metadata(path) {
      Ok(metadata) => metadata,
      Err(err) if err.kind() == io::ErrorKind::NotFound => fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|file| file.metadata())
        .map_err(write_error)?,
      Err(err) => return Err(write_error(err)),
    };
    staged
      .as_file()
      .set_permissions(metadata.permissions())
      .map_err(write_error)?;

    staged
      .persist(path)
      .map_err(|err| write_error(err.error))?;
    Ok(())
  }
}

/// Errors that can occur while reading, reconciling or writing a model.
#[derive(Debug, thiserror::Error)]
pub enum PomSyncError {
  /// The file or stream could not be read
  #[error("Failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  /// The output could not be written
  #[error("Failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  /// The input is not well-formed or violates the schema
  #[error("Malformed document {origin}: {source}")]
  Malformed {
    origin: String,
    #[source]
    source: ParseError,
  },
  /// The existing document cannot take the model's shape
  #[error("Cannot reconcile {path}: {source}")]
  Reconcile {
    path: PathBuf,
    #[source]
    source: ReconcileError,
  },
  /// `write_model` was called on a model that was not read from a file
  #[error("Model has no source path to write to")]
  MissingSourcePath,
  /// The merge source does not exist
  #[error("Source file not found: {0}")]
  SourceNotFound(PathBuf),
}

/// Configuration options for merging one POM file into another.
pub struct PomSyncOptions {
  /// File that receives the merge and is rewritten in place.
  pub target_file: PathBuf,
  /// File whose values are overlaid onto the target.
  pub source_file: PathBuf,
  /// Layout used if the target turns out to be empty.
  pub style: Style,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_write_without_source_path() {
    let result = PomSync::write_model(&Project::default());
    assert!(matches!(result, Err(PomSyncError::MissingSourcePath)));
  }

  #[test]
  fn test_source_not_found() {
    let options = PomSyncOptions {
      target_file: PathBuf::from("pom.xml"),
      source_file: PathBuf::from("nonexistent-source-pom.xml"),
      style: Style::default(),
    };

    match PomSync::sync_with_options(options).unwrap_err() {
      PomSyncError::SourceNotFound(path) => {
        assert_eq!(path, PathBuf::from("nonexistent-source-pom.xml"));
      }
      other => panic!("Expected SourceNotFound error, got {:?}", other),
    }
  }

  #[test]
  fn test_read_or_new_treats_blank_file_as_new() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let blank = temp_dir.path().join("blank.xml");
    fs::write(&blank, "  \n\t\n").unwrap();
    let missing = temp_dir.path().join("missing.xml");

    for path in [blank, missing] {
      let project = PomSync::read_model_or_new(&path).unwrap();
      assert_eq!(project.pom_file.as_deref(), Some(path.as_path()));
      assert_eq!(
        Project {
          pom_file: None,
          ..project
        },
        Project::default()
      );
    }
  }

  #[test]
  fn test_read_from_stream() {
    let text = "<project><artifactId>streamed</artifactId></project>";
    let project = PomSync::read_model_from(text.as_bytes()).unwrap();

    assert_eq!(project.artifact_id.as_deref(), Some("streamed"));
    assert_eq!(project.pom_file, None);
  }

  #[test]
  fn test_malformed_stream() {
    let result = PomSync::read_model_from("<project>".as_bytes());
    match result.unwrap_err() {
      PomSyncError::Malformed { origin, source } => {
        assert_eq!(origin, STREAM_ORIGIN);
        assert!(matches!(source, ParseError::Syntax { .. }));
      }
      other => panic!("Expected Malformed error, got {:?}", other),
    }
  }
}
