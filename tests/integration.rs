use pom_sync::model::{Dependency, Project};
use pom_sync::serialize::Style;
use pom_sync::sync::{PomSync, PomSyncError, PomSyncOptions};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const TARGET_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Keep this header -->
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>

    <groupId>org.example</groupId>
    <artifactId>target</artifactId>
    <!-- release train -->
    <version>1.0</version>

    <properties>
        <maven.compiler.release>11</maven.compiler.release>
        <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
    </properties>

    <dependencies>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.12</version>
            <scope>test</scope>
        </dependency>
    </dependencies>
</project>
"#;

const SOURCE_POM: &str = r#"<project>
  <modelVersion>4.0.0</modelVersion>
  <artifactId>source</artifactId>
  <description>Merged in</description>
  <properties>
    <zeta>last</zeta>
    <alpha>first</alpha>
    <maven.compiler.release>17</maven.compiler.release>
  </properties>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
    </dependency>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
      <version>2.0.9</version>
    </dependency>
  </dependencies>
</project>
"#;

#[test]
fn test_merge_integration() {
  let temp_dir = TempDir::new().unwrap();

  let target_path = temp_dir.path().join("pom.xml");
  let source_path = temp_dir.path().join("source-pom.xml");

  fs::write(&target_path, TARGET_POM).unwrap();
  fs::write(&source_path, SOURCE_POM).unwrap();

  let options = PomSyncOptions {
    target_file: target_path.clone(),
    source_file: source_path.clone(),
    style: Style::default(),
  };

  PomSync::sync_with_options(options).unwrap();

  let merged = fs::read_to_string(&target_path).unwrap();
  let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Keep this header -->
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>

    <groupId>org.example</groupId>
    <artifactId>source</artifactId>
    <!-- release train -->
    <version>1.0</version>
    <description>Merged in</description>

    <properties>
        <alpha>first</alpha>
        <maven.compiler.release>17</maven.compiler.release>
        <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
        <zeta>last</zeta>
    </properties>

    <dependencies>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
        </dependency>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
            <version>2.0.9</version>
        </dependency>
    </dependencies>
</project>
"#;

  assert_eq!(merged, expected);

  // the source is only read
  assert_eq!(fs::read_to_string(&source_path).unwrap(), SOURCE_POM);
}

#[test]
fn test_unmodified_model_roundtrips_byte_for_byte() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(&path, TARGET_POM).unwrap();

  let project = PomSync::read_model(&path).unwrap();
  PomSync::write_model(&project).unwrap();

  assert_eq!(fs::read_to_string(&path).unwrap(), TARGET_POM);
}

#[test]
fn test_write_is_idempotent() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(&path, TARGET_POM).unwrap();

  let mut project = PomSync::read_model(&path).unwrap();
  project.url = Some("https://example.org".to_string());
  project.properties.insert("a.first", "1");
  project
    .dependencies
    .push(Dependency::new("org.example", "extra", Some("1.0")));

  PomSync::write_model(&project).unwrap();
  let once = fs::read_to_string(&path).unwrap();
  PomSync::write_model(&project).unwrap();

  assert_eq!(fs::read_to_string(&path).unwrap(), once);
}

#[test]
fn test_unsorted_properties_normalized_on_write() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(
    &path,
    "<project>\n  <properties>\n    <z>1</z>\n    <a>2</a>\n    <m>3</m>\n  </properties>\n</project>\n",
  )
  .unwrap();

  let project = PomSync::read_model(&path).unwrap();
  PomSync::write_model(&project).unwrap();

  assert_eq!(
    fs::read_to_string(&path).unwrap(),
    "<project>\n  <properties>\n    <a>2</a>\n    <m>3</m>\n    <z>1</z>\n  </properties>\n</project>\n"
  );
}

#[test]
fn test_metadata_on_fresh_file() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("foo.pom");

  PomSync::write_model_to(&Project::default(), &path).unwrap();

  let mut project = PomSync::read_model(&path).unwrap();
  project.name = Some("my-name".to_string());
  project.description = Some("my-description".to_string());
  PomSync::write_model(&project).unwrap();

  let project = PomSync::read_model(&path).unwrap();
  assert_eq!(project.name.as_deref(), Some("my-name"));
  assert_eq!(project.description.as_deref(), Some("my-description"));
}

#[test]
fn test_empty_file_rendered_with_style() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(&path, "").unwrap();

  let project = Project::new("org.example", "fresh", "0.1.0");
  PomSync::write_model_with(&project, &path, &Style::new(4, "\n")).unwrap();

  let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>fresh</artifactId>
    <version>0.1.0</version>
</project>
"#;
  assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}

#[test]
fn test_failed_write_leaves_file_untouched() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  let original = "<project>\n  <version><odd/></version>\n</project>\n";
  fs::write(&path, original).unwrap();

  let project = Project {
    version: Some("2.0".to_string()),
    ..Project::default()
  };
  let result = PomSync::write_model_to(&project, &path);

  assert!(matches!(result, Err(PomSyncError::Reconcile { .. })));
  assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_malformed_file_reports_location() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(&path, "<project>\n  <name>oops</nmae>\n</project>\n").unwrap();

  let err = PomSync::read_model(&path).unwrap_err();
  let message = err.to_string();

  assert!(matches!(err, PomSyncError::Malformed { .. }));
  assert!(message.contains("line 2"), "{}", message);
}

#[test]
fn test_missing_file_is_read_error() {
  let temp_dir = TempDir::new().unwrap();
  let result = PomSync::read_model(temp_dir.path().join("absent.xml"));
  assert!(matches!(result, Err(PomSyncError::Read { .. })));
}

#[cfg(unix)]
#[test]
fn test_new_file_gets_default_mode() {
  use std::os::unix::fs::PermissionsExt;

  let temp_dir = TempDir::new().unwrap();
  let pom_path = temp_dir.path().join("pom.xml");
  let plain_path = temp_dir.path().join("plain.xml");

  PomSync::write_model_to(&Project::new("g", "a", "1"), &pom_path).unwrap();
  fs::write(&plain_path, "").unwrap();

  let mode = |path: &std::path::Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
  assert_eq!(mode(&pom_path), mode(&plain_path));
}

#[cfg(unix)]
#[test]
fn test_existing_file_keeps_its_mode() {
  use std::os::unix::fs::PermissionsExt;

  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("pom.xml");
  fs::write(&path, TARGET_POM).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

  let mut project = PomSync::read_model(&path).unwrap();
  project.version = Some("1.1".to_string());
  PomSync::write_model(&project).unwrap();

  assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
}

#[test]
fn test_deeply_nested_input_is_malformed() {
  let text = format!(
    "<project><build>{}{}</build></project>",
    "<x>".repeat(200_000),
    "</x>".repeat(200_000)
  );

  let result = PomSync::read_model_from(text.as_bytes());
  assert!(matches!(result, Err(PomSyncError::Malformed { .. })));
}
