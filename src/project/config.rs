//! Stack configuration (stored as JSON or YAML).
//!
//! ```yaml
//! targetVersion: "1.14.4"
//! cacheDir: /home/me/.cache/mapstack
//! sources:
//!   - name: yarn
//!     version: "1.14.4+build.1"
//!     targetVersion: "1.14.4"
//!     path: yarn-1.14.4+build.1.jar
//!     format: tiny
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::StackError;
use super::source::MappingSource;

fn default_true() -> bool {
    true
}

/// Everything a stack run needs to know.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    /// Version of the raw namespace the output is for.
    pub target_version: String,

    /// Root of the artifact cache.
    pub cache_dir: PathBuf,

    /// Canonicalise sources through the intermediary namespace.
    #[serde(default = "default_true")]
    pub use_intermediaries: bool,

    /// Let filtered merges drop whole classes, not just members.
    #[serde(default = "default_true")]
    pub filter_classes: bool,

    /// Also package the final table as a jar.
    #[serde(default)]
    pub package_jar: bool,

    /// A file that must exist before anything runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<PathBuf>,

    /// Mapping sources, highest priority first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<MappingSource>,

    #[serde(default)]
    pub conventions: NamingConventions,
}

impl StackConfig {
    pub fn new(target_version: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_version: target_version.into(),
            cache_dir: cache_dir.into(),
            use_intermediaries: true,
            filter_classes: true,
            package_jar: false,
            precondition: None,
            sources: Vec::new(),
            conventions: NamingConventions::default(),
        }
    }

    /// Add a source below every existing one.
    pub fn with_source(mut self, source: MappingSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_intermediaries(mut self, enabled: bool) -> Self {
        self.use_intermediaries = enabled;
        self
    }

    pub fn with_class_filtering(mut self, enabled: bool) -> Self {
        self.filter_classes = enabled;
        self
    }

    pub fn with_jar(mut self, enabled: bool) -> Self {
        self.package_jar = enabled;
        self
    }

    pub fn with_precondition(mut self, path: impl Into<PathBuf>) -> Self {
        self.precondition = Some(path.into());
        self
    }

    /// Directory holding the artifacts for `version`.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.cache_dir.join("mappings").join(version)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.target_version.trim().is_empty() {
            return Err(StackError::config("targetVersion must not be empty"));
        }
        for source in &self.sources {
            if source.name.is_empty() || source.version.is_empty() {
                return Err(StackError::config(format!(
                    "source {} needs a name and a version",
                    source.path.display()
                )));
            }
            if source.name.contains(['/', '\\']) || source.version.contains(['/', '\\']) {
                return Err(StackError::config(format!(
                    "source name {}-{} must not contain path separators",
                    source.name, source.version
                )));
            }
        }
        self.conventions.compile().map(|_| ())
    }

    /// Read a configuration; `.yaml`/`.yml` files are YAML, anything else JSON.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, StackError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)
                .map_err(|e| StackError::config(format!("{}: {e}", path.display())))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| StackError::config(format!("{}: {e}", path.display())))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration in the format its extension names.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), StackError> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| StackError::config(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| StackError::config(e.to_string()))?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

// ============================================================================
// Naming conventions
// ============================================================================

/// How intermediary identifiers look; used to reject sources whose
/// from-namespace is not what it claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamingConventions {
    pub class_prefix: String,
    /// Full-match pattern for nested classes outside the main package.
    pub nested_class_pattern: String,
    pub method_prefix: String,
    pub field_prefix: String,
}

impl Default for NamingConventions {
    fn default() -> Self {
        Self {
            class_prefix: "net/minecraft/class_".to_string(),
            nested_class_pattern: r"com/mojang/.+\$class_\d+".to_string(),
            method_prefix: "method_".to_string(),
            field_prefix: "field_".to_string(),
        }
    }
}

impl NamingConventions {
    pub fn compile(&self) -> Result<CompiledConventions, StackError> {
        let nested = Regex::new(&format!("^(?:{})$", self.nested_class_pattern))
            .map_err(|e| StackError::config(format!("nestedClassPattern: {e}")))?;
        Ok(CompiledConventions {
            conventions: self.clone(),
            nested,
        })
    }
}

/// [`NamingConventions`] with the pattern compiled.
#[derive(Clone, Debug)]
pub struct CompiledConventions {
    conventions: NamingConventions,
    nested: Regex,
}

impl CompiledConventions {
    /// Returns true if `name` looks like an intermediary class.
    pub fn is_class(&self, name: &str) -> bool {
        name.starts_with(&self.conventions.class_prefix) || self.nested.is_match(name)
    }

    /// Returns true if `name` starts like an intermediary class of the main
    /// package; used to tell intermediary-anchored trees from raw ones.
    pub fn is_main_class(&self, name: &str) -> bool {
        name.starts_with(&self.conventions.class_prefix)
    }

    pub fn is_method(&self, name: &str) -> bool {
        name.starts_with(&self.conventions.method_prefix)
    }

    pub fn is_field(&self, name: &str) -> bool {
        name.starts_with(&self.conventions.field_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::SourceFormat;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: StackConfig =
            serde_json::from_str(r#"{"targetVersion": "1.14.4", "cacheDir": "/tmp/cache"}"#)
                .unwrap();

        assert!(config.use_intermediaries);
        assert!(config.filter_classes);
        assert!(!config.package_jar);
        assert!(config.sources.is_empty());
        assert_eq!(config.conventions, NamingConventions::default());
        assert_eq!(
            config.version_dir("1.14.4"),
            PathBuf::from("/tmp/cache/mappings/1.14.4")
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yaml");

        let config = StackConfig::new("1.14.4", dir.path())
            .with_class_filtering(false)
            .with_source(MappingSource::new("yarn", "1.14.4+build.1", "1.14.4", "yarn.jar"));
        config.write_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("targetVersion:"));
        assert!(content.contains("filterClasses: false"));

        let back = StackConfig::read_from_file(&path).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.sources[0].format, SourceFormat::Tiny);
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = StackConfig::new("1.14.4", "/tmp");
        config.conventions.nested_class_pattern = "(".to_string();
        assert!(matches!(config.validate(), Err(StackError::Config(_))));
    }

    #[test]
    fn test_conventions() {
        let conventions = NamingConventions::default().compile().unwrap();
        assert!(conventions.is_class("net/minecraft/class_1"));
        assert!(conventions.is_class("com/mojang/blaze3d/Foo$class_12"));
        assert!(!conventions.is_class("com/mojang/blaze3d/Foo$Inner"));
        assert!(!conventions.is_main_class("com/mojang/blaze3d/Foo$class_12"));
        assert!(conventions.is_method("method_1"));
        assert!(conventions.is_field("field_1"));
    }
}
