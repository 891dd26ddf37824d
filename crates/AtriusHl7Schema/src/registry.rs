use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::definition::Hl7Schema;
use crate::error::{SchemaError, SchemaResult};
use crate::version::Hl7Version;

/// Explicit mapping from HL7 version to the schema file describing it.
///
/// The registry is a plain value handed to whoever needs schemas (the generator CLI, the
/// runtime crate's build script); nothing is looked up from ambient configuration. It is
/// typically loaded from a `manifest.json` sitting next to the schema files:
///
/// ```json
/// { "schemas": { "2.1": "v2_1.json", "2.3": "v2_3.json" } }
/// ```
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: BTreeMap<Hl7Version, PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schemas: BTreeMap<Hl7Version, PathBuf>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a registry manifest.
    pub fn from_manifest(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&json).map_err(|source| SchemaError::Json {
                origin: path.display().to_string(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut registry = SchemaRegistry::new();
        for (version, file) in manifest.schemas {
            let resolved = if file.is_absolute() {
                file
            } else {
                base.join(file)
            };
            registry.insert(version, resolved);
        }
        debug!(
            "Loaded schema registry {} with {} versions",
            path.display(),
            registry.len()
        );
        Ok(registry)
    }

    /// Registers (or replaces) the schema file for a version.
    pub fn insert(&mut self, version: Hl7Version, path: impl Into<PathBuf>) -> &mut Self {
        self.entries.insert(version, path.into());
        self
    }

    pub fn get(&self, version: Hl7Version) -> Option<&Path> {
        self.entries.get(&version).map(PathBuf::as_path)
    }

    /// Registered versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = Hl7Version> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hl7Version, &Path)> {
        self.entries.iter().map(|(v, p)| (*v, p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads and validates the schema registered for `version`.
    ///
    /// Fails if the file declares a different version than the one it is registered
    /// under.
    pub fn load(&self, version: Hl7Version) -> SchemaResult<Hl7Schema> {
        let path = self
            .get(version)
            .ok_or_else(|| SchemaError::VersionNotRegistered(version.to_string()))?;
        let schema = Hl7Schema::from_path(path)?;
        if schema.version != version {
            return Err(SchemaError::VersionMismatch {
                path: path.to_path_buf(),
                declared: schema.version.to_string(),
                expected: version.to_string(),
            });
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Loads and validates every registered schema, oldest version first.
    pub fn load_all(&self) -> SchemaResult<Vec<Hl7Schema>> {
        self.versions().map(|v| self.load(v)).collect()
    }
}
