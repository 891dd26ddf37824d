use std::collections::BTreeMap;

use tracing::debug;

use crate::Hl7Version;
use crate::spec::VersionTables;

/// Maps HL7 versions to the generated tables the decoder binds messages to.
///
/// The registry is an explicit value passed to [`crate::Parser`]; nothing is looked up
/// from global state. [`ModelRegistry::with_enabled_versions`] holds every version compiled
/// into this build (one cargo feature per version).
///
/// ```rust
/// use atrius_hl7_lib::{Hl7Version, ModelRegistry};
///
/// let registry = ModelRegistry::with_enabled_versions();
/// for version in registry.versions() {
///     println!("HL7 {version} is available");
/// }
/// assert!(registry.get(Hl7Version::V2_5_1).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    tables: BTreeMap<Hl7Version, &'static VersionTables>,
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every version enabled through cargo features.
    pub fn with_enabled_versions() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "V2_1")]
        registry.register(&crate::v2_1::tables::TABLES);
        #[cfg(feature = "V2_3")]
        registry.register(&crate::v2_3::tables::TABLES);
        #[cfg(feature = "V2_4")]
        registry.register(&crate::v2_4::tables::TABLES);
        registry
    }

    /// Adds or replaces the tables of one version.
    pub fn register(&mut self, tables: &'static VersionTables) -> &mut Self {
        debug!(
            "Registering HL7 {} model ({} segments, {} messages)",
            tables.version,
            tables.segments.len(),
            tables.messages.len()
        );
        self.tables.insert(tables.version, tables);
        self
    }

    pub fn get(&self, version: Hl7Version) -> Option<&'static VersionTables> {
        self.tables.get(&version).copied()
    }

    /// Registered versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = Hl7Version> + '_ {
        self.tables.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
