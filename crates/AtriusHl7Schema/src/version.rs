use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;

/// Enumeration of HL7 v2.x standard versions known to the schema tooling.
///
/// Each variant names one published release of the HL7 v2 messaging standard. A version
/// only has generated model types when a schema file for it is listed in the registry
/// manifest and (for the runtime crate) the matching cargo feature is enabled.
///
/// # Examples
///
/// ```rust
/// use atrius_hl7_schema::Hl7Version;
///
/// let version: Hl7Version = "2.3".parse().unwrap();
/// assert_eq!(version, Hl7Version::V2_3);
/// assert_eq!(version.as_str(), "2.3");
/// assert_eq!(version.module_name(), "v2_3");
/// assert_eq!(version.to_string(), "2.3");
/// ```
///
/// # CLI Integration
///
/// This enum implements `clap::ValueEnum` for command-line argument parsing:
///
/// ```rust,no_run
/// use clap::Parser;
/// use atrius_hl7_schema::Hl7Version;
///
/// #[derive(Parser)]
/// struct Args {
///     #[arg(value_enum)]
///     version: Hl7Version,
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hl7Version {
    /// HL7 v2.1 (1990)
    V2_1,
    /// HL7 v2.2 (1994)
    V2_2,
    /// HL7 v2.3 (1997)
    V2_3,
    /// HL7 v2.3.1 (1999)
    V2_3_1,
    /// HL7 v2.4 (2000)
    V2_4,
    /// HL7 v2.5 (2003)
    V2_5,
    /// HL7 v2.5.1 (2007)
    V2_5_1,
}

impl Hl7Version {
    /// Every known version, oldest first.
    pub const ALL: [Hl7Version; 7] = [
        Hl7Version::V2_1,
        Hl7Version::V2_2,
        Hl7Version::V2_3,
        Hl7Version::V2_3_1,
        Hl7Version::V2_4,
        Hl7Version::V2_5,
        Hl7Version::V2_5_1,
    ];

    /// Returns the version identifier as it appears in MSH-12 (e.g. "2.3.1").
    pub fn as_str(&self) -> &'static str {
        match self {
            Hl7Version::V2_1 => "2.1",
            Hl7Version::V2_2 => "2.2",
            Hl7Version::V2_3 => "2.3",
            Hl7Version::V2_3_1 => "2.3.1",
            Hl7Version::V2_4 => "2.4",
            Hl7Version::V2_5 => "2.5",
            Hl7Version::V2_5_1 => "2.5.1",
        }
    }

    /// Rust module name used for the generated code of this version (e.g. "v2_3_1").
    pub fn module_name(&self) -> String {
        format!("v{}", self.as_str().replace('.', "_"))
    }

    /// Cargo feature that enables this version in the runtime crate (e.g. "V2_3_1").
    pub fn feature_name(&self) -> String {
        format!("V{}", self.as_str().replace('.', "_"))
    }
}

impl std::fmt::Display for Hl7Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Hl7Version {
    type Err = SchemaError;

    /// Accepts the MSH-12 form ("2.3.1") as well as the module/feature spellings
    /// ("v2_3_1", "V2_3_1").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_start_matches(['v', 'V'])
            .replace('_', ".");
        Hl7Version::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| SchemaError::UnknownVersion(s.to_string()))
    }
}

impl Serialize for Hl7Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Hl7Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Implements `clap::ValueEnum` so versions can be given on the command line as
/// `2.1`, `2.3`, ...
impl clap::ValueEnum for Hl7Version {
    fn value_variants<'a>() -> &'a [Self] {
        &Hl7Version::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_spellings() {
        assert_eq!("2.1".parse::<Hl7Version>().unwrap(), Hl7Version::V2_1);
        assert_eq!("v2_3_1".parse::<Hl7Version>().unwrap(), Hl7Version::V2_3_1);
        assert_eq!("V2_4".parse::<Hl7Version>().unwrap(), Hl7Version::V2_4);
        assert_eq!(" 2.5.1 ".parse::<Hl7Version>().unwrap(), Hl7Version::V2_5_1);
    }

    #[test]
    fn test_unknown_version() {
        let err = "3.0".parse::<Hl7Version>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVersion(ref v) if v == "3.0"));
    }

    #[test]
    fn test_names() {
        assert_eq!(Hl7Version::V2_3_1.module_name(), "v2_3_1");
        assert_eq!(Hl7Version::V2_1.feature_name(), "V2_1");
        assert_eq!(format!("hl7-{}", Hl7Version::V2_4), "hl7-2.4");
    }

    #[test]
    fn test_serde_uses_msh_form() {
        let json = serde_json::to_string(&Hl7Version::V2_3).unwrap();
        assert_eq!(json, "\"2.3\"");
        let back: Hl7Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Hl7Version::V2_3);
    }
}
