use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::version::Hl7Version;

/// The complete table set of one HL7 v2.x version.
///
/// A schema is the single input of the accessor generator. It is usually read from one
/// JSON file per version:
///
/// ```json
/// {
///   "version": "2.1",
///   "datatypes": [{ "name": "ST", "description": "String data", "kind": "primitive" }],
///   "segments": [{
///     "name": "NTE",
///     "description": "Notes and comments",
///     "fields": [
///       { "position": 1, "name": "Set ID - notes and comments", "datatype": "ST", "max_length": 4 }
///     ]
///   }],
///   "groups": [],
///   "messages": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hl7Schema {
    pub version: Hl7Version,
    #[serde(default)]
    pub datatypes: Vec<DatatypeDefinition>,
    #[serde(default)]
    pub segments: Vec<SegmentDefinition>,
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
    #[serde(default)]
    pub messages: Vec<MessageDefinition>,
}

/// A segment: a short mnemonic name and its ordered field table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldDefinition>,
}

/// One positional slot of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// 1-based position within the segment
    pub position: usize,
    /// Long-form descriptive name, e.g. "Patient name"
    pub name: String,
    /// Datatype name, e.g. "ST", "CE", "XCN"
    pub datatype: String,
    #[serde(default)]
    pub required: bool,
    /// 0 = unbounded, 1 = single-valued, N = at most N repetitions
    #[serde(default = "single_repetition")]
    pub max_repetitions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// HL7 table number for coded values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
}

fn single_repetition() -> u32 {
    1
}

/// How many repetitions a field admits, derived from `max_repetitions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeatability {
    Single,
    Bounded(u32),
    Unbounded,
}

impl Repeatability {
    pub fn from_max(max_repetitions: u32) -> Self {
        match max_repetitions {
            0 => Repeatability::Unbounded,
            1 => Repeatability::Single,
            n => Repeatability::Bounded(n),
        }
    }

    pub fn is_repeating(&self) -> bool {
        !matches!(self, Repeatability::Single)
    }

    /// Whether repetition index `rep` (0-based) is inside the declared bound.
    pub fn admits(&self, rep: usize) -> bool {
        match self {
            Repeatability::Single => rep == 0,
            Repeatability::Bounded(n) => rep < *n as usize,
            Repeatability::Unbounded => true,
        }
    }
}

impl FieldDefinition {
    pub fn repeatability(&self) -> Repeatability {
        Repeatability::from_max(self.max_repetitions)
    }
}

/// A datatype: either a primitive leaf or a composite of positional components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: DatatypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatatypeKind {
    Primitive {
        #[serde(default)]
        value: PrimitiveKind,
    },
    Composite {
        components: Vec<ComponentDefinition>,
    },
}

/// How the text of a primitive is interpreted by the typed helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    #[default]
    Text,
    Numeric,
    Date,
    DateTime,
    Time,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Text => "text",
            PrimitiveKind::Numeric => "numeric",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "date_time",
            PrimitiveKind::Time => "time",
        }
    }
}

/// One positional part of a composite datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub position: usize,
    pub name: String,
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
}

impl DatatypeDefinition {
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, DatatypeKind::Primitive { .. })
    }

    pub fn components(&self) -> &[ComponentDefinition] {
        match &self.kind {
            DatatypeKind::Primitive { .. } => &[],
            DatatypeKind::Composite { components } => components,
        }
    }
}

/// An ordered composition of segments and nested groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    pub members: Vec<MemberDefinition>,
}

/// One slot of a group or message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDefinition {
    /// Explicit member name; defaults to the referenced segment or group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub reference: MemberReference,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub repeating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberReference {
    Segment(String),
    Group(String),
}

impl MemberReference {
    pub fn target(&self) -> &str {
        match self {
            MemberReference::Segment(name) | MemberReference::Group(name) => name,
        }
    }
}

impl MemberDefinition {
    pub fn segment(segment: &str, required: bool, repeating: bool) -> Self {
        MemberDefinition {
            name: None,
            reference: MemberReference::Segment(segment.to_string()),
            required,
            repeating,
        }
    }

    pub fn group(group: &str, required: bool, repeating: bool) -> Self {
        MemberDefinition {
            name: None,
            reference: MemberReference::Group(group.to_string()),
            required,
            repeating,
        }
    }

    /// The name under which the member is accessed.
    pub fn member_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.reference.target())
    }
}

/// The root group composition of a message structure (e.g. `ORM_O01`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDefinition {
    pub name: String,
    pub message_type: String,
    /// Trigger events carried by this structure; empty means the type alone selects it
    #[serde(default)]
    pub trigger_events: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub members: Vec<MemberDefinition>,
}

impl Hl7Schema {
    pub fn new(version: Hl7Version) -> Self {
        Hl7Schema {
            version,
            datatypes: Vec::new(),
            segments: Vec::new(),
            groups: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Parses a schema from JSON text. `origin` names the source in error messages.
    pub fn from_json_str(json: &str, origin: &str) -> SchemaResult<Self> {
        serde_json::from_str(json).map_err(|source| SchemaError::Json {
            origin: origin.to_string(),
            source,
        })
    }

    /// Reads and parses a schema file. The schema is not validated; call
    /// [`Hl7Schema::validate`] before generating from it.
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    pub fn to_json_pretty(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| SchemaError::Json {
            origin: format!("HL7 {} schema", self.version),
            source,
        })
    }

    /// Returns a copy with every top-level table sorted by name. Field, component and
    /// member order is positional and left untouched.
    pub fn normalized(&self) -> Self {
        let mut schema = self.clone();
        schema.datatypes.sort_by(|a, b| a.name.cmp(&b.name));
        schema.segments.sort_by(|a, b| a.name.cmp(&b.name));
        schema.groups.sort_by(|a, b| a.name.cmp(&b.name));
        schema.messages.sort_by(|a, b| a.name.cmp(&b.name));

        // An explicit member name equal to its target carries no information.
        let members = schema
            .groups
            .iter_mut()
            .flat_map(|g| g.members.iter_mut())
            .chain(schema.messages.iter_mut().flat_map(|m| m.members.iter_mut()));
        for member in members {
            if member.name.as_deref() == Some(member.reference.target()) {
                member.name = None;
            }
        }
        schema
    }

    pub fn datatype(&self, name: &str) -> Option<&DatatypeDefinition> {
        self.datatypes.iter().find(|d| d.name == name)
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentDefinition> {
        self.segments.iter().find(|s| s.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupDefinition> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn message(&self, name: &str) -> Option<&MessageDefinition> {
        self.messages.iter().find(|m| m.name == name)
    }
}
