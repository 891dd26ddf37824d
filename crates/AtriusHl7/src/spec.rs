//! Static field tables.
//!
//! These are the `'static` mirrors of the schema definitions that the generator writes into
//! each version's `tables` module. Segments and groups at run time carry a reference to
//! their table; the typed views only ever index through it.

use atrius_hl7_schema::{
    ComponentDefinition, DatatypeDefinition, DatatypeKind, FieldDefinition, GroupDefinition,
    Hl7Schema, Hl7Version, MemberDefinition, MemberReference, MessageDefinition, PrimitiveKind,
    Repeatability, SegmentDefinition,
};

/// One positional slot of a segment.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// 1-based
    pub position: usize,
    pub name: &'static str,
    pub datatype: &'static str,
    pub required: bool,
    /// 0 = unbounded, 1 = single-valued, N = at most N repetitions
    pub max_repetitions: u32,
    pub max_length: Option<u32>,
    pub table: Option<u32>,
}

impl FieldSpec {
    pub fn repeatability(&self) -> Repeatability {
        Repeatability::from_max(self.max_repetitions)
    }

    fn to_definition(&self) -> FieldDefinition {
        FieldDefinition {
            position: self.position,
            name: self.name.to_string(),
            datatype: self.datatype.to_string(),
            required: self.required,
            max_repetitions: self.max_repetitions,
            max_length: self.max_length,
            table: self.table,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SegmentSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SegmentSpec {
    /// The field at a 1-based position.
    pub fn field(&self, position: usize) -> Option<&'static FieldSpec> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    fn to_definition(&self) -> SegmentDefinition {
        SegmentDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            fields: self.fields.iter().map(FieldSpec::to_definition).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ComponentSpec {
    pub position: usize,
    pub name: &'static str,
    pub datatype: &'static str,
    pub table: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DatatypeShape {
    Primitive(PrimitiveKind),
    Composite(&'static [ComponentSpec]),
}

#[derive(Debug, PartialEq, Eq)]
pub struct DatatypeSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub shape: DatatypeShape,
}

impl DatatypeSpec {
    /// Declared components; empty for primitives.
    pub fn components(&self) -> &'static [ComponentSpec] {
        match self.shape {
            DatatypeShape::Primitive(_) => &[],
            DatatypeShape::Composite(components) => components,
        }
    }

    fn to_definition(&self) -> DatatypeDefinition {
        let kind = match self.shape {
            DatatypeShape::Primitive(value) => DatatypeKind::Primitive { value },
            DatatypeShape::Composite(components) => DatatypeKind::Composite {
                components: components
                    .iter()
                    .map(|c| ComponentDefinition {
                        position: c.position,
                        name: c.name.to_string(),
                        datatype: c.datatype.to_string(),
                        table: c.table,
                    })
                    .collect(),
            },
        };
        DatatypeDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            kind,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MemberKind {
    Segment(&'static SegmentSpec),
    Group(&'static GroupSpec),
}

/// One slot of a group.
#[derive(Debug, PartialEq, Eq)]
pub struct MemberSpec {
    /// Access name; the target's name unless the schema gave an explicit one
    pub name: &'static str,
    pub kind: MemberKind,
    pub required: bool,
    pub repeating: bool,
}

impl MemberSpec {
    /// Name of the referenced segment or group.
    pub fn target_name(&self) -> &'static str {
        match self.kind {
            MemberKind::Segment(segment) => segment.name,
            MemberKind::Group(group) => group.name,
        }
    }

    fn to_definition(&self) -> MemberDefinition {
        let target = self.target_name().to_string();
        MemberDefinition {
            name: (self.name != self.target_name()).then(|| self.name.to_string()),
            reference: match self.kind {
                MemberKind::Segment(_) => MemberReference::Segment(target),
                MemberKind::Group(_) => MemberReference::Group(target),
            },
            required: self.required,
            repeating: self.repeating,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: &'static str,
    pub members: &'static [MemberSpec],
}

impl GroupSpec {
    /// Index and table of a member, looked up by access name.
    pub fn member(&self, name: &str) -> Option<(usize, &'static MemberSpec)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
    }

    /// Segment names that can open this group: the leading optional members and the first
    /// required one.
    pub fn start_segments(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for member in self.members {
            match member.kind {
                MemberKind::Segment(segment) => names.push(segment.name),
                MemberKind::Group(group) => names.extend(group.start_segments()),
            }
            if member.required {
                break;
            }
        }
        names
    }

    /// Whether a segment of this name occurs anywhere below this group.
    pub fn contains_segment(&self, name: &str) -> bool {
        self.members.iter().any(|member| match member.kind {
            MemberKind::Segment(segment) => segment.name == name,
            MemberKind::Group(group) => group.contains_segment(name),
        })
    }

    fn to_members(&self) -> Vec<MemberDefinition> {
        self.members.iter().map(MemberSpec::to_definition).collect()
    }
}

/// A message structure: the root group plus the MSH-9 values that select it.
#[derive(Debug, PartialEq, Eq)]
pub struct MessageSpec {
    pub name: &'static str,
    pub message_type: &'static str,
    pub trigger_events: &'static [&'static str],
    pub description: &'static str,
    pub structure: GroupSpec,
}

impl MessageSpec {
    /// Whether an MSH-9 type/event pair selects this structure. A structure without
    /// trigger events is selected by its type alone.
    pub fn matches(&self, message_type: &str, trigger_event: Option<&str>) -> bool {
        if !self.message_type.eq_ignore_ascii_case(message_type) {
            return false;
        }
        if self.trigger_events.is_empty() {
            return true;
        }
        trigger_event.is_some_and(|event| {
            self.trigger_events
                .iter()
                .any(|e| e.eq_ignore_ascii_case(event))
        })
    }
}

/// Every table of one generated version, each list sorted by name.
#[derive(Debug, PartialEq, Eq)]
pub struct VersionTables {
    pub version: Hl7Version,
    pub datatypes: &'static [&'static DatatypeSpec],
    pub segments: &'static [&'static SegmentSpec],
    pub groups: &'static [&'static GroupSpec],
    pub messages: &'static [&'static MessageSpec],
}

impl VersionTables {
    pub fn datatype(&self, name: &str) -> Option<&'static DatatypeSpec> {
        self.datatypes
            .binary_search_by(|d| d.name.cmp(name))
            .ok()
            .map(|i| self.datatypes[i])
    }

    pub fn segment(&self, name: &str) -> Option<&'static SegmentSpec> {
        self.segments
            .binary_search_by(|s| s.name.cmp(name))
            .ok()
            .map(|i| self.segments[i])
    }

    pub fn group(&self, name: &str) -> Option<&'static GroupSpec> {
        self.groups
            .binary_search_by(|g| g.name.cmp(name))
            .ok()
            .map(|i| self.groups[i])
    }

    pub fn message(&self, name: &str) -> Option<&'static MessageSpec> {
        self.messages
            .binary_search_by(|m| m.name.cmp(name))
            .ok()
            .map(|i| self.messages[i])
    }

    /// The first structure (by name) selected by an MSH-9 type/event pair.
    pub fn message_for_event(
        &self,
        message_type: &str,
        trigger_event: Option<&str>,
    ) -> Option<&'static MessageSpec> {
        self.messages
            .iter()
            .copied()
            .find(|m| m.matches(message_type, trigger_event))
    }

    /// Rebuilds the schema these tables were generated from, in normalized order.
    pub fn to_schema(&self) -> Hl7Schema {
        Hl7Schema {
            version: self.version,
            datatypes: self.datatypes.iter().map(|d| d.to_definition()).collect(),
            segments: self.segments.iter().map(|s| s.to_definition()).collect(),
            groups: self
                .groups
                .iter()
                .map(|g| GroupDefinition {
                    name: g.name.to_string(),
                    members: g.to_members(),
                })
                .collect(),
            messages: self
                .messages
                .iter()
                .map(|m| MessageDefinition {
                    name: m.name.to_string(),
                    message_type: m.message_type.to_string(),
                    trigger_events: m.trigger_events.iter().map(|e| e.to_string()).collect(),
                    description: m.description.to_string(),
                    members: m.structure.to_members(),
                })
                .collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_lookups_binary_search_sorted_lists() {
        assert_eq!(TABLES.segment("NTE").map(|s| s.name), Some("NTE"));
        assert_eq!(TABLES.datatype("CE").map(|d| d.components().len()), Some(2));
        assert!(TABLES.segment("PID").is_none());
        assert!(TABLES.group("NOTES").is_some());
        assert!(TABLES.message("TST_T01").is_some());
    }

    #[test]
    fn test_field_positions_are_one_based() {
        assert!(SEGMENT_NTE.field(0).is_none());
        assert_eq!(SEGMENT_NTE.field(1).map(|f| f.name), Some("Set ID"));
        assert!(SEGMENT_NTE.field(4).is_none());
        assert_eq!(SEGMENT_NTE.fields[1].repeatability(), Repeatability::Unbounded);
        assert_eq!(SEGMENT_NTE.fields[2].repeatability(), Repeatability::Bounded(2));
    }

    #[test]
    fn test_message_matching() {
        assert!(MESSAGE_TST_T01.matches("tst", Some("T02")));
        assert!(!MESSAGE_TST_T01.matches("TST", Some("T03")));
        assert!(!MESSAGE_TST_T01.matches("TST", None));
        assert_eq!(
            TABLES.message_for_event("TST", Some("T01")).map(|m| m.name),
            Some("TST_T01")
        );
    }

    #[test]
    fn test_start_segments_stop_at_first_required_member() {
        assert_eq!(MESSAGE_TST_T01.structure.start_segments(), vec!["MSH"]);
        assert_eq!(GROUP_NOTES.start_segments(), vec!["NTE"]);
        assert!(MESSAGE_TST_T01.structure.contains_segment("NTE"));
        assert!(!GROUP_NOTES.contains_segment("MSH"));
    }

    #[test]
    fn test_to_schema_keeps_explicit_member_names_only() {
        let schema = TABLES.to_schema();
        assert_eq!(schema.version, Hl7Version::V2_2);
        let message = schema.message("TST_T01").unwrap();
        assert_eq!(message.members[0].name, None);
        assert_eq!(message.members[1].name.as_deref(), Some("FIRST_NOTES"));
        assert_eq!(message.members[2].name, None);
        assert_eq!(message.trigger_events, vec!["T01", "T02"]);
        assert_eq!(schema.segment("NTE").unwrap().fields[2].table, Some(1));
    }
}
