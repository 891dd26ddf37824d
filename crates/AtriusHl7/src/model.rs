//! The generic field-storage tree.
//!
//! message → groups → segments → fields → repetitions → components → sub-components
//!
//! Values are populated only by the decoder ([`crate::Parser`]) and read through the
//! container traits or the generated views. Text is stored unescaped.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::Hl7Version;
use crate::access::MessageView;
use crate::er7::{self, EncodingCharacters};
use crate::spec::{GroupSpec, MemberSpec, MessageSpec, SegmentSpec};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    subcomponents: Vec<String>,
}

impl Component {
    pub(crate) fn new(subcomponents: Vec<String>) -> Self {
        Component { subcomponents }
    }

    pub fn subcomponents(&self) -> &[String] {
        &self.subcomponents
    }

    pub fn is_empty(&self) -> bool {
        self.subcomponents.iter().all(String::is_empty)
    }

    /// Character count with sub-component separators, ignoring trailing empties.
    fn text_len(&self) -> usize {
        let subs = trimmed(&self.subcomponents, |s| s.is_empty());
        subs.iter().map(|s| s.chars().count()).sum::<usize>() + subs.len().saturating_sub(1)
    }
}

/// One occurrence of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repetition {
    components: Vec<Component>,
}

impl Repetition {
    pub(crate) fn new(components: Vec<Component>) -> Self {
        Repetition { components }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(Component::is_empty)
    }

    /// Length of the value as it counts against a field's maximum length.
    pub fn text_len(&self) -> usize {
        let components = trimmed(&self.components, Component::is_empty);
        components.iter().map(Component::text_len).sum::<usize>()
            + components.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    repetitions: Vec<Repetition>,
}

impl Field {
    pub(crate) fn new(repetitions: Vec<Repetition>) -> Self {
        Field { repetitions }
    }

    /// A field holding a single uninterpreted text, used for MSH-1 and MSH-2.
    pub(crate) fn verbatim(text: impl Into<String>) -> Self {
        Field::new(vec![Repetition::new(vec![Component::new(vec![text.into()])])])
    }

    pub fn repetitions(&self) -> &[Repetition] {
        &self.repetitions
    }

    pub fn is_empty(&self) -> bool {
        self.repetitions.iter().all(Repetition::is_empty)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.repetitions.truncate(len);
    }
}

/// A decoded segment that could not be placed in the message structure, kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    pub name: String,
    /// Field 1 first
    pub fields: Vec<Field>,
}

/// A segment bound to its field table. `fields` always has one entry per declared field;
/// anything past the declared table is kept in `extra_fields`.
#[derive(Clone)]
pub struct Segment {
    spec: &'static SegmentSpec,
    fields: Vec<Field>,
    extra_fields: Vec<Field>,
}

impl Segment {
    pub(crate) fn from_fields(spec: &'static SegmentSpec, mut fields: Vec<Field>) -> Self {
        let extra_fields = if fields.len() > spec.fields.len() {
            fields.split_off(spec.fields.len())
        } else {
            fields.resize_with(spec.fields.len(), Field::default);
            Vec::new()
        };
        Segment {
            spec,
            fields,
            extra_fields,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &'static SegmentSpec {
        self.spec
    }

    /// The stored field at a declared 1-based position.
    pub fn field_value(&self, position: usize) -> Option<&Field> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    pub(crate) fn field_value_mut(&mut self, position: usize) -> Option<&mut Field> {
        position.checked_sub(1).and_then(|i| self.fields.get_mut(i))
    }

    /// Fields present in the message beyond the declared table.
    pub fn extra_fields(&self) -> &[Field] {
        &self.extra_fields
    }

    pub(crate) fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().chain(self.extra_fields.iter())
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.spec, other.spec)
            && self.fields == other.fields
            && self.extra_fields == other.extra_fields
    }
}

impl Eq for Segment {}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.spec.name)
            .field("fields", &self.fields)
            .field("extra_fields", &self.extra_fields)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structure {
    Segment(Segment),
    Group(Group),
}

/// A group instance: one slot per declared member, each holding that member's repetitions.
#[derive(Clone)]
pub struct Group {
    spec: &'static GroupSpec,
    members: Vec<Vec<Structure>>,
}

impl Group {
    pub(crate) fn new(spec: &'static GroupSpec) -> Self {
        Group {
            spec,
            members: spec.members.iter().map(|_| Vec::new()).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &'static GroupSpec {
        self.spec
    }

    /// Each declared member with the structures stored for it, in declared order.
    pub fn slots(&self) -> impl Iterator<Item = (&'static MemberSpec, &[Structure])> {
        self.spec
            .members
            .iter()
            .zip(self.members.iter().map(Vec::as_slice))
    }

    pub(crate) fn slot(&self, index: usize) -> &[Structure] {
        self.members.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn push(&mut self, index: usize, structure: Structure) {
        if let Some(slot) = self.members.get_mut(index) {
            slot.push(structure);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(Vec::is_empty)
    }

    /// Every segment below this group, depth first in tree order.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        self.collect_segments(&mut out);
        out
    }

    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a Segment>) {
        for structure in self.members.iter().flatten() {
            match structure {
                Structure::Segment(segment) => out.push(segment),
                Structure::Group(group) => group.collect_segments(out),
            }
        }
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.spec, other.spec) && self.members == other.members
    }
}

impl Eq for Group {}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.spec.name)
            .field("members", &self.members)
            .finish()
    }
}

/// A decoded message: its structure table, the root group and any segments the structure
/// had no place for.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) version: Hl7Version,
    pub(crate) spec: &'static MessageSpec,
    pub(crate) encoding: EncodingCharacters,
    pub(crate) root: Group,
    pub(crate) unplaced: Vec<RawSegment>,
}

impl Message {
    pub fn version(&self) -> Hl7Version {
        self.version
    }

    pub fn spec(&self) -> &'static MessageSpec {
        self.spec
    }

    pub fn encoding(&self) -> &EncodingCharacters {
        &self.encoding
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn unplaced(&self) -> &[RawSegment] {
        &self.unplaced
    }

    /// The typed view of this message, `None` when it was decoded as another structure.
    pub fn view<'a, V: MessageView<'a>>(&'a self) -> Option<V> {
        V::from_message(self)
    }

    /// Writes the message back to ER7: placed segments in tree order, then unplaced ones,
    /// each terminated by a carriage return.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for segment in self.root.segments() {
            out.push_str(&er7::encode_segment(
                segment.name(),
                segment.all_fields(),
                &self.encoding,
            ));
            out.push('\r');
        }
        for raw in &self.unplaced {
            out.push_str(&er7::encode_segment(&raw.name, raw.fields.iter(), &self.encoding));
            out.push('\r');
        }
        out
    }
}

// JSON tree used by `hl7-inspect`. Single-valued levels collapse to their only child so
// plain text fields print as strings.

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.subcomponents.as_slice() {
            [] => serializer.serialize_str(""),
            [only] => serializer.serialize_str(only),
            subs => subs.serialize(serializer),
        }
    }
}

impl Serialize for Repetition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.components.as_slice() {
            [] => serializer.serialize_str(""),
            [only] => only.serialize(serializer),
            components => components.serialize(serializer),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.repetitions.as_slice() {
            [only] => only.serialize(serializer),
            repetitions => repetitions.serialize(serializer),
        }
    }
}

fn serialize_fields<'f, S: Serializer>(
    serializer: S,
    name: &str,
    fields: impl Iterator<Item = &'f Field>,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("segment", name)?;
    for (index, field) in fields.enumerate() {
        if !field.is_empty() {
            map.serialize_entry(&format!("{name}-{}", index + 1), field)?;
        }
    }
    map.end()
}

impl Serialize for RawSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_fields(serializer, &self.name, self.fields.iter())
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_fields(serializer, self.name(), self.all_fields())
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Structure::Segment(segment) => segment.serialize(serializer),
            Structure::Group(group) => group.serialize(serializer),
        }
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("group", self.name())?;
        for (member, structures) in self.slots() {
            match structures {
                [] => {}
                [only] if !member.repeating => map.serialize_entry(member.name, only)?,
                all => map.serialize_entry(member.name, &Repetitions(all))?,
            }
        }
        map.end()
    }
}

struct Repetitions<'a>(&'a [Structure]);

impl Serialize for Repetitions<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for structure in self.0 {
            seq.serialize_element(structure)?;
        }
        seq.end()
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("version", &self.version)?;
        map.serialize_entry("structure", self.spec.name)?;
        map.serialize_entry("content", &self.root)?;
        if !self.unplaced.is_empty() {
            map.serialize_entry("unplaced", &self.unplaced)?;
        }
        map.end()
    }
}

fn trimmed<T>(items: &[T], is_empty: impl Fn(&T) -> bool) -> &[T] {
    let len = items.iter().rposition(|i| !is_empty(i)).map_or(0, |i| i + 1);
    &items[..len]
}
