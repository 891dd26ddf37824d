//! Decoding ER7 text into a message tree bound to the generated tables.

use std::iter::Peekable;
use std::vec::IntoIter;

use tracing::{debug, warn};

use crate::Hl7Version;
use crate::er7::{self, EncodingCharacters};
use crate::error::{Hl7Error, Hl7Result};
use crate::model::{Group, Message, RawSegment, Segment, Structure};
use crate::registry::ModelRegistry;
use crate::spec::{GroupSpec, MemberKind, MessageSpec, SegmentSpec, VersionTables};

/// Options controlling how tolerant decoding is.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Reject fields holding more repetitions than their table allows instead of dropping
    /// the excess
    pub strict: bool,
    /// Version to assume when MSH-12 is empty
    pub default_version: Option<Hl7Version>,
}

impl ParseOptions {
    pub fn strict() -> Self {
        ParseOptions {
            strict: true,
            ..Default::default()
        }
    }

    pub fn with_default_version(mut self, version: Hl7Version) -> Self {
        self.default_version = Some(version);
        self
    }
}

/// Decodes ER7 messages against the versions of a [`ModelRegistry`].
///
/// The version comes from MSH-12 and the message structure from MSH-9: its third
/// component when present, otherwise the first structure of that version whose type and
/// trigger event match. Segments are then placed greedily, in order, into the structure's
/// groups; a segment the structure has no place for is kept in [`Message::unplaced`].
///
/// ```rust
/// use atrius_hl7_lib::{ModelRegistry, Parser};
///
/// let registry = ModelRegistry::with_enabled_versions();
/// let parser = Parser::new(&registry);
/// # #[cfg(feature = "V2_3")]
/// # {
/// let message = parser.parse("MSH|^~\\&|LAB||||||ACK|1|P|2.3\rMSA|AA|1\r").unwrap();
/// assert_eq!(message.spec().name, "ACK");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Parser<'r> {
    registry: &'r ModelRegistry,
    options: ParseOptions,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Parser {
            registry,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse(&self, text: &str) -> Hl7Result<Message> {
        let mut lines = er7::split_segments(text);
        let header = lines.next().ok_or(Hl7Error::EmptyMessage)?;
        let encoding = EncodingCharacters::from_msh(header)?;

        let mut raws = vec![er7::parse_segment(header, &encoding)?];
        for line in lines {
            raws.push(er7::parse_segment(line, &encoding)?);
        }

        let version = self.resolve_version(&raws[0])?;
        let tables = self
            .registry
            .get(version)
            .ok_or(Hl7Error::VersionNotAvailable(version))?;
        let spec = select_structure(tables, &raws)?;
        debug!(
            "Decoding {} segments as HL7 {} {}",
            raws.len(),
            version,
            spec.name
        );

        let mut placement = Placement {
            input: raws.into_iter().peekable(),
            root: &spec.structure,
            options: &self.options,
            unplaced: Vec::new(),
        };
        let root = placement.fill(&spec.structure, false)?;

        Ok(Message {
            version,
            spec,
            encoding,
            root,
            unplaced: placement.unplaced,
        })
    }

    fn resolve_version(&self, msh: &RawSegment) -> Hl7Result<Hl7Version> {
        match raw_text(msh, 12, 1) {
            Some(text) => text
                .parse()
                .map_err(|_| Hl7Error::UnknownVersion(text.to_string())),
            None => self.options.default_version.ok_or(Hl7Error::MissingVersion),
        }
    }
}

/// Picks the structure named by MSH-9.3, or else the one matching the MSH-9 type and event.
/// Older headers carry only the type in MSH-9; the event is then read from EVN-1.
fn select_structure(
    tables: &VersionTables,
    raws: &[RawSegment],
) -> Hl7Result<&'static MessageSpec> {
    let Some(msh) = raws.first() else {
        return Err(Hl7Error::EmptyMessage);
    };
    if let Some(spec) = raw_text(msh, 9, 3).and_then(|name| tables.message(name)) {
        return Ok(spec);
    }
    let message_type = raw_text(msh, 9, 1).unwrap_or_default();
    let trigger_event = raw_text(msh, 9, 2).or_else(|| {
        raws.iter()
            .find(|raw| raw.name == "EVN")
            .and_then(|evn| raw_text(evn, 1, 1))
    });
    tables
        .message_for_event(message_type, trigger_event)
        .ok_or_else(|| Hl7Error::UnknownStructure {
            version: tables.version,
            message_type: message_type.to_string(),
            trigger_event: trigger_event.unwrap_or_default().to_string(),
        })
}

/// First sub-component text of a component of a raw field's first repetition.
fn raw_text(raw: &RawSegment, position: usize, component: usize) -> Option<&str> {
    let text = raw
        .fields
        .get(position.checked_sub(1)?)?
        .repetitions()
        .first()?
        .components()
        .get(component.checked_sub(1)?)?
        .subcomponents()
        .first()?
        .trim();
    (!text.is_empty()).then_some(text)
}

struct Placement<'o> {
    input: Peekable<IntoIter<RawSegment>>,
    root: &'static GroupSpec,
    options: &'o ParseOptions,
    unplaced: Vec<RawSegment>,
}

impl Placement<'_> {
    /// Fills one group instance from the input. A nested group returns as soon as the next
    /// segment belongs elsewhere in the structure; the root consumes everything.
    fn fill(&mut self, spec: &'static GroupSpec, nested: bool) -> Hl7Result<Group> {
        let mut group = Group::new(spec);
        let mut current = 0;

        while let Some(name) = self.input.peek().map(|raw| raw.name.clone()) {
            let Some(index) = next_member(&group, current, &name) else {
                if nested && self.root.contains_segment(&name) {
                    break;
                }
                self.set_aside(spec);
                continue;
            };

            current = index;
            match spec.members[index].kind {
                MemberKind::Segment(segment_spec) => {
                    let Some(raw) = self.input.next() else { break };
                    let segment = self.bind(segment_spec, raw)?;
                    group.push(index, Structure::Segment(segment));
                }
                MemberKind::Group(group_spec) => {
                    let inner = self.fill(group_spec, true)?;
                    if inner.is_empty() {
                        self.set_aside(spec);
                        continue;
                    }
                    group.push(index, Structure::Group(inner));
                }
            }
        }
        Ok(group)
    }

    fn set_aside(&mut self, within: &GroupSpec) {
        if let Some(raw) = self.input.next() {
            warn!(
                "Segment {} has no place in {} (inside {}), keeping it unplaced",
                raw.name, self.root.name, within.name
            );
            self.unplaced.push(raw);
        }
    }

    fn bind(&self, spec: &'static SegmentSpec, raw: RawSegment) -> Hl7Result<Segment> {
        let mut segment = Segment::from_fields(spec, raw.fields);
        for field_spec in spec.fields.iter().filter(|f| f.max_repetitions > 0) {
            let max = field_spec.max_repetitions as usize;
            let Some(field) = segment.field_value_mut(field_spec.position) else {
                continue;
            };
            let found = field.repetitions().len();
            if found <= max {
                continue;
            }
            if self.options.strict {
                return Err(Hl7Error::RepetitionLimit {
                    segment: spec.name.to_string(),
                    position: field_spec.position,
                    max: field_spec.max_repetitions,
                    found,
                });
            }
            warn!(
                "{}-{} holds {} repetitions, keeping the first {}",
                spec.name, field_spec.position, found, max
            );
            field.truncate(max);
        }
        Ok(segment)
    }
}

/// The first member at or after `current` that can take a segment named `name`. Filled
/// non-repeating members are skipped.
fn next_member(group: &Group, current: usize, name: &str) -> Option<usize> {
    let members = group.spec().members;
    (current..members.len()).find(|&index| {
        let member = &members[index];
        if !member.repeating && !group.slot(index).is_empty() {
            return false;
        }
        match member.kind {
            MemberKind::Segment(segment) => segment.name == name,
            MemberKind::Group(inner) => inner.start_segments().contains(&name),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{FieldContainer, MemberContainer};
    use crate::spec::fixtures::TABLES;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(&TABLES);
        registry
    }

    #[test]
    fn test_repeating_groups_and_unplaced_segments() {
        let registry = registry();
        let message = Parser::new(&registry)
            .with_options(ParseOptions::default().with_default_version(Hl7Version::V2_2))
            .parse("MSH|^~\\&|||||||TST^T01\rNTE|1|a\rZZZ|x\rNTE|2|b\r")
            .unwrap();
        assert_eq!(message.spec().name, "TST_T01");

        let root = message.root();
        // Both NTEs land in the first group: FIRST_NOTES repeats its NTE member.
        assert_eq!(root.member_count("FIRST_NOTES"), 1);
        let Some(Structure::Group(first)) = root.member("FIRST_NOTES", 0) else {
            panic!("FIRST_NOTES missing");
        };
        assert_eq!(first.member_count("NTE"), 2);
        assert_eq!(root.member_count("NOTES"), 0);

        assert_eq!(message.unplaced().len(), 1);
        assert_eq!(message.unplaced()[0].name, "ZZZ");
    }

    #[test]
    fn test_bounded_repetitions_lenient_and_strict() {
        let registry = registry();
        let text = "MSH|^~\\&|||||||TST^T01\rNTE|1|a|X~Y~Z\r";
        let options = ParseOptions::default().with_default_version(Hl7Version::V2_2);

        let message = Parser::new(&registry)
            .with_options(options.clone())
            .parse(text)
            .unwrap();
        let segments = message.root().segments();
        assert_eq!(segments[1].repetition_count(3), 2);

        let strict = ParseOptions {
            strict: true,
            ..options
        };
        let err = Parser::new(&registry)
            .with_options(strict)
            .parse(text)
            .unwrap_err();
        assert!(matches!(
            err,
            Hl7Error::RepetitionLimit { position: 3, max: 2, found: 3, .. }
        ));
    }

    #[test]
    fn test_header_errors() {
        let registry = registry();
        let parser = Parser::new(&registry);
        assert!(matches!(parser.parse("\r\n"), Err(Hl7Error::EmptyMessage)));
        assert!(matches!(parser.parse("PID|1\r"), Err(Hl7Error::MissingHeader(_))));
        assert!(matches!(
            parser.parse("MSH|^~\\&|||||||TST^T01\r"),
            Err(Hl7Error::MissingVersion)
        ));
    }

    #[test]
    fn test_unknown_structure() {
        let registry = registry();
        let err = Parser::new(&registry)
            .with_options(ParseOptions::default().with_default_version(Hl7Version::V2_2))
            .parse("MSH|^~\\&|||||||TST^T09\r")
            .unwrap_err();
        assert!(matches!(
            err,
            Hl7Error::UnknownStructure { ref trigger_event, .. } if trigger_event == "T09"
        ));
    }

    #[test]
    fn test_trigger_event_from_evn() {
        let registry = registry();
        let parser = Parser::new(&registry)
            .with_options(ParseOptions::default().with_default_version(Hl7Version::V2_2));

        let message = parser.parse("MSH|^~\\&|||||||TST\rEVN|T02\rNTE|1|a\r").unwrap();
        assert_eq!(message.spec().name, "TST_T01");

        let err = parser.parse("MSH|^~\\&|||||||TST\rEVN|T09\r").unwrap_err();
        assert!(matches!(
            err,
            Hl7Error::UnknownStructure { ref trigger_event, .. } if trigger_event == "T09"
        ));
        // MSH-9.2 wins over EVN-1
        let message = parser.parse("MSH|^~\\&|||||||TST^T01\rEVN|T09\r").unwrap();
        assert_eq!(message.spec().name, "TST_T01");
    }
}
