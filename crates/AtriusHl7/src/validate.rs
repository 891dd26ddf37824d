//! Conformance checks of a decoded message against its static tables.

use std::fmt;

use serde::Serialize;

use crate::model::{Group, Message, Segment, Structure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    MissingRequiredField,
    ValueTooLong { max: u32, actual: usize },
    MissingRequiredMember,
    UnplacedSegment,
}

/// One finding, located by a path such as `ORU_R01/ORU_R01_PATIENT_RESULT[0]/ORU_R01_PATIENT/PID-5`.
/// Repeating members carry their 0-based repetition index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub location: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::MissingRequiredField => write!(f, "{}: required field is empty", self.location),
            IssueKind::ValueTooLong { max, actual } => write!(
                f,
                "{}: value is {} characters long, at most {} allowed",
                self.location, actual, max
            ),
            IssueKind::MissingRequiredMember => write!(f, "{}: required member is missing", self.location),
            IssueKind::UnplacedSegment => write!(f, "{}: segment has no place in the structure", self.location),
        }
    }
}

impl Message {
    /// Reports missing required fields and members, over-long values and unplaced
    /// segments. An empty result means the message conforms to its tables.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        validate_group(self.root(), self.spec().name, &mut issues);
        for raw in self.unplaced() {
            issues.push(ValidationIssue {
                location: format!("{}/{}", self.spec().name, raw.name),
                kind: IssueKind::UnplacedSegment,
            });
        }
        issues
    }
}

fn validate_group(group: &Group, path: &str, issues: &mut Vec<ValidationIssue>) {
    for (member, structures) in group.slots() {
        if structures.is_empty() {
            if member.required {
                issues.push(ValidationIssue {
                    location: format!("{path}/{}", member.name),
                    kind: IssueKind::MissingRequiredMember,
                });
            }
            continue;
        }
        for (rep, structure) in structures.iter().enumerate() {
            let location = if member.repeating {
                format!("{path}/{}[{rep}]", member.name)
            } else {
                format!("{path}/{}", member.name)
            };
            match structure {
                Structure::Segment(segment) => validate_segment(segment, &location, issues),
                Structure::Group(inner) => validate_group(inner, &location, issues),
            }
        }
    }
}

fn validate_segment(segment: &Segment, path: &str, issues: &mut Vec<ValidationIssue>) {
    for spec in segment.spec().fields {
        let location = || format!("{path}-{}", spec.position);
        let field = segment.field_value(spec.position).filter(|f| !f.is_empty());
        let Some(field) = field else {
            if spec.required {
                issues.push(ValidationIssue {
                    location: location(),
                    kind: IssueKind::MissingRequiredField,
                });
            }
            continue;
        };
        let Some(max) = spec.max_length else { continue };
        for repetition in field.repetitions() {
            let actual = repetition.text_len();
            if actual > max as usize {
                issues.push(ValidationIssue {
                    location: location(),
                    kind: IssueKind::ValueTooLong { max, actual },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hl7Version;
    use crate::parser::{ParseOptions, Parser};
    use crate::registry::ModelRegistry;
    use crate::spec::fixtures::TABLES;

    fn parse(text: &str) -> Message {
        let mut registry = ModelRegistry::new();
        registry.register(&TABLES);
        Parser::new(&registry)
            .with_options(ParseOptions::default().with_default_version(Hl7Version::V2_2))
            .parse(text)
            .unwrap()
    }

    #[test]
    fn test_missing_required_member_and_field() {
        let message = parse("MSH|^~\\&|X||||||TST^T01\rNTE|1\r");
        let issues = message.validate();
        assert_eq!(
            issues,
            vec![
                ValidationIssue {
                    location: "TST_T01/FIRST_NOTES/NTE[0]-2".to_string(),
                    kind: IssueKind::MissingRequiredField,
                },
                ValidationIssue {
                    location: "TST_T01/NOTES".to_string(),
                    kind: IssueKind::MissingRequiredMember,
                },
            ]
        );
        assert_eq!(issues[1].to_string(), "TST_T01/NOTES: required member is missing");
    }

    #[test]
    fn test_value_too_long_and_unplaced() {
        let message = parse("MSH|^~\\&|X||||||TST^T01\rNTE|12345|abc~0123456789AB\rZZZ|1\r");
        let issues = message.validate();
        assert!(issues.contains(&ValidationIssue {
            location: "TST_T01/FIRST_NOTES/NTE[0]-1".to_string(),
            kind: IssueKind::ValueTooLong { max: 4, actual: 5 },
        }));
        assert!(issues.contains(&ValidationIssue {
            location: "TST_T01/FIRST_NOTES/NTE[0]-2".to_string(),
            kind: IssueKind::ValueTooLong { max: 10, actual: 12 },
        }));
        assert!(issues.contains(&ValidationIssue {
            location: "TST_T01/ZZZ".to_string(),
            kind: IssueKind::UnplacedSegment,
        }));
    }
}
