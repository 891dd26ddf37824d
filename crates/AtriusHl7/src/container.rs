//! The two container contracts every generated view goes through.
//!
//! [`FieldContainer`] is implemented once, by [`Segment`], and [`MemberContainer`] once, by
//! [`Group`]. Both separate the two failure modes of an accessor:
//!
//! - asking for something the table does not declare (a field position past the segment, a
//!   repetition past a bounded maximum, an unknown member) is an [`AccessError`], returned
//!   by the `try_*` methods and a panic in the plain ones;
//! - asking for something declared but not present in the message is `None` or 0.

use thiserror::Error;

use crate::model::{Group, Repetition, Segment, Structure};

/// A request outside the declared tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{segment} has no field {position} (declares {declared})")]
    FieldOutOfRange {
        segment: &'static str,
        position: usize,
        declared: usize,
    },

    #[error("{segment}-{position} admits {max} repetition(s), index {rep} requested")]
    RepetitionOutOfRange {
        segment: &'static str,
        position: usize,
        rep: usize,
        max: u32,
    },

    #[error("{group} has no member '{name}'")]
    UnknownMember { group: &'static str, name: String },

    #[error("{group}.{name} does not repeat, index {rep} requested")]
    MemberNotRepeating {
        group: &'static str,
        name: &'static str,
        rep: usize,
    },

    #[error("{datatype} has no component {position} (declares {declared})")]
    ComponentOutOfRange {
        datatype: &'static str,
        position: usize,
        declared: usize,
    },
}

/// Positional field access with 1-based positions and 0-based repetitions.
pub trait FieldContainer {
    /// The stored repetition, `Ok(None)` when the message does not carry it.
    fn try_field(&self, position: usize, rep: usize) -> Result<Option<&Repetition>, AccessError>;

    fn try_repetition_count(&self, position: usize) -> Result<usize, AccessError>;

    /// Like [`FieldContainer::try_field`], panicking on an [`AccessError`].
    fn field(&self, position: usize, rep: usize) -> Option<&Repetition> {
        self.try_field(position, rep)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn repetition_count(&self, position: usize) -> usize {
        self.try_repetition_count(position)
            .unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Named member access with 0-based repetitions.
pub trait MemberContainer {
    fn try_member(&self, name: &str, rep: usize) -> Result<Option<&Structure>, AccessError>;

    fn try_member_count(&self, name: &str) -> Result<usize, AccessError>;

    fn member(&self, name: &str, rep: usize) -> Option<&Structure> {
        self.try_member(name, rep)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn member_count(&self, name: &str) -> usize {
        self.try_member_count(name)
            .unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Segment {
    fn check_position(&self, position: usize) -> Result<(), AccessError> {
        if self.spec().field(position).is_none() {
            return Err(AccessError::FieldOutOfRange {
                segment: self.name(),
                position,
                declared: self.spec().fields.len(),
            });
        }
        Ok(())
    }
}

impl FieldContainer for Segment {
    fn try_field(&self, position: usize, rep: usize) -> Result<Option<&Repetition>, AccessError> {
        self.check_position(position)?;
        let spec = &self.spec().fields[position - 1];
        if !spec.repeatability().admits(rep) {
            return Err(AccessError::RepetitionOutOfRange {
                segment: self.name(),
                position,
                rep,
                max: spec.max_repetitions,
            });
        }
        Ok(self
            .field_value(position)
            .and_then(|field| field.repetitions().get(rep)))
    }

    fn try_repetition_count(&self, position: usize) -> Result<usize, AccessError> {
        self.check_position(position)?;
        Ok(self
            .field_value(position)
            .map_or(0, |field| field.repetitions().len()))
    }
}

impl Group {
    fn member_index(&self, name: &str) -> Result<usize, AccessError> {
        self.spec()
            .member(name)
            .map(|(index, _)| index)
            .ok_or_else(|| AccessError::UnknownMember {
                group: self.name(),
                name: name.to_string(),
            })
    }
}

impl MemberContainer for Group {
    fn try_member(&self, name: &str, rep: usize) -> Result<Option<&Structure>, AccessError> {
        let index = self.member_index(name)?;
        let spec = &self.spec().members[index];
        if rep > 0 && !spec.repeating {
            return Err(AccessError::MemberNotRepeating {
                group: self.name(),
                name: spec.name,
                rep,
            });
        }
        Ok(self.slot(index).get(rep))
    }

    fn try_member_count(&self, name: &str) -> Result<usize, AccessError> {
        let index = self.member_index(name)?;
        Ok(self.slot(index).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Field};
    use crate::spec::fixtures::{GROUP_NOTES, SEGMENT_NTE};

    fn nte(comment_reps: usize) -> Segment {
        let reps = (0..comment_reps)
            .map(|i| Repetition::new(vec![Component::new(vec![format!("c{i}")])]))
            .collect();
        Segment::from_fields(&SEGMENT_NTE, vec![Field::default(), Field::new(reps)])
    }

    #[test]
    fn test_declared_but_absent_is_none() {
        let segment = nte(0);
        assert_eq!(segment.try_field(1, 0), Ok(None));
        assert_eq!(segment.try_repetition_count(2), Ok(0));
        assert_eq!(segment.field(3, 1), None);
    }

    #[test]
    fn test_repetitions_within_bounds() {
        let segment = nte(3);
        assert_eq!(segment.repetition_count(2), 3);
        assert!(segment.field(2, 2).is_some());
        // Unbounded: asking past the stored count is absence, not an error.
        assert_eq!(segment.try_field(2, 50), Ok(None));
    }

    #[test]
    fn test_schema_errors_are_distinguishable() {
        let segment = nte(1);
        assert_eq!(
            segment.try_field(4, 0),
            Err(AccessError::FieldOutOfRange {
                segment: "NTE",
                position: 4,
                declared: 3
            })
        );
        assert!(matches!(
            segment.try_field(0, 0),
            Err(AccessError::FieldOutOfRange { position: 0, .. })
        ));
        assert_eq!(
            segment.try_field(1, 1),
            Err(AccessError::RepetitionOutOfRange {
                segment: "NTE",
                position: 1,
                rep: 1,
                max: 1
            })
        );
        assert!(segment.try_field(3, 1).is_ok());
        assert!(segment.try_field(3, 2).is_err());
    }

    #[test]
    #[should_panic(expected = "NTE has no field 9")]
    fn test_plain_accessor_panics_out_of_range() {
        nte(1).field(9, 0);
    }

    #[test]
    fn test_group_members() {
        let mut group = Group::new(&GROUP_NOTES);
        assert_eq!(group.member_count("NTE"), 0);
        group.push(0, Structure::Segment(nte(1)));
        group.push(0, Structure::Segment(nte(2)));
        assert_eq!(group.member_count("NTE"), 2);
        assert!(matches!(group.member("NTE", 1), Some(Structure::Segment(_))));
        assert_eq!(group.try_member("NTE", 5), Ok(None));
        assert_eq!(
            group.try_member_count("PID"),
            Err(AccessError::UnknownMember {
                group: "NOTES",
                name: "PID".to_string()
            })
        );
    }
}
