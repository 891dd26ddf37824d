//! Typed-view traits and the helpers generated accessors call.
//!
//! Every generated accessor is a one-line call into this module, so the lookup and error
//! behavior of all segments, groups and datatypes of all versions lives here.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::container::{AccessError, FieldContainer, MemberContainer};
use crate::date_time::{Hl7Date, Hl7DateTime, Hl7Time};
use crate::error::Hl7Error;
use crate::model::{Group, Message, Segment, Structure};
use crate::spec::{DatatypeSpec, GroupSpec, MessageSpec, SegmentSpec};
use crate::value::ValueRef;

/// A generated datatype view over one value.
pub trait Datatype<'a>: Sized + Copy {
    fn spec() -> &'static DatatypeSpec;

    fn from_value(value: ValueRef<'a>) -> Self;

    fn value_ref(&self) -> ValueRef<'a>;
}

/// A generated segment view.
pub trait SegmentView<'a>: Sized + Copy {
    fn spec() -> &'static SegmentSpec;

    fn from_segment(segment: &'a Segment) -> Self;

    fn segment(&self) -> &'a Segment;

    /// Wraps a segment only if it was decoded with this view's table.
    fn try_from_segment(segment: &'a Segment) -> Option<Self> {
        std::ptr::eq(segment.spec(), Self::spec()).then(|| Self::from_segment(segment))
    }
}

/// A generated group view.
pub trait GroupView<'a>: Sized + Copy {
    fn spec() -> &'static GroupSpec;

    fn from_group(group: &'a Group) -> Self;

    fn group(&self) -> &'a Group;

    fn try_from_group(group: &'a Group) -> Option<Self> {
        std::ptr::eq(group.spec(), Self::spec()).then(|| Self::from_group(group))
    }
}

/// A generated message view: a group view over a message's root group.
pub trait MessageView<'a>: GroupView<'a> {
    fn message_spec() -> &'static MessageSpec;

    fn from_message(message: &'a Message) -> Option<Self> {
        std::ptr::eq(message.spec(), Self::message_spec()).then(|| Self::from_group(message.root()))
    }
}

pub fn field<'a, D: Datatype<'a>>(segment: &'a Segment, position: usize) -> Option<D> {
    field_rep(segment, position, 0)
}

pub fn field_rep<'a, D: Datatype<'a>>(segment: &'a Segment, position: usize, rep: usize) -> Option<D> {
    segment
        .field(position, rep)
        .map(|r| D::from_value(ValueRef::Repetition(r)))
}

pub fn field_all<'a, D: Datatype<'a>>(segment: &'a Segment, position: usize) -> Vec<D> {
    (0..field_count(segment, position))
        .filter_map(|rep| field_rep(segment, position, rep))
        .collect()
}

pub fn field_count(segment: &Segment, position: usize) -> usize {
    segment.repetition_count(position)
}

/// A declared component of a composite, by 1-based position.
pub fn component<'a, D: Datatype<'a>>(value: ValueRef<'a>, position: usize) -> Option<D> {
    value.nested(position).map(D::from_value)
}

/// Untyped component access, checked against the composite's component table.
pub fn try_component_at<'a, D: Datatype<'a>>(
    value: ValueRef<'a>,
    position: usize,
) -> Result<Option<ValueRef<'a>>, AccessError> {
    let declared = D::spec().components().len();
    if position == 0 || position > declared {
        return Err(AccessError::ComponentOutOfRange {
            datatype: D::spec().name,
            position,
            declared,
        });
    }
    Ok(value.nested(position))
}

pub fn component_at<'a, D: Datatype<'a>>(value: ValueRef<'a>, position: usize) -> Option<ValueRef<'a>> {
    try_component_at::<D>(value, position).unwrap_or_else(|e| panic!("{e}"))
}

pub fn primitive_text(value: ValueRef<'_>) -> Option<&str> {
    value.text()
}

pub fn to_decimal(value: ValueRef<'_>) -> Result<Option<Decimal>, Hl7Error> {
    convert(value, "numeric", |text| Decimal::from_str(text).ok())
}

pub fn to_date(value: ValueRef<'_>) -> Result<Option<Hl7Date>, Hl7Error> {
    convert(value, "date", Hl7Date::parse)
}

pub fn to_datetime(value: ValueRef<'_>) -> Result<Option<Hl7DateTime>, Hl7Error> {
    convert(value, "date/time", Hl7DateTime::parse)
}

pub fn to_time(value: ValueRef<'_>) -> Result<Option<Hl7Time>, Hl7Error> {
    convert(value, "time", Hl7Time::parse)
}

fn convert<T>(
    value: ValueRef<'_>,
    kind: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, Hl7Error> {
    let Some(text) = value.text() else {
        return Ok(None);
    };
    let trimmed = text.trim();
    parse(trimmed)
        .map(Some)
        .ok_or_else(|| Hl7Error::InvalidValue {
            kind,
            value: text.to_string(),
        })
}

pub fn member_segment<'a, S: SegmentView<'a>>(group: &'a Group, name: &str, rep: usize) -> Option<S> {
    match group.member(name, rep)? {
        Structure::Segment(segment) => Some(S::from_segment(segment)),
        Structure::Group(_) => None,
    }
}

pub fn member_segment_all<'a, S: SegmentView<'a>>(group: &'a Group, name: &str) -> Vec<S> {
    (0..member_count(group, name))
        .filter_map(|rep| member_segment(group, name, rep))
        .collect()
}

pub fn member_group<'a, G: GroupView<'a>>(group: &'a Group, name: &str, rep: usize) -> Option<G> {
    match group.member(name, rep)? {
        Structure::Group(inner) => Some(G::from_group(inner)),
        Structure::Segment(_) => None,
    }
}

pub fn member_group_all<'a, G: GroupView<'a>>(group: &'a Group, name: &str) -> Vec<G> {
    (0..member_count(group, name))
        .filter_map(|rep| member_group(group, name, rep))
        .collect()
}

pub fn member_count(group: &Group, name: &str) -> usize {
    MemberContainer::member_count(group, name)
}
