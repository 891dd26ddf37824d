use crate::model::{Component, Repetition};

/// A borrowed view of one value in the field-storage tree.
///
/// A field repetition holds components and a component holds sub-components. Datatype views
/// wrap a `ValueRef` and step one level down per composite nesting. Below sub-components the
/// tree has no more structure, so a `Text` value only answers for position 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef<'a> {
    Repetition(&'a Repetition),
    Component(&'a Component),
    Text(&'a str),
}

impl<'a> ValueRef<'a> {
    /// The nested value at a 1-based position, `None` when absent or empty.
    pub fn nested(&self, position: usize) -> Option<ValueRef<'a>> {
        let index = position.checked_sub(1)?;
        let nested = match *self {
            ValueRef::Repetition(rep) => ValueRef::Component(rep.components().get(index)?),
            ValueRef::Component(component) => {
                ValueRef::Text(component.subcomponents().get(index)?.as_str())
            }
            ValueRef::Text(text) if index == 0 => ValueRef::Text(text),
            ValueRef::Text(_) => return None,
        };
        (!nested.is_empty()).then_some(nested)
    }

    /// The leading text of the value: the first sub-component of the first component.
    /// `None` when that text is empty.
    pub fn text(&self) -> Option<&'a str> {
        let text = match *self {
            ValueRef::Repetition(rep) => rep.components().first()?.subcomponents().first()?.as_str(),
            ValueRef::Component(component) => component.subcomponents().first()?.as_str(),
            ValueRef::Text(text) => text,
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ValueRef::Repetition(rep) => rep.is_empty(),
            ValueRef::Component(component) => component.is_empty(),
            ValueRef::Text(text) => text.is_empty(),
        }
    }
}
