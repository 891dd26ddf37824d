use std::collections::{BTreeMap, HashMap};

use atrius_hl7_schema::{Hl7Schema, MemberDefinition, MemberReference};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, GeneratorResult};
use crate::format_helpers::{table_name, type_name};

/// Resolved Rust names for every item of one schema, shared by the emitters.
pub(crate) struct GenContext<'s> {
    pub schema: &'s Hl7Schema,
    /// Path of the runtime crate as seen from the generated code
    pub rt: TokenStream,
    datatypes: BTreeMap<&'s str, Ident>,
    segments: BTreeMap<&'s str, Ident>,
    groups: BTreeMap<&'s str, Ident>,
    messages: BTreeMap<&'s str, Ident>,
}

impl<'s> GenContext<'s> {
    pub fn new(schema: &'s Hl7Schema, config: &GeneratorConfig) -> GeneratorResult<Self> {
        let context = GenContext {
            schema,
            rt: config.runtime_tokens()?,
            datatypes: assign_types(
                "datatype",
                "Datatype",
                schema.datatypes.iter().map(|d| d.name.as_str()),
            )?,
            segments: assign_types(
                "segment",
                "Segment",
                schema.segments.iter().map(|s| s.name.as_str()),
            )?,
            groups: assign_types(
                "group",
                "Group",
                schema.groups.iter().map(|g| g.name.as_str()),
            )?,
            messages: assign_types(
                "message",
                "Message",
                schema.messages.iter().map(|m| m.name.as_str()),
            )?,
        };
        context.check_table_names()?;
        Ok(context)
    }

    pub fn datatype_type(&self, owner: &str, datatype: &str) -> GeneratorResult<&Ident> {
        self.datatypes
            .get(datatype)
            .ok_or_else(|| GeneratorError::UnresolvedDatatype {
                owner: owner.to_string(),
                datatype: datatype.to_string(),
            })
    }

    pub fn segment_type(&self, name: &str) -> Option<&Ident> {
        self.segments.get(name)
    }

    pub fn group_type(&self, name: &str) -> Option<&Ident> {
        self.groups.get(name)
    }

    pub fn message_type(&self, name: &str) -> Option<&Ident> {
        self.messages.get(name)
    }

    /// The view type a member accessor returns, e.g. `super::segments::Pid<'a>`.
    pub fn member_view(&self, owner: &str, member: &MemberDefinition) -> GeneratorResult<TokenStream> {
        match &member.reference {
            MemberReference::Segment(name) => {
                let ident = self.segment_type(name).ok_or_else(|| unresolved(owner, "segment", name))?;
                Ok(quote!(super::segments::#ident<'a>))
            }
            MemberReference::Group(name) => {
                let ident = self.group_type(name).ok_or_else(|| unresolved(owner, "group", name))?;
                Ok(quote!(super::groups::#ident<'a>))
            }
        }
    }

    // Statics of every kind share the tables module.
    fn check_table_names(&self) -> GeneratorResult<()> {
        let kinds = [
            ("datatype", &self.datatypes),
            ("segment", &self.segments),
            ("group", &self.groups),
            ("message", &self.messages),
        ];
        let mut taken: HashMap<String, String> = HashMap::new();
        for (kind, names) in kinds {
            for name in names.keys() {
                let ident = table_name(kind, name);
                let owner = format!("{kind} {name}");
                if let Some(first) = taken.insert(ident.clone(), owner.clone()) {
                    return Err(GeneratorError::NameCollision {
                        ident,
                        first,
                        second: owner,
                    });
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn table_ident(kind: &str, name: &str) -> Ident {
    Ident::new(&table_name(kind, name), Span::call_site())
}

fn unresolved(owner: &str, kind: &'static str, name: &str) -> GeneratorError {
    GeneratorError::UnresolvedMember {
        owner: owner.to_string(),
        kind,
        name: name.to_string(),
    }
}

fn assign_types<'s>(
    kind: &str,
    prefix: &str,
    names: impl Iterator<Item = &'s str>,
) -> GeneratorResult<BTreeMap<&'s str, Ident>> {
    let mut assigned = BTreeMap::new();
    let mut taken: HashMap<String, &str> = HashMap::new();
    for name in names {
        let ident = type_name(name, prefix);
        if let Some(first) = taken.insert(ident.clone(), name) {
            return Err(GeneratorError::NameCollision {
                ident,
                first: format!("{kind} {first}"),
                second: format!("{kind} {name}"),
            });
        }
        assigned.insert(name, Ident::new(&ident, Span::call_site()));
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrius_hl7_schema::{DatatypeDefinition, DatatypeKind, Hl7Version, PrimitiveKind};

    fn primitive(name: &str) -> DatatypeDefinition {
        DatatypeDefinition {
            name: name.to_string(),
            description: String::new(),
            kind: DatatypeKind::Primitive {
                value: PrimitiveKind::Text,
            },
        }
    }

    #[test]
    fn test_type_collision_is_reported() {
        let mut schema = Hl7Schema::new(Hl7Version::V2_3);
        schema.datatypes.push(primitive("CM_MSG"));
        schema.datatypes.push(primitive("Cm Msg"));
        let err = GenContext::new(&schema, &GeneratorConfig::default())
            .err()
            .expect("both names map to CmMsg");
        assert!(matches!(
            err,
            GeneratorError::NameCollision { ref ident, .. } if ident == "CmMsg"
        ));
    }

    #[test]
    fn test_unknown_datatype_is_an_error() {
        let mut schema = Hl7Schema::new(Hl7Version::V2_3);
        schema.datatypes.push(primitive("ST"));
        let context = GenContext::new(&schema, &GeneratorConfig::default()).unwrap();
        assert_eq!(context.datatype_type("PID-5", "ST").unwrap().to_string(), "St");
        assert!(matches!(
            context.datatype_type("PID-5", "XPN"),
            Err(GeneratorError::UnresolvedDatatype { .. })
        ));
    }
}
