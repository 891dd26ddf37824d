use atrius_hl7_schema::{
    DatatypeDefinition, DatatypeKind, MemberDefinition, MemberReference, PrimitiveKind,
};
use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::quote;
use tracing::debug;

use crate::error::GeneratorResult;
use crate::gen_context::{GenContext, table_ident};

/// Emits the `tables` module body: the `'static` field tables the views index into, plus
/// `TABLES`, the per-version registry entry.
///
/// Every list is sorted by name so `VersionTables` lookups can binary-search, and so the
/// output does not depend on the order of the schema file.
pub(crate) fn generate_tables(ctx: &GenContext) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let schema = ctx.schema.normalized();

    let datatypes: Vec<TokenStream> = schema
        .datatypes
        .iter()
        .map(|d| datatype_table(rt, d))
        .collect();

    let segments: Vec<TokenStream> = schema
        .segments
        .iter()
        .map(|segment| {
            let ident = table_ident("segment", &segment.name);
            let name = &segment.name;
            let description = &segment.description;
            let fields = segment.fields.iter().map(|field| {
                let position = Literal::usize_unsuffixed(field.position);
                let field_name = &field.name;
                let datatype = &field.datatype;
                let required = field.required;
                let max_repetitions = Literal::u32_unsuffixed(field.max_repetitions);
                let max_length = optional_u32(field.max_length);
                let table = optional_u32(field.table);
                quote! {
                    #rt::spec::FieldSpec {
                        position: #position,
                        name: #field_name,
                        datatype: #datatype,
                        required: #required,
                        max_repetitions: #max_repetitions,
                        max_length: #max_length,
                        table: #table,
                    }
                }
            });
            quote! {
                pub static #ident: #rt::spec::SegmentSpec = #rt::spec::SegmentSpec {
                    name: #name,
                    description: #description,
                    fields: &[#(#fields),*],
                };
            }
        })
        .collect();

    let groups: Vec<TokenStream> = schema
        .groups
        .iter()
        .map(|group| {
            let ident = table_ident("group", &group.name);
            let name = &group.name;
            let members = member_tables(rt, &group.members);
            quote! {
                pub static #ident: #rt::spec::GroupSpec = #rt::spec::GroupSpec {
                    name: #name,
                    members: &[#(#members),*],
                };
            }
        })
        .collect();

    let messages: Vec<TokenStream> = schema
        .messages
        .iter()
        .map(|message| {
            let ident = table_ident("message", &message.name);
            let name = &message.name;
            let message_type = &message.message_type;
            let trigger_events = &message.trigger_events;
            let description = &message.description;
            let members = member_tables(rt, &message.members);
            quote! {
                pub static #ident: #rt::spec::MessageSpec = #rt::spec::MessageSpec {
                    name: #name,
                    message_type: #message_type,
                    trigger_events: &[#(#trigger_events),*],
                    description: #description,
                    structure: #rt::spec::GroupSpec {
                        name: #name,
                        members: &[#(#members),*],
                    },
                };
            }
        })
        .collect();

    let version = Ident::new(&schema.version.feature_name(), Span::call_site());
    let datatype_refs = schema.datatypes.iter().map(|d| table_ident("datatype", &d.name));
    let segment_refs = schema.segments.iter().map(|s| table_ident("segment", &s.name));
    let group_refs = schema.groups.iter().map(|g| table_ident("group", &g.name));
    let message_refs = schema.messages.iter().map(|m| table_ident("message", &m.name));

    debug!(
        "Generated tables for HL7 {}: {} datatypes, {} segments, {} groups, {} messages",
        schema.version,
        datatypes.len(),
        segments.len(),
        groups.len(),
        messages.len()
    );

    Ok(quote! {
        #(#datatypes)*
        #(#segments)*
        #(#groups)*
        #(#messages)*

        /// Every table of this version, each list sorted by name.
        pub static TABLES: #rt::spec::VersionTables = #rt::spec::VersionTables {
            version: #rt::Hl7Version::#version,
            datatypes: &[#(&#datatype_refs),*],
            segments: &[#(&#segment_refs),*],
            groups: &[#(&#group_refs),*],
            messages: &[#(&#message_refs),*],
        };
    })
}

fn datatype_table(rt: &TokenStream, datatype: &DatatypeDefinition) -> TokenStream {
    let ident = table_ident("datatype", &datatype.name);
    let name = &datatype.name;
    let description = &datatype.description;
    let shape = match &datatype.kind {
        DatatypeKind::Primitive { value } => {
            let kind = primitive_kind(rt, *value);
            quote!(#rt::spec::DatatypeShape::Primitive(#kind))
        }
        DatatypeKind::Composite { components } => {
            let components = components.iter().map(|component| {
                let position = Literal::usize_unsuffixed(component.position);
                let component_name = &component.name;
                let datatype = &component.datatype;
                let table = optional_u32(component.table);
                quote! {
                    #rt::spec::ComponentSpec {
                        position: #position,
                        name: #component_name,
                        datatype: #datatype,
                        table: #table,
                    }
                }
            });
            quote!(#rt::spec::DatatypeShape::Composite(&[#(#components),*]))
        }
    };
    quote! {
        pub static #ident: #rt::spec::DatatypeSpec = #rt::spec::DatatypeSpec {
            name: #name,
            description: #description,
            shape: #shape,
        };
    }
}

fn member_tables<'a>(
    rt: &'a TokenStream,
    members: &'a [MemberDefinition],
) -> impl Iterator<Item = TokenStream> + 'a {
    members.iter().map(move |member| {
        let name = member.member_name();
        let kind = match &member.reference {
            MemberReference::Segment(target) => {
                let target = table_ident("segment", target);
                quote!(#rt::spec::MemberKind::Segment(&#target))
            }
            MemberReference::Group(target) => {
                let target = table_ident("group", target);
                quote!(#rt::spec::MemberKind::Group(&#target))
            }
        };
        let required = member.required;
        let repeating = member.repeating;
        quote! {
            #rt::spec::MemberSpec {
                name: #name,
                kind: #kind,
                required: #required,
                repeating: #repeating,
            }
        }
    })
}

fn primitive_kind(rt: &TokenStream, kind: PrimitiveKind) -> TokenStream {
    match kind {
        PrimitiveKind::Text => quote!(#rt::PrimitiveKind::Text),
        PrimitiveKind::Numeric => quote!(#rt::PrimitiveKind::Numeric),
        PrimitiveKind::Date => quote!(#rt::PrimitiveKind::Date),
        PrimitiveKind::DateTime => quote!(#rt::PrimitiveKind::DateTime),
        PrimitiveKind::Time => quote!(#rt::PrimitiveKind::Time),
    }
}

fn optional_u32(value: Option<u32>) -> TokenStream {
    match value {
        Some(v) => {
            let v = Literal::u32_unsuffixed(v);
            quote!(Some(#v))
        }
        None => quote!(None),
    }
}
