use atrius_hl7_schema::{FieldDefinition, SegmentDefinition};
use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};
use tracing::debug;

use crate::error::{GeneratorError, GeneratorResult};
use crate::format_helpers::{NameAllocator, doc_attrs, rust_ident};
use crate::gen_context::{GenContext, table_ident};

/// Emits the `segments` module body: one view type per segment with one accessor per
/// declared field.
pub(crate) fn generate_segments(ctx: &GenContext) -> GeneratorResult<TokenStream> {
    let mut items = Vec::with_capacity(ctx.schema.segments.len());
    for segment in &ctx.schema.segments {
        items.push(segment_tokens(ctx, segment)?);
    }
    debug!("Generated {} segment views", items.len());
    Ok(quote!(#(#items)*))
}

fn segment_tokens(ctx: &GenContext, segment: &SegmentDefinition) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let ident = ctx
        .segment_type(&segment.name)
        .ok_or_else(|| GeneratorError::UnresolvedMember {
            owner: "segments".to_string(),
            kind: "segment",
            name: segment.name.clone(),
        })?;
    let table = table_ident("segment", &segment.name);
    let docs = doc_attrs(&[
        if segment.description.is_empty() {
            format!("{} segment", segment.name)
        } else {
            format!("{}: {}", segment.name, segment.description)
        },
        String::new(),
        format!(
            "{} declared fields in HL7 {}.",
            segment.fields.len(),
            ctx.schema.version
        ),
    ]);

    let mut names = NameAllocator::new("field");
    let mut accessors = Vec::with_capacity(segment.fields.len());
    for field in &segment.fields {
        let repeating = field.repeatability().is_repeating();
        let name = names.allocate(&field.name, field.position, repeating);
        accessors.push(field_accessors(ctx, segment, field, &name)?);
    }

    Ok(quote! {
        #docs
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct #ident<'a>(&'a #rt::model::Segment);

        impl<'a> #rt::access::SegmentView<'a> for #ident<'a> {
            fn spec() -> &'static #rt::spec::SegmentSpec {
                &super::tables::#table
            }

            fn from_segment(segment: &'a #rt::model::Segment) -> Self {
                Self(segment)
            }

            fn segment(&self) -> &'a #rt::model::Segment {
                self.0
            }
        }

        impl<'a> #ident<'a> {
            #(#accessors)*
        }
    })
}

fn field_accessors(
    ctx: &GenContext,
    segment: &SegmentDefinition,
    field: &FieldDefinition,
    name: &str,
) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let owner = format!("{}-{}", segment.name, field.position);
    let datatype = ctx.datatype_type(&owner, &field.datatype)?;
    let ty = quote!(super::datatypes::#datatype<'a>);
    let position = Literal::usize_unsuffixed(field.position);
    let single = rust_ident(name);
    let docs = doc_attrs(&[field_doc(&owner, field)]);

    if !field.repeatability().is_repeating() {
        return Ok(quote! {
            #docs
            pub fn #single(&self) -> Option<#ty> {
                #rt::access::field(self.0, #position)
            }
        });
    }

    let rep: Ident = format_ident!("{}_rep", name);
    let all: Ident = format_ident!("{}_all", name);
    let count: Ident = format_ident!("{}_count", name);
    Ok(quote! {
        #docs
        ///
        /// First repetition.
        pub fn #single(&self) -> Option<#ty> {
            #rt::access::field(self.0, #position)
        }

        /// Repetition `rep` (0-based); panics when `rep` is beyond the declared maximum.
        pub fn #rep(&self, rep: usize) -> Option<#ty> {
            #rt::access::field_rep(self.0, #position, rep)
        }

        pub fn #all(&self) -> Vec<#ty> {
            #rt::access::field_all(self.0, #position)
        }

        pub fn #count(&self) -> usize {
            #rt::access::field_count(self.0, #position)
        }
    })
}

fn field_doc(owner: &str, field: &FieldDefinition) -> String {
    let mut facts = vec![field.datatype.clone()];
    if field.required {
        facts.push("required".to_string());
    }
    match field.max_repetitions {
        0 => facts.push("repeating".to_string()),
        1 => {}
        n => facts.push(format!("up to {n} repetitions")),
    }
    if let Some(len) = field.max_length {
        facts.push(format!("max length {len}"));
    }
    if let Some(table) = field.table {
        facts.push(format!("table {table:04}"));
    }
    format!("{owner}: {} ({})", field.name, facts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(max_repetitions: u32, required: bool) -> FieldDefinition {
        FieldDefinition {
            position: 5,
            name: "Patient name".to_string(),
            datatype: "PN".to_string(),
            required,
            max_repetitions,
            max_length: Some(48),
            table: None,
        }
    }

    #[test]
    fn test_field_doc_lists_declared_facts() {
        assert_eq!(
            field_doc("PID-5", &field(1, true)),
            "PID-5: Patient name (PN, required, max length 48)"
        );
        assert_eq!(
            field_doc("PID-5", &field(0, false)),
            "PID-5: Patient name (PN, repeating, max length 48)"
        );
        let mut coded = field(3, false);
        coded.table = Some(1);
        assert_eq!(
            field_doc("PID-5", &coded),
            "PID-5: Patient name (PN, up to 3 repetitions, max length 48, table 0001)"
        );
    }
}
