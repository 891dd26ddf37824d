use atrius_hl7_schema::{ComponentDefinition, DatatypeDefinition, DatatypeKind, PrimitiveKind};
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use tracing::debug;

use crate::error::GeneratorResult;
use crate::format_helpers::{NameAllocator, doc_attrs, rust_ident};
use crate::gen_context::{GenContext, table_ident};

/// Emits the `datatypes` module body: one view type per primitive and composite.
pub(crate) fn generate_datatypes(ctx: &GenContext) -> GeneratorResult<TokenStream> {
    let mut items = Vec::with_capacity(ctx.schema.datatypes.len());
    for datatype in &ctx.schema.datatypes {
        items.push(datatype_tokens(ctx, datatype)?);
    }
    debug!("Generated {} datatype views", items.len());
    Ok(quote!(#(#items)*))
}

fn datatype_tokens(ctx: &GenContext, datatype: &DatatypeDefinition) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let ident = ctx.datatype_type(&datatype.name, &datatype.name)?;
    let table = table_ident("datatype", &datatype.name);

    let mut doc_lines = vec![if datatype.description.is_empty() {
        datatype.name.clone()
    } else {
        format!("{}: {}", datatype.name, datatype.description)
    }];
    let methods = match &datatype.kind {
        DatatypeKind::Primitive { value } => {
            doc_lines.push(String::new());
            doc_lines.push(format!("Primitive ({}).", value.as_str()));
            primitive_methods(rt, *value)
        }
        DatatypeKind::Composite { components } => composite_methods(ctx, datatype, components)?,
    };
    let docs = doc_attrs(&doc_lines);

    Ok(quote! {
        #docs
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct #ident<'a>(#rt::ValueRef<'a>);

        impl<'a> #rt::access::Datatype<'a> for #ident<'a> {
            fn spec() -> &'static #rt::spec::DatatypeSpec {
                &super::tables::#table
            }

            fn from_value(value: #rt::ValueRef<'a>) -> Self {
                Self(value)
            }

            fn value_ref(&self) -> #rt::ValueRef<'a> {
                self.0
            }
        }

        impl<'a> #ident<'a> {
            #methods
        }
    })
}

fn primitive_methods(rt: &TokenStream, kind: PrimitiveKind) -> TokenStream {
    let typed = match kind {
        PrimitiveKind::Text => quote!(),
        PrimitiveKind::Numeric => quote! {
            /// Parses the value as a decimal number.
            pub fn to_decimal(&self) -> Result<Option<#rt::Decimal>, #rt::Hl7Error> {
                #rt::access::to_decimal(self.0)
            }
        },
        PrimitiveKind::Date => quote! {
            /// Parses the value as an HL7 date, keeping its precision.
            pub fn to_date(&self) -> Result<Option<#rt::date_time::Hl7Date>, #rt::Hl7Error> {
                #rt::access::to_date(self.0)
            }
        },
        PrimitiveKind::DateTime => quote! {
            /// Parses the value as an HL7 date/time, keeping its precision and offset.
            pub fn to_datetime(&self) -> Result<Option<#rt::date_time::Hl7DateTime>, #rt::Hl7Error> {
                #rt::access::to_datetime(self.0)
            }
        },
        PrimitiveKind::Time => quote! {
            /// Parses the value as an HL7 time, keeping its precision.
            pub fn to_time(&self) -> Result<Option<#rt::date_time::Hl7Time>, #rt::Hl7Error> {
                #rt::access::to_time(self.0)
            }
        },
    };
    quote! {
        /// The unescaped value, `None` when empty.
        pub fn value(&self) -> Option<&'a str> {
            #rt::access::primitive_text(self.0)
        }

        #typed
    }
}

fn composite_methods(
    ctx: &GenContext,
    datatype: &DatatypeDefinition,
    components: &[ComponentDefinition],
) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let mut names = NameAllocator::new("component");
    let mut methods = Vec::with_capacity(components.len());
    for component in components {
        let owner = format!("{}.{}", datatype.name, component.position);
        let ty = ctx.datatype_type(&owner, &component.datatype)?;
        let name = rust_ident(&names.allocate(&component.name, component.position, false));
        let position = Literal::usize_unsuffixed(component.position);
        let mut doc = format!("{owner}: {} ({})", component.name, component.datatype);
        if let Some(table) = component.table {
            doc.push_str(&format!(", table {table:04}"));
        }
        let docs = doc_attrs(&[doc]);
        methods.push(quote! {
            #docs
            pub fn #name(&self) -> Option<#ty<'a>> {
                #rt::access::component(self.0, #position)
            }
        });
    }

    Ok(quote! {
        #(#methods)*

        /// Untyped access to a declared component by 1-based position.
        ///
        /// Panics when `position` is outside the component table.
        pub fn component(&self, position: usize) -> Option<#rt::ValueRef<'a>> {
            #rt::access::component_at::<Self>(self.0, position)
        }
    })
}
