use atrius_hl7_schema::{MemberDefinition, MemberReference};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use tracing::debug;

use crate::error::{GeneratorError, GeneratorResult};
use crate::format_helpers::{NameAllocator, doc_attrs, rust_ident, strip_structure_prefix};
use crate::gen_context::{GenContext, table_ident};

/// Emits the `groups` module body.
pub(crate) fn generate_groups(ctx: &GenContext) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let mut items = Vec::with_capacity(ctx.schema.groups.len());
    for group in &ctx.schema.groups {
        let ident = ctx
            .group_type(&group.name)
            .ok_or_else(|| missing_type("group", &group.name))?;
        let table = table_ident("group", &group.name);
        let docs = doc_attrs(&[format!("{} group", group.name)]);
        let accessors = member_accessors(ctx, &group.name, &group.members)?;
        items.push(quote! {
            #docs
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct #ident<'a>(&'a #rt::model::Group);

            impl<'a> #rt::access::GroupView<'a> for #ident<'a> {
                fn spec() -> &'static #rt::spec::GroupSpec {
                    &super::tables::#table
                }

                fn from_group(group: &'a #rt::model::Group) -> Self {
                    Self(group)
                }

                fn group(&self) -> &'a #rt::model::Group {
                    self.0
                }
            }

            impl<'a> #ident<'a> {
                #accessors
            }
        });
    }
    debug!("Generated {} group views", items.len());
    Ok(quote!(#(#items)*))
}

/// Emits the `messages` module body. A message view is a group view over the message's
/// root group, plus the `MessageView` link back to its structure table.
pub(crate) fn generate_messages(ctx: &GenContext) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let mut items = Vec::with_capacity(ctx.schema.messages.len());
    for message in &ctx.schema.messages {
        let ident = ctx
            .message_type(&message.name)
            .ok_or_else(|| missing_type("message", &message.name))?;
        let table = table_ident("message", &message.name);

        let mut doc_lines = vec![format!("{} message structure", message.name)];
        if !message.description.is_empty() {
            doc_lines.push(String::new());
            doc_lines.push(message.description.clone());
        }
        if !message.trigger_events.is_empty() {
            doc_lines.push(String::new());
            doc_lines.push(format!(
                "Used by {} {}.",
                message.message_type,
                message.trigger_events.join(", ")
            ));
        }
        let docs = doc_attrs(&doc_lines);
        let accessors = member_accessors(ctx, &message.name, &message.members)?;

        items.push(quote! {
            #docs
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct #ident<'a>(&'a #rt::model::Group);

            impl<'a> #rt::access::GroupView<'a> for #ident<'a> {
                fn spec() -> &'static #rt::spec::GroupSpec {
                    &super::tables::#table.structure
                }

                fn from_group(group: &'a #rt::model::Group) -> Self {
                    Self(group)
                }

                fn group(&self) -> &'a #rt::model::Group {
                    self.0
                }
            }

            impl<'a> #rt::access::MessageView<'a> for #ident<'a> {
                fn message_spec() -> &'static #rt::spec::MessageSpec {
                    &super::tables::#table
                }
            }

            impl<'a> #ident<'a> {
                #accessors
            }
        });
    }
    debug!("Generated {} message views", items.len());
    Ok(quote!(#(#items)*))
}

fn member_accessors(
    ctx: &GenContext,
    owner: &str,
    members: &[MemberDefinition],
) -> GeneratorResult<TokenStream> {
    let mut names = NameAllocator::new("member");
    let mut accessors = Vec::with_capacity(members.len());
    for (index, member) in members.iter().enumerate() {
        let member_name = member.member_name();
        let name = names.allocate(
            strip_structure_prefix(member_name),
            index + 1,
            member.repeating,
        );
        accessors.push(member_tokens(ctx, owner, member, &name)?);
    }
    Ok(quote!(#(#accessors)*))
}

fn member_tokens(
    ctx: &GenContext,
    owner: &str,
    member: &MemberDefinition,
    name: &str,
) -> GeneratorResult<TokenStream> {
    let rt = &ctx.rt;
    let view = ctx.member_view(owner, member)?;
    let key = member.member_name();
    let (one, all): (Ident, Ident) = match member.reference {
        MemberReference::Segment(_) => (
            format_ident!("member_segment"),
            format_ident!("member_segment_all"),
        ),
        MemberReference::Group(_) => (
            format_ident!("member_group"),
            format_ident!("member_group_all"),
        ),
    };
    let single = rust_ident(name);

    let presence = if member.required { "required" } else { "optional" };
    let mut doc = format!("{key} ({presence}");
    if member.repeating {
        doc.push_str(", repeating");
    }
    doc.push(')');
    let docs = doc_attrs(&[doc]);

    if !member.repeating {
        return Ok(quote! {
            #docs
            pub fn #single(&self) -> Option<#view> {
                #rt::access::#one(self.0, #key, 0)
            }
        });
    }

    let rep = format_ident!("{}_rep", name);
    let all_name = format_ident!("{}_all", name);
    let count = format_ident!("{}_count", name);
    Ok(quote! {
        #docs
        ///
        /// First repetition.
        pub fn #single(&self) -> Option<#view> {
            #rt::access::#one(self.0, #key, 0)
        }

        pub fn #rep(&self, rep: usize) -> Option<#view> {
            #rt::access::#one(self.0, #key, rep)
        }

        pub fn #all_name(&self) -> Vec<#view> {
            #rt::access::#all(self.0, #key)
        }

        pub fn #count(&self) -> usize {
            #rt::access::member_count(self.0, #key)
        }
    })
}

fn missing_type(kind: &'static str, name: &str) -> GeneratorError {
    GeneratorError::UnresolvedMember {
        owner: format!("{kind}s"),
        kind,
        name: name.to_string(),
    }
}
