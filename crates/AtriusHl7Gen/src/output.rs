use std::fs;
use std::path::{Path, PathBuf};

use atrius_hl7_schema::Hl7Version;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use tracing::debug;

use crate::directory_output_helpers::write_mod_index;
use crate::error::{GeneratorError, GeneratorResult};

/// The generated source for one HL7 version, kept as token streams until rendered.
///
/// The five modules reach each other through `super::`, so they must stay siblings: either
/// inline in one file ([`GeneratedVersion::render_single_file`]) or as files next to a
/// `mod.rs` ([`GeneratedVersion::write_directory`]).
#[derive(Debug, Clone)]
pub struct GeneratedVersion {
    pub version: Hl7Version,
    pub datatypes: TokenStream,
    pub segments: TokenStream,
    pub groups: TokenStream,
    pub messages: TokenStream,
    pub tables: TokenStream,
}

impl GeneratedVersion {
    /// Module names in emission order.
    pub const MODULES: [&'static str; 5] = ["datatypes", "segments", "groups", "messages", "tables"];

    fn module_tokens(&self, name: &str) -> Option<&TokenStream> {
        match name {
            "datatypes" => Some(&self.datatypes),
            "segments" => Some(&self.segments),
            "groups" => Some(&self.groups),
            "messages" => Some(&self.messages),
            "tables" => Some(&self.tables),
            _ => None,
        }
    }

    fn module_doc(&self, name: &str) -> String {
        let what = match name {
            "datatypes" => "Primitive and composite datatype views",
            "segments" => "Segment views, one accessor per declared field",
            "groups" => "Segment group views",
            "messages" => "Message structure views",
            _ => "Static field tables",
        };
        format!(" {what} for HL7 {}.", self.version)
    }

    /// `v2_3.rs` and friends.
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.version.module_name())
    }

    fn header(&self) -> String {
        format!(
            "// @generated by atrius-hl7-gen from the HL7 {} tables\n// DO NOT EDIT MANUALLY\n\n",
            self.version
        )
    }

    /// Renders all modules inline in one file, suitable for `include!`.
    ///
    /// The file holds only items (no inner attributes), so the including module decides
    /// which lints to allow.
    pub fn render_single_file(&self) -> GeneratorResult<String> {
        let modules = Self::MODULES.iter().map(|name| {
            let ident = format_ident!("{}", name);
            let doc = self.module_doc(name);
            let body = self.module_tokens(name).cloned().unwrap_or_default();
            quote! {
                #[doc = #doc]
                pub mod #ident {
                    #body
                }
            }
        });
        let tokens = quote!(#(#modules)*);
        let mut src = self.header();
        src.push_str(&unparse(&self.version.to_string(), tokens)?);
        Ok(src)
    }

    /// Renders a single module body as a standalone file.
    pub fn render_module(&self, name: &str) -> GeneratorResult<Option<String>> {
        let Some(tokens) = self.module_tokens(name) else {
            return Ok(None);
        };
        let mut src = self.header();
        src.push_str(&format!("//!{}\n\n", self.module_doc(name)));
        src.push_str(&unparse(name, tokens.clone())?);
        Ok(Some(src))
    }

    /// Writes `dir/mod.rs` plus one file per module. Returns the written paths.
    pub fn write_directory(&self, dir: &Path) -> GeneratorResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| GeneratorError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::new();
        for name in Self::MODULES {
            let path = dir.join(format!("{name}.rs"));
            let src = self.render_module(name)?.unwrap_or_default();
            fs::write(&path, src).map_err(|source| GeneratorError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }

        let index = dir.join("mod.rs");
        let header = format!("{}//! HL7 {} object model.\n\n", self.header(), self.version);
        write_mod_index(&index, &header, &Self::MODULES).map_err(|source| GeneratorError::Io {
            path: index.clone(),
            source,
        })?;
        written.push(index);

        debug!("Wrote HL7 {} model to {}", self.version, dir.display());
        Ok(written)
    }

    /// Writes the single-file rendering to `dir/<version>.rs`.
    pub fn write_single_file(&self, dir: &Path) -> GeneratorResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|source| GeneratorError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render_single_file()?).map_err(|source| GeneratorError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote HL7 {} model to {}", self.version, path.display());
        Ok(path)
    }
}

fn unparse(module: &str, tokens: TokenStream) -> GeneratorResult<String> {
    let file: syn::File = syn::parse2(tokens).map_err(|source| GeneratorError::Syntax {
        module: module.to_string(),
        source,
    })?;
    Ok(prettyplease::unparse(&file))
}
