use std::collections::HashSet;

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

/// Words that need the `r#` prefix to be used as identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers either.
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "super", "Self", "_"];

/// Method names the runtime traits or the generated impls already use.
pub(crate) const RESERVED_METHODS: &[&str] = &[
    "component",
    "from_group",
    "from_segment",
    "from_value",
    "group",
    "message_spec",
    "segment",
    "spec",
    "to_date",
    "to_datetime",
    "to_decimal",
    "to_time",
    "value",
    "value_ref",
];

/// Converts an HL7 long name ("Patient ID (internal ID)", "Mother's maiden name") to a
/// snake_case identifier stem. Returns an empty string when nothing usable remains.
pub fn snake_name(long_name: &str) -> String {
    let cleaned: String = long_name.chars().filter(|c| *c != '\'').collect();
    cleaned.to_snake_case()
}

/// Converts a schema name ("PID", "CM_MSG", "ORU_R01_PATIENT") to an UpperCamelCase type
/// name. Names that would not start with a letter get `prefix` in front.
pub fn type_name(name: &str, prefix: &str) -> String {
    let camel = name.to_upper_camel_case();
    match camel.chars().next() {
        Some(first) if first.is_ascii_alphabetic() && camel != "Self" => camel,
        _ => format!("{prefix}{camel}"),
    }
}

/// Name of the static table entry for a schema item, e.g. `SEGMENT_PID`.
pub fn table_name(kind: &str, name: &str) -> String {
    format!("{}_{}", kind.to_shouty_snake_case(), name.to_shouty_snake_case())
}

/// Group names carry their message structure as a prefix (`ORU_R01_PATIENT`); accessors
/// drop it so a member reads as `patient()`.
pub fn strip_structure_prefix(name: &str) -> &str {
    let mut parts = name.splitn(3, '_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(event), Some(rest))
            if kind.len() == 3 && event.len() == 3 && !rest.is_empty() =>
        {
            rest
        }
        _ => name,
    }
}

/// Builds an identifier, escaping Rust keywords.
///
/// ```ignore
/// assert_eq!(rust_ident("type").to_string(), "r#type");
/// assert_eq!(rust_ident("patient_name").to_string(), "patient_name");
/// ```
pub fn rust_ident(name: &str) -> Ident {
    if NON_RAW_KEYWORDS.contains(&name) {
        Ident::new(&format!("{name}_"), Span::call_site())
    } else if KEYWORDS.contains(&name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

/// Hands out accessor names for one generated type.
///
/// Every accessor claims its base name and, when it repeats, the `_rep`, `_all` and
/// `_count` forms. A base whose forms are already taken is suffixed with the item's
/// position, so `field_count` from one field never shadows another field's count.
pub struct NameAllocator {
    used: HashSet<String>,
    fallback: &'static str,
}

impl NameAllocator {
    /// `fallback` names items whose long name yields no identifier ("field", "component").
    pub fn new(fallback: &'static str) -> Self {
        NameAllocator {
            used: RESERVED_METHODS.iter().map(|m| m.to_string()).collect(),
            fallback,
        }
    }

    pub fn allocate(&mut self, long_name: &str, position: usize, repeating: bool) -> String {
        let mut base = snake_name(long_name);
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            base = format!("{}_{position}", self.fallback);
        }
        if self.forms(&base, repeating).iter().any(|f| self.used.contains(f)) {
            base = format!("{base}_{position}");
        }
        for form in self.forms(&base, repeating) {
            self.used.insert(form);
        }
        base
    }

    fn forms(&self, base: &str, repeating: bool) -> Vec<String> {
        let mut forms = vec![base.to_string()];
        if repeating {
            forms.push(format!("{base}_rep"));
            forms.push(format!("{base}_all"));
            forms.push(format!("{base}_count"));
        }
        forms
    }
}

/// Cleans schema text for use in a doc attribute.
pub fn escape_doc_comment(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("*/", "*\\/")
        .replace("/*", "/\\*")
        .trim()
        .to_string()
}

/// One `#[doc]` attribute per line; prettyplease renders them as `///` comments.
pub fn doc_attrs(lines: &[String]) -> TokenStream {
    let mut out = Vec::new();
    for line in lines {
        for part in escape_doc_comment(line).split('\n') {
            if part.trim().is_empty() {
                out.push(quote!(#[doc = ""]));
            } else {
                let text = format!(" {}", part.trim());
                out.push(quote!(#[doc = #text]));
            }
        }
    }
    quote!(#(#out)*)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_names_from_long_names() {
        assert_eq!(snake_name("Patient name"), "patient_name");
        assert_eq!(snake_name("Patient ID (internal ID)"), "patient_id_internal_id");
        assert_eq!(snake_name("Mother's maiden name"), "mothers_maiden_name");
        assert_eq!(snake_name("Date/time of message"), "date_time_of_message");
        assert_eq!(snake_name("Set ID - NK1"), "set_id_nk1");
        assert_eq!(snake_name("Placer field 1"), "placer_field_1");
        assert_eq!(snake_name(" - "), "");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name("PID", "Segment"), "Pid");
        assert_eq!(type_name("CM_MSG", "Datatype"), "CmMsg");
        assert_eq!(type_name("ORU_R01_PATIENT", "Group"), "OruR01Patient");
        assert_eq!(type_name("1XX", "Segment"), "Segment1xx");
        assert_eq!(type_name("", "Datatype"), "Datatype");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(table_name("segment", "PID"), "SEGMENT_PID");
        assert_eq!(table_name("group", "ORU_R01_PATIENT"), "GROUP_ORU_R01_PATIENT");
        assert_eq!(table_name("datatype", "CM_MSG"), "DATATYPE_CM_MSG");
    }

    #[test]
    fn test_structure_prefix() {
        assert_eq!(strip_structure_prefix("ORU_R01_PATIENT_RESULT"), "PATIENT_RESULT");
        assert_eq!(strip_structure_prefix("ORM_O01_ORDER"), "ORDER");
        assert_eq!(strip_structure_prefix("NTE"), "NTE");
        assert_eq!(strip_structure_prefix("NOTES_AND_COMMENTS"), "NOTES_AND_COMMENTS");
    }

    #[test]
    fn test_keywords_become_raw() {
        assert_eq!(rust_ident("type").to_string(), "r#type");
        assert_eq!(rust_ident("use").to_string(), "r#use");
        assert_eq!(rust_ident("self").to_string(), "self_");
        assert_eq!(rust_ident("city").to_string(), "city");
    }

    #[test]
    fn test_allocator_suffixes_collisions() {
        let mut names = NameAllocator::new("field");
        assert_eq!(names.allocate("Phone number", 1, false), "phone_number");
        assert_eq!(names.allocate("Phone number", 7, false), "phone_number_7");
        assert_eq!(names.allocate("Value", 3, false), "value_3");
        assert_eq!(names.allocate("", 4, false), "field_4");
        assert_eq!(names.allocate("1st contact", 5, false), "field_5");

        // A repeating "Alias" claims alias_count, so a later "Alias count" moves aside.
        assert_eq!(names.allocate("Alias", 8, true), "alias");
        assert_eq!(names.allocate("Alias count", 9, false), "alias_count_9");
    }
}
