use std::path::PathBuf;

use atrius_hl7_generator::format_helpers::{NameAllocator, rust_ident, type_name};
use atrius_hl7_generator::{GeneratorConfig, GeneratorError, generate_version};
use atrius_hl7_schema::{Hl7Schema, Hl7Version, SchemaRegistry};

fn registry() -> SchemaRegistry {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../AtriusHl7/resources/manifest.json");
    SchemaRegistry::from_manifest(manifest).expect("resource manifest loads")
}

fn load(version: Hl7Version) -> Hl7Schema {
    registry().load(version).expect("resource schema is valid")
}

fn generated_file(schema: &Hl7Schema) -> syn::File {
    let generated = generate_version(schema, &GeneratorConfig::default()).unwrap();
    syn::parse_file(&generated.render_single_file().unwrap()).expect("output parses as Rust")
}

fn module<'f>(file: &'f syn::File, name: &str) -> &'f [syn::Item] {
    file.items
        .iter()
        .find_map(|item| match item {
            syn::Item::Mod(m) if m.ident == name => m.content.as_ref().map(|(_, items)| &items[..]),
            _ => None,
        })
        .unwrap_or_else(|| panic!("module {name} missing"))
}

/// The inherent impl block of `type_name` inside `items`.
fn inherent_methods<'f>(items: &'f [syn::Item], type_name: &str) -> Vec<&'f syn::ImplItemFn> {
    items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Impl(imp) if imp.trait_.is_none() => Some(imp),
            _ => None,
        })
        .filter(|imp| match &*imp.self_ty {
            syn::Type::Path(p) => p.path.segments.last().is_some_and(|s| s.ident == type_name),
            _ => false,
        })
        .flat_map(|imp| imp.items.iter())
        .filter_map(|item| match item {
            syn::ImplItem::Fn(f) => Some(f),
            _ => None,
        })
        .collect()
}

fn method_names(methods: &[&syn::ImplItemFn]) -> Vec<String> {
    methods.iter().map(|m| m.sig.ident.to_string()).collect()
}

/// `Option<super::datatypes::Pn<'a>>` -> "Pn"
fn returned_type(method: &syn::ImplItemFn) -> String {
    let syn::ReturnType::Type(_, ty) = &method.sig.output else {
        panic!("{} returns nothing", method.sig.ident);
    };
    let syn::Type::Path(outer) = &**ty else {
        panic!("unexpected return type");
    };
    let last = outer.path.segments.last().unwrap();
    let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
        return last.ident.to_string();
    };
    args.args
        .iter()
        .find_map(|arg| match arg {
            syn::GenericArgument::Type(syn::Type::Path(inner)) => {
                Some(inner.path.segments.last().unwrap().ident.to_string())
            }
            _ => None,
        })
        .unwrap_or_else(|| last.ident.to_string())
}

#[test]
fn every_segment_exposes_exactly_its_declared_fields() {
    for version in [Hl7Version::V2_1, Hl7Version::V2_3, Hl7Version::V2_4] {
        let schema = load(version);
        let file = generated_file(&schema);
        let segments = module(&file, "segments");

        for segment in &schema.segments {
            let methods = inherent_methods(segments, &type_name(&segment.name, "Segment"));
            let mut names = NameAllocator::new("field");
            let mut expected = Vec::new();
            let mut singles = Vec::new();
            for field in &segment.fields {
                let repeating = field.repeatability().is_repeating();
                let base = names.allocate(&field.name, field.position, repeating);
                let single = rust_ident(&base).to_string();
                singles.push((single.clone(), type_name(&field.datatype, "Datatype")));
                expected.push(single);
                if repeating {
                    expected.push(format!("{base}_rep"));
                    expected.push(format!("{base}_all"));
                    expected.push(format!("{base}_count"));
                }
            }
            assert_eq!(
                method_names(&methods),
                expected,
                "HL7 {version} segment {}",
                segment.name
            );

            for (single, datatype) in singles {
                let method = methods
                    .iter()
                    .find(|m| m.sig.ident == single)
                    .expect("accessor present");
                assert_eq!(
                    returned_type(method),
                    datatype,
                    "HL7 {version} {}.{single}",
                    segment.name
                );
            }
        }
    }
}

#[test]
fn single_valued_patient_name_has_no_indexed_form() {
    let schema = load(Hl7Version::V2_1);
    let pid5 = &schema.segment("PID").unwrap().fields[4];
    assert_eq!(pid5.name, "Patient name");
    assert_eq!(pid5.datatype, "PN");
    assert!(pid5.required);
    assert_eq!(pid5.max_repetitions, 1);
    assert_eq!(pid5.max_length, Some(48));

    let file = generated_file(&schema);
    let names = method_names(&inherent_methods(module(&file, "segments"), "Pid"));
    assert!(names.contains(&"patient_name".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("patient_name_")));

    // PID-9 repeats, so it gets all three extra forms.
    for form in ["patient_alias", "patient_alias_rep", "patient_alias_all", "patient_alias_count"] {
        assert!(names.contains(&form.to_string()), "{form}");
    }
}

#[test]
fn optional_repeating_group_member_gets_indexed_forms() {
    let schema = load(Hl7Version::V2_3);
    let file = generated_file(&schema);
    let methods = inherent_methods(module(&file, "groups"), "OrmO01Patient");
    let names = method_names(&methods);
    assert_eq!(
        names,
        vec!["pid", "nte", "nte_rep", "nte_all", "nte_count", "pv1"]
    );
    let nte = methods.iter().find(|m| m.sig.ident == "nte").unwrap();
    assert_eq!(returned_type(nte), "Nte");

    let message = method_names(&inherent_methods(module(&file, "messages"), "OruR01"));
    assert_eq!(
        message,
        vec![
            "msh",
            "patient_result",
            "patient_result_rep",
            "patient_result_all",
            "patient_result_count"
        ]
    );
}

#[test]
fn obr_differs_between_versions() {
    let v21 = load(Hl7Version::V2_1);
    let v23 = load(Hl7Version::V2_3);
    assert_eq!(v21.segment("OBR").unwrap().fields.len(), 36);
    assert_eq!(v23.segment("OBR").unwrap().fields.len(), 43);

    let file21 = generated_file(&v21);
    let file23 = generated_file(&v23);
    let obr21 = method_names(&inherent_methods(module(&file21, "segments"), "Obr"));
    let obr23 = method_names(&inherent_methods(module(&file23, "segments"), "Obr"));
    assert!(obr23.contains(&"planned_patient_transport_comment".to_string()));
    assert!(!obr21.contains(&"planned_patient_transport_comment".to_string()));
    assert!(obr23.len() > obr21.len());
}

#[test]
fn composite_components_and_primitive_helpers() {
    let schema = load(Hl7Version::V2_3);
    let file = generated_file(&schema);
    let datatypes = module(&file, "datatypes");

    let xtn = method_names(&inherent_methods(datatypes, "Xtn"));
    assert_eq!(xtn[0], "phone_number");
    assert_eq!(xtn[6], "phone_number_7");
    assert_eq!(xtn.last().unwrap(), "component");

    assert_eq!(method_names(&inherent_methods(datatypes, "Nm")), vec!["value", "to_decimal"]);
    assert_eq!(method_names(&inherent_methods(datatypes, "Dt")), vec!["value", "to_date"]);
    assert_eq!(method_names(&inherent_methods(datatypes, "Dtm")), vec!["value", "to_datetime"]);
    assert_eq!(method_names(&inherent_methods(datatypes, "Tm")), vec!["value", "to_time"]);
    assert_eq!(method_names(&inherent_methods(datatypes, "St")), vec!["value"]);

    let ts = inherent_methods(datatypes, "Ts");
    assert_eq!(returned_type(ts[0]), "Dtm");
}

#[test]
fn keywords_become_raw_identifiers() {
    let schema = load(Hl7Version::V2_1);
    let file = generated_file(&schema);
    // AD.7 is "Type".
    let ad = method_names(&inherent_methods(module(&file, "datatypes"), "Ad"));
    assert!(ad.contains(&"r#type".to_string()), "{ad:?}");
}

#[test]
fn generation_is_deterministic() {
    for version in [Hl7Version::V2_1, Hl7Version::V2_3, Hl7Version::V2_4] {
        let schema = load(version);
        let first = generate_version(&schema, &GeneratorConfig::default())
            .unwrap()
            .render_single_file()
            .unwrap();
        let second = generate_version(&schema, &GeneratorConfig::default())
            .unwrap()
            .render_single_file()
            .unwrap();
        assert_eq!(first, second);

        // Reordering the schema file does not change the tables either.
        let mut shuffled = schema.clone();
        shuffled.segments.reverse();
        shuffled.datatypes.reverse();
        let tables = |s: &Hl7Schema| {
            generate_version(s, &GeneratorConfig::default())
                .unwrap()
                .render_module("tables")
                .unwrap()
                .unwrap()
        };
        assert_eq!(tables(&schema), tables(&shuffled));
    }
}

#[test]
fn single_file_output_has_no_inner_attributes() {
    let schema = load(Hl7Version::V2_4);
    let file = generated_file(&schema);
    assert!(file.attrs.is_empty());
    let names: Vec<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Mod(m) => Some(m.ident.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["datatypes", "segments", "groups", "messages", "tables"]);
}

#[test]
fn tables_reference_the_configured_runtime_path() {
    let schema = load(Hl7Version::V2_1);
    let generated = generate_version(
        &schema,
        &GeneratorConfig::default().with_runtime_path("atrius_hl7_lib"),
    )
    .unwrap();
    let tables = generated.render_module("tables").unwrap().unwrap();
    assert!(tables.contains("pub static SEGMENT_PID: atrius_hl7_lib::spec::SegmentSpec"));
    assert!(tables.contains("pub static TABLES: atrius_hl7_lib::spec::VersionTables"));
    assert!(tables.contains("atrius_hl7_lib::Hl7Version::V2_1"));
    assert!(!tables.contains("crate::"));
}

#[test]
fn directory_output_writes_index_and_modules() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load(Hl7Version::V2_1);
    let generated = generate_version(&schema, &GeneratorConfig::default()).unwrap();
    let written = generated.write_directory(&dir.path().join("v2_1")).unwrap();
    assert_eq!(written.len(), 6);

    let index = std::fs::read_to_string(dir.path().join("v2_1/mod.rs")).unwrap();
    assert!(index.starts_with("// @generated"));
    assert!(index.contains("pub mod datatypes;\npub mod groups;\npub mod messages;"));

    let segments = std::fs::read_to_string(dir.path().join("v2_1/segments.rs")).unwrap();
    syn::parse_file(&segments).expect("module file parses");
    assert!(segments.contains("pub struct Pid<'a>"));
}

#[test]
fn process_writes_every_registered_version() {
    let dir = tempfile::tempdir().unwrap();
    let written = atrius_hl7_generator::process_hl7_version(
        &registry(),
        None,
        dir.path(),
        &GeneratorConfig::default(),
        true,
    )
    .unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["v2_1.rs", "v2_3.rs", "v2_4.rs"]);
}

#[test]
fn invalid_schema_is_rejected_before_generation() {
    let mut schema = load(Hl7Version::V2_1);
    schema.segments[0].fields[0].datatype = "NOPE".to_string();
    let err = generate_version(&schema, &GeneratorConfig::default()).unwrap_err();
    assert!(matches!(err, GeneratorError::Schema(_)));
}
