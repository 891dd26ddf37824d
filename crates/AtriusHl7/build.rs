use std::env;
use std::path::PathBuf;

use atrius_hl7_generator::{GeneratorConfig, generate_version};
use atrius_hl7_schema::SchemaRegistry;

fn main() {
    let resources_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources");
    println!("cargo:rerun-if-changed={}", resources_dir.display());

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let registry = SchemaRegistry::from_manifest(resources_dir.join("manifest.json"))
        .expect("Failed to load resources/manifest.json");

    // Generated code reaches the runtime through `crate::` since it is included in place.
    let config = GeneratorConfig::default();

    for version in registry.versions() {
        // Only versions with an enabled cargo feature are generated
        let feature = format!("CARGO_FEATURE_{}", version.feature_name());
        if env::var_os(&feature).is_none() {
            continue;
        }

        let schema = registry
            .load(version)
            .unwrap_or_else(|e| panic!("Failed to load HL7 {version} schema: {e}"));
        let generated = generate_version(&schema, &config)
            .unwrap_or_else(|e| panic!("Failed to generate HL7 {version} model: {e}"));
        generated
            .write_single_file(&out_dir)
            .unwrap_or_else(|e| panic!("Failed to write HL7 {version} model: {e}"));
    }
}
