use std::io::{self, Write};
use std::path::Path;

/// Writes a `mod.rs` declaring `modules`, sorted and deduplicated so the index is stable.
pub(crate) fn write_mod_index(mod_rs_path: &Path, header: &str, modules: &[&str]) -> io::Result<()> {
    let mut modules = modules.to_vec();
    modules.sort();
    modules.dedup();

    let mut file = std::fs::File::create(mod_rs_path)?;
    write!(file, "{header}")?;
    for m in modules {
        writeln!(file, "pub mod {m};")?;
    }
    Ok(())
}
