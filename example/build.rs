use std::{env, fs, path::PathBuf};

use polyglot_compiler::{compile_set, Emitter, ImportTable, RustEmitter, Schema};

const SCHEMAS: [&str; 2] = ["schema/geo.json", "schema/shapes.json"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    for path in SCHEMAS {
        println!("cargo:rerun-if-changed={}", path);
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let mut schemas = Vec::new();
    for path in SCHEMAS {
        schemas.push(Schema::from_json(&fs::read_to_string(path)?)?);
    }

    let emitter = RustEmitter::default();
    let mut table = ImportTable::new();
    for (_, result) in compile_set(&schemas, &mut table)? {
        let compiled = result?;
        fs::write(out_dir.join(emitter.file_name(&compiled)), emitter.emit(&compiled)?)?;
    }
    Ok(())
}
