fn main() {
    let crate_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out = std::path::Path::new(&crate_dir).join("include/unisearch.h");

    println!("cargo:rerun-if-changed=src/");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("UNISEARCH_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    // A header failure should not block building the library itself.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            if let Some(dir) = out.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            bindings.write_to_file(&out);
        }
        Err(e) => println!("cargo:warning=failed to generate C header: {e}"),
    }
}
