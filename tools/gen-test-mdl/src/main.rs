//! Write a small synthetic MDL v10 file
//!
//! Usage: `gen-test-mdl [OUTPUT]` (default `assets/sample.mdl`)

use std::path::{Path, PathBuf};

use gen_test_mdl::sample_model;

fn main() -> std::io::Result<()> {
    let output_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/sample.mdl"));

    let size = write_sample(&output_path)?;
    println!("Generated {} ({} bytes)", output_path.display(), size);
    Ok(())
}

fn write_sample(path: &Path) -> std::io::Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = sample_model().build();
    std::fs::write(path, &data)?;
    Ok(data.len())
}
