//! Integrity manifest writer for HeartWise model directories.
//!
//! Hashes `model.json` and `model_info.json` and writes `manifest.json`
//! next to them. The loader verifies these hashes at startup.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_model -- <model_dir>
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use heartwise::adapters::artifact::{Manifest, MANIFEST_FILE};
use heartwise::adapters::JsonModelLoader;
use heartwise::config::ModelConfig;
use heartwise::ports::ModelLoader;

fn usage() -> &'static str {
    "Usage: hash_model <model_dir>"
}

fn parse_args() -> Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    let model_dir = match args.next().as_deref() {
        None | Some("-h" | "--help") => bail!(usage()),
        Some(dir) => PathBuf::from(dir),
    };
    if args.next().is_some() {
        bail!(usage());
    }

    if model_dir.is_file() {
        return model_dir
            .parent()
            .map(PathBuf::from)
            .context("Model path has no parent directory");
    }
    Ok(model_dir)
}

fn main() -> Result<()> {
    let model_dir = parse_args()?;

    let manifest = Manifest::for_dir(&model_dir)?;
    let manifest_path = model_dir.join(MANIFEST_FILE);
    let bytes = serde_json::to_vec_pretty(&manifest)?;
    std::fs::write(&manifest_path, bytes)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    // The manifest must only ever bind an artifact the application can load.
    let config = ModelConfig {
        model_dir: model_dir.clone(),
        require_manifest: true,
    };
    if let Err(e) = JsonModelLoader::new(&config).load() {
        std::fs::remove_file(&manifest_path)
            .with_context(|| format!("Failed to remove {}", manifest_path.display()))?;
        bail!("{} does not hold a loadable model: {e}", model_dir.display());
    }

    println!("Wrote manifest: {}", manifest_path.display());
    for (name, hash) in &manifest.files {
        println!("  {name}  sha256={hash}");
    }
    Ok(())
}
