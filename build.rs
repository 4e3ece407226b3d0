//! Build script for the discography export service.
//!
//! Copies the `.env.example` configuration template into the user's local
//! data directory, next to the `.env` file the service reads at startup:
//! - Linux: `~/.local/share/discostore/.env.example`
//! - macOS: `~/Library/Application Support/discostore/.env.example`
//! - Windows: `%LOCALAPPDATA%/discostore/.env.example`
//!
//! A missing template only produces a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("discostore");

    if env_example_path.is_file() {
        fs::create_dir_all(&out_dir)?;
        fs::copy(&env_example_path, out_dir.join(".env.example"))?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
