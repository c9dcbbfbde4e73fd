//! Compile the bundled WGSL shaders to SPIR-V.
//!
//! Every `*.wgsl` file in the source directory is validated and written next
//! to the output directory with a `.spv` extension, so a renderer configured
//! with [`ShaderFormat::Spirv`](deferred_renderer::ShaderFormat) can load them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example compile_shaders -- [source_dir] [output_dir]
//! ```

use std::path::PathBuf;

use deferred_renderer::shader::compile_wgsl_to_spirv;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let source_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/shaders")));
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| source_dir.clone());
    std::fs::create_dir_all(&output_dir)?;

    let mut compiled = 0;
    for entry in std::fs::read_dir(&source_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("wgsl") {
            continue;
        }
        // basic.vert.wgsl -> basic.vert.spv
        let Some(stem) = path.file_stem() else {
            continue;
        };

        let source = std::fs::read_to_string(&path)?;
        let words = compile_wgsl_to_spirv(&source)?;
        let target = output_dir.join(format!("{}.spv", stem.to_string_lossy()));
        std::fs::write(&target, bytemuck::cast_slice::<u32, u8>(&words))?;
        log::info!("{} -> {} ({} words)", path.display(), target.display(), words.len());
        compiled += 1;
    }

    log::info!("Compiled {compiled} shaders");
    Ok(())
}
