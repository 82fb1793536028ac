// build.rs
// Compiles the GLSL shaders under resources/shaders to SPIR-V with glslc.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_STAGES: [&str; 2] = ["vert", "frag"];

/// Compile every vertex and fragment shader in `shader_dir` into `target_dir`.
///
/// Output files keep the stage in the name (`mesh.vert` -> `mesh.vert.spv`) so a
/// vertex and fragment shader can share a stem.
fn compile_shaders(shader_dir: &Path, target_dir: &Path, glslc: &Path) -> usize {
    let entries = match std::fs::read_dir(shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at: {:?}", shader_dir);
            return 0;
        }
    };

    let mut compiled = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_stage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SHADER_STAGES.contains(&ext));
        if !is_stage {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let out_file = target_dir.join(format!("{file_name}.spv"));

        let up_to_date = match (std::fs::metadata(&path), std::fs::metadata(&out_file)) {
            (Ok(src), Ok(dst)) => match (src.modified(), dst.modified()) {
                (Ok(src_time), Ok(dst_time)) => dst_time >= src_time,
                _ => false,
            },
            _ => false,
        };
        if up_to_date {
            eprintln!("info: Shader {file_name} is up to date");
            continue;
        }

        let status = Command::new(glslc).arg(&path).arg("-o").arg(&out_file).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {file_name} -> {:?}", out_file);
                compiled += 1;
            }
            Ok(s) => panic!("glslc failed for {:?} with exit code {:?}", path, s.code()),
            Err(e) => panic!("Failed to run glslc for {:?}: {}", path, e),
        }
    }
    compiled
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let workspace_root = manifest_dir.join("../..");
    let shader_dir = workspace_root.join("resources/shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Ok(vulkan_sdk) = env::var("VULKAN_SDK") else {
        eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
        return;
    };

    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(&vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(&vulkan_sdk).join("bin").join("glslc")
    };
    if !glslc.exists() {
        eprintln!("warning: glslc not found at {:?}, shader compilation skipped", glslc);
        return;
    }

    let target_dir = workspace_root.join("target/shaders");
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create {:?}: {}", target_dir, e);
        return;
    }

    let compiled = compile_shaders(&shader_dir, &target_dir, &glslc);
    eprintln!("info: Compiled {compiled} shader(s)");
}
