use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const ENV_PREFIX: &str = "ARCHIVIST_";

fn rust_sources(root: &Path) -> Vec<PathBuf> {
    let mut pending = vec![root.to_path_buf()];
    let mut found = Vec::new();
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|entry| entry.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                found.push(path);
            }
        }
    }
    found
}

fn env_keys_in(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .filter(|token| token.len() > ENV_PREFIX.len() && token.starts_with(ENV_PREFIX))
}

fn main() {
    let mut keys = BTreeSet::new();
    for file in rust_sources(Path::new("src")) {
        if let Ok(source) = fs::read_to_string(&file) {
            keys.extend(env_keys_in(&source).map(str::to_owned));
        }
    }
    let entries: String = keys.iter().map(|key| format!("    \"{key}\",\n")).collect();
    let generated = format!("pub const GENERATED_ENV_ALLOWLIST: &[&str] = &[\n{entries}];\n");
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(Path::new(&out_dir).join("archivist_env_allowlist.rs"), generated)
        .expect("failed to write env allowlist");

    // Lets `status` tell a running watcher from a rebuilt binary.
    let built = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        built.as_secs(),
        built.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
