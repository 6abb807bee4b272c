// tests/common/mod.rs

//! Shared fixtures for integration tests: server trees, packs and worlds.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;
use worldpack::archive;
use worldpack::{Capability, ProgressTracker, ServerLayout, SilentProgress};

/// A server root in a temp directory with the default layout.
///
/// Keep the struct alive to prevent cleanup.
pub struct TestServer {
    pub dir: TempDir,
    pub layout: ServerLayout,
}

impl TestServer {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ServerLayout::from_root(dir.path());
        Self { dir, layout }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a live world with the given level name and pack references
    pub fn live_world(&self, level_name: &str, behavior: &[(&str, [u64; 3])], resource: &[(&str, [u64; 3])]) {
        write_world(&self.layout.live_world, level_name, behavior, resource);
    }

    /// Package a world into the staging directory
    pub fn stage_world(
        &self,
        file_name: &str,
        level_name: &str,
        behavior: &[(&str, [u64; 3])],
        resource: &[(&str, [u64; 3])],
    ) -> PathBuf {
        let tree = tempfile::tempdir().unwrap();
        write_world(tree.path(), level_name, behavior, resource);
        let dest = self.layout.staging_dir.join(file_name);
        archive::write_dir(tree.path(), &dest, &SilentProgress::new()).unwrap();
        dest
    }

    /// Put an extracted pack folder in the pool
    pub fn pool_dir_pack(&self, dir_name: &str, uuid: &str, modules: &[&str], version: [u64; 3]) -> PathBuf {
        let dir = self.layout.pool_dir.join(dir_name);
        write_pack(&dir, uuid, dir_name, modules, version);
        dir
    }

    /// Package a world into the staging directory as a plain zip
    pub fn stage_zip_world(
        &self,
        file_name: &str,
        level_name: &str,
        behavior: &[(&str, [u64; 3])],
        resource: &[(&str, [u64; 3])],
    ) -> PathBuf {
        let tree = tempfile::tempdir().unwrap();
        write_world(tree.path(), level_name, behavior, resource);
        let dest = self.layout.staging_dir.join(file_name);
        zip_files(tree.path(), &dest);
        dest
    }

    /// Put a plain zip pack archive in the pool; packs as for `pool_archive`
    pub fn pool_zip(&self, file_name: &str, packs: &[(&str, &str, &[&str], [u64; 3])]) -> PathBuf {
        let tree = tempfile::tempdir().unwrap();
        for (root, uuid, modules, version) in packs {
            write_pack(&tree.path().join(root), uuid, uuid, modules, *version);
        }
        let dest = self.layout.pool_dir.join(file_name);
        zip_files(tree.path(), &dest);
        dest
    }

    /// Put a pack archive in the pool; each pack is (root, uuid, modules, version)
    pub fn pool_archive(&self, file_name: &str, packs: &[(&str, &str, &[&str], [u64; 3])]) -> PathBuf {
        let tree = tempfile::tempdir().unwrap();
        for (root, uuid, modules, version) in packs {
            let dir = if root.is_empty() {
                tree.path().to_path_buf()
            } else {
                tree.path().join(root)
            };
            write_pack(&dir, uuid, uuid, modules, *version);
        }
        let dest = self.layout.pool_dir.join(file_name);
        archive::write_dir(tree.path(), &dest, &SilentProgress::new()).unwrap();
        dest
    }

    /// Path of the installed directory for a pack
    pub fn installed(&self, capability: Capability, uuid: &str) -> PathBuf {
        self.layout.install_dir(capability).join(uuid)
    }

    /// pack_ids listed in one of the live world's reference documents
    pub fn referenced(&self, capability: Capability) -> Vec<String> {
        let path = self.layout.live_world.join(capability.reference_file());
        let content = fs::read(&path).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_slice(&content).unwrap();
        entries
            .iter()
            .map(|e| e["pack_id"].as_str().unwrap().to_string())
            .collect()
    }
}

pub fn manifest_json(uuid: &str, name: &str, modules: &[&str], version: [u64; 3]) -> String {
    let modules: Vec<String> = modules
        .iter()
        .map(|m| format!(r#"{{"type": "{}", "uuid": "{}-{}", "version": [1, 0, 0]}}"#, m, uuid, m))
        .collect();
    format!(
        r#"{{
    "format_version": 2,
    "header": {{"name": "{}", "uuid": "{}", "version": [{}, {}, {}]}},
    "modules": [{}]
}}"#,
        name,
        uuid,
        version[0],
        version[1],
        version[2],
        modules.join(", ")
    )
}

/// A pack folder with a manifest and a couple of payload files
pub fn write_pack(dir: &Path, uuid: &str, name: &str, modules: &[&str], version: [u64; 3]) {
    fs::create_dir_all(dir.join("texts")).unwrap();
    fs::write(dir.join("manifest.json"), manifest_json(uuid, name, modules, version)).unwrap();
    fs::write(dir.join("texts/en_US.lang"), format!("pack.name={}\n", name)).unwrap();
    fs::write(dir.join("pack_icon.png"), uuid.as_bytes()).unwrap();
}

/// A world directory with core data, a level name and reference documents
pub fn write_world(dir: &Path, level_name: &str, behavior: &[(&str, [u64; 3])], resource: &[(&str, [u64; 3])]) {
    fs::create_dir_all(dir.join("db")).unwrap();
    fs::write(dir.join("level.dat"), format!("level:{}", level_name)).unwrap();
    fs::write(dir.join("levelname.txt"), level_name).unwrap();
    fs::write(dir.join("db/CURRENT"), b"MANIFEST-000001\n").unwrap();
    fs::write(dir.join("db/000003.ldb"), vec![7u8; 4096]).unwrap();
    write_references(&dir.join("world_behavior_packs.json"), behavior);
    write_references(&dir.join("world_resource_packs.json"), resource);
}

fn write_references(path: &Path, refs: &[(&str, [u64; 3])]) {
    let entries: Vec<serde_json::Value> = refs
        .iter()
        .map(|(uuid, version)| serde_json::json!({"pack_id": uuid, "version": version}))
        .collect();
    fs::write(path, serde_json::to_vec_pretty(&entries).unwrap()).unwrap();
}

/// Zip the files under `tree` into `dest` with file entries only and no
/// directory records, the way most add-on tools and game exports do
pub fn zip_files(tree: &Path, dest: &Path) {
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(dest).unwrap());
    for entry in WalkDir::new(tree).sort_by_file_name() {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(tree)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(name, options).unwrap();
        zip.write_all(&fs::read(entry.path()).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

/// Progress tracker that drops a file at `path` once archiving starts,
/// standing in for a writer outside this process
pub struct ClaimsPathMidWrite {
    path: PathBuf,
    claimed: Mutex<bool>,
}

impl ClaimsPathMidWrite {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            claimed: Mutex::new(false),
        }
    }
}

impl ProgressTracker for ClaimsPathMidWrite {
    fn set_message(&self, _message: &str) {}

    fn set_length(&self, _length: u64) {
        let mut claimed = self.claimed.lock().unwrap();
        if !*claimed {
            fs::create_dir_all(self.path.parent().unwrap()).unwrap();
            fs::write(&self.path, b"written elsewhere").unwrap();
            *claimed = true;
        }
    }

    fn increment(&self, _amount: u64) {}

    fn position(&self) -> u64 {
        0
    }

    fn finish_with_message(&self, _message: &str) {}

    fn finish_with_error(&self, _message: &str) {}
}

/// Every regular file under `root` with its content, keyed by relative path
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    if !root.exists() {
        return files;
    }
    for entry in WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(root).unwrap();
            files.insert(
                relative.to_string_lossy().replace('\\', "/"),
                fs::read(entry.path()).unwrap(),
            );
        }
    }
    files
}
