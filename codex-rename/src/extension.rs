use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::host::{ExtensionCatalog, InstalledExtension};

/// Published id of the Codex extension.
pub const CODEX_EXTENSION_ID: &str = "openai.chatgpt";

/// Extension directories of the editors that ship the Codex extension.
pub fn default_extension_roots() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    [".vscode", ".vscode-insiders", ".cursor", ".windsurf"]
        .iter()
        .map(|editor| home.join(editor).join("extensions"))
        .collect()
}

/// Finds extensions installed as `<root>/<publisher.name>-<version>[-<platform>]`.
#[derive(Clone, Debug, Default)]
pub struct FsExtensionCatalog {
    roots: Vec<PathBuf>,
}

impl FsExtensionCatalog {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        Self { roots: unique }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Every install of `extension_id` across all roots, in scan order.
    ///
    /// Sibling extensions whose id merely starts with `extension_id`
    /// (`openai.chatgpt-nightly`) are excluded.
    pub fn installs(&self, extension_id: &str) -> Vec<InstalledExtension> {
        let prefix = format!("{}-", extension_id.to_ascii_lowercase());
        let mut found = Vec::new();

        for root in &self.roots {
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(root = %root.display(), error = %e, "skipping extension root");
                    continue;
                }
            };
            let mut dirs: Vec<PathBuf> = entries
                .flatten()
                .filter(|entry| entry.path().is_dir())
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .to_ascii_lowercase()
                        .starts_with(&prefix)
                })
                .map(|entry| entry.path())
                .collect();
            dirs.sort();

            for dir in dirs {
                let Some(version) = identify_install(&dir, extension_id, &prefix) else {
                    tracing::debug!(dir = %dir.display(), "not an install of {extension_id}");
                    continue;
                };
                found.push(InstalledExtension {
                    id: extension_id.to_string(),
                    version,
                    install_path: dir,
                });
            }
        }

        found
    }
}

impl ExtensionCatalog for FsExtensionCatalog {
    /// Highest version among installs that ship an entry file; ties keep the
    /// first root scanned. Installs without one are only returned when nothing
    /// else exists, so the caller can report the missing file.
    fn find(&self, extension_id: &str) -> Option<InstalledExtension> {
        let (runnable, broken): (Vec<_>, Vec<_>) = self
            .installs(extension_id)
            .into_iter()
            .partition(|install| install.entry_file().is_file());
        let best = highest(runnable).or_else(|| highest(broken));
        if let Some(ext) = &best {
            tracing::debug!(path = %ext.install_path.display(), version = %ext.version, "found extension");
        }
        best
    }
}

fn highest(installs: Vec<InstalledExtension>) -> Option<InstalledExtension> {
    let mut best: Option<InstalledExtension> = None;
    for install in installs {
        let newer = match &best {
            Some(current) => compare_versions(&install.version, &current.version) == Ordering::Greater,
            None => true,
        };
        if newer {
            best = Some(install);
        }
    }
    best
}

/// The fields of `package.json` that identify an install.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    publisher: Option<String>,
    name: Option<String>,
    version: Option<String>,
}

impl Manifest {
    /// `publisher.name`, when both are present.
    fn id(&self) -> Option<String> {
        match (self.publisher.as_deref(), self.name.as_deref()) {
            (Some(publisher), Some(name)) => Some(format!("{publisher}.{name}")),
            _ => None,
        }
    }

    fn version(&self) -> Option<String> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn read_manifest(dir: &Path) -> Option<Manifest> {
    let data = fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str(&data).ok()
}

/// Version of the install at `dir`, or `None` when it is some other extension.
///
/// A manifest id must equal `extension_id`. Without one, the directory name
/// must continue with a version after the id.
fn identify_install(dir: &Path, extension_id: &str, prefix: &str) -> Option<String> {
    let manifest = read_manifest(dir).unwrap_or_default();
    let dir_version = version_from_dir_name(dir, prefix);
    match manifest.id() {
        Some(id) if !id.eq_ignore_ascii_case(extension_id) => return None,
        None if dir_version.is_none() => return None,
        _ => {}
    }
    Some(
        manifest
            .version()
            .or(dir_version)
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

/// `openai.chatgpt-0.4.12-darwin-arm64` → `0.4.12`
fn version_from_dir_name(dir: &Path, prefix: &str) -> Option<String> {
    let name = dir.file_name()?.to_string_lossy().to_ascii_lowercase();
    let rest = name.strip_prefix(prefix)?;
    if !rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Some(version.trim_end_matches('.').to_string())
}

/// Dot-separated numeric comparison. Non-numeric parts count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|part| {
                part.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    };
    let (pa, pb) = (parse(a), parse(b));
    for idx in 0..pa.len().max(pb.len()) {
        let av = pa.get(idx).copied().unwrap_or(0);
        let bv = pb.get(idx).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}
