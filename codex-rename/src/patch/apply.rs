use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::matcher::LayoutMismatch;
use super::{BACKUP_SUFFIX, PatchResult, ensure_patch_applied};
use crate::host::ExtensionCatalog;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to back up {} to {}: {source}", path.display(), backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// What a patch attempt did to the installed extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchApplicationOutcome {
    NotInstalled,
    ExtensionFileMissing {
        extension_version: String,
        extension_file: PathBuf,
    },
    AlreadyPatched {
        extension_version: String,
        extension_file: PathBuf,
    },
    UnsupportedLayout {
        extension_version: String,
        extension_file: PathBuf,
        reason: LayoutMismatch,
    },
    /// Dry run only: the layout matched and a real run would patch.
    WouldPatch {
        extension_version: String,
        extension_file: PathBuf,
    },
    Patched {
        extension_version: String,
        extension_file: PathBuf,
        backup_path: PathBuf,
    },
}

impl PatchApplicationOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::NotInstalled => "not_installed",
            Self::ExtensionFileMissing { .. } => "extension_file_missing",
            Self::AlreadyPatched { .. } => "already_patched",
            Self::UnsupportedLayout { .. } => "unsupported_layout",
            Self::WouldPatch { .. } => "would_patch",
            Self::Patched { .. } => "patched",
        }
    }

    /// The on-disk bundle carries the rename command; a reload will pick it up.
    pub fn needs_reload(&self) -> bool {
        matches!(self, Self::Patched { .. } | Self::AlreadyPatched { .. })
    }

    pub fn extension_version(&self) -> Option<&str> {
        match self {
            Self::NotInstalled => None,
            Self::ExtensionFileMissing {
                extension_version, ..
            }
            | Self::AlreadyPatched {
                extension_version, ..
            }
            | Self::UnsupportedLayout {
                extension_version, ..
            }
            | Self::WouldPatch {
                extension_version, ..
            }
            | Self::Patched {
                extension_version, ..
            } => Some(extension_version.as_str()),
        }
    }
}

/// `<file>.bak-<UTC timestamp with : and . as ->-codex-rename-thread`
pub fn backup_path_for(file: &Path, at: DateTime<Utc>) -> PathBuf {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let mut name = OsString::from(file.as_os_str());
    name.push(format!(".bak-{stamp}-{BACKUP_SUFFIX}"));
    PathBuf::from(name)
}

/// Locates the installed extension and patches its entry file in place.
#[derive(Clone)]
pub struct PatchApplier {
    catalog: Arc<dyn ExtensionCatalog>,
    extension_id: String,
    dry_run: bool,
}

impl PatchApplier {
    pub fn new(catalog: Arc<dyn ExtensionCatalog>, extension_id: impl Into<String>) -> Self {
        Self {
            catalog,
            extension_id: extension_id.into(),
            dry_run: false,
        }
    }

    /// Stop short of writing; a matching layout reports `WouldPatch`.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    pub fn apply(&self) -> Result<PatchApplicationOutcome, PatchError> {
        let Some(extension) = self.catalog.find(&self.extension_id) else {
            tracing::info!(extension = %self.extension_id, "extension not installed");
            return Ok(PatchApplicationOutcome::NotInstalled);
        };

        let extension_version = extension.version.clone();
        let extension_file = extension.entry_file();
        if !extension_file.is_file() {
            tracing::warn!(file = %extension_file.display(), "extension entry file missing");
            return Ok(PatchApplicationOutcome::ExtensionFileMissing {
                extension_version,
                extension_file,
            });
        }

        let source = fs::read_to_string(&extension_file).map_err(|source| PatchError::Read {
            path: extension_file.clone(),
            source,
        })?;

        let patched = match ensure_patch_applied(&source) {
            PatchResult::AlreadyPatched { .. } => {
                tracing::info!(version = %extension_version, "extension already patched");
                return Ok(PatchApplicationOutcome::AlreadyPatched {
                    extension_version,
                    extension_file,
                });
            }
            PatchResult::UnsupportedLayout { reason, .. } => {
                tracing::warn!(version = %extension_version, %reason, "unsupported extension layout");
                return Ok(PatchApplicationOutcome::UnsupportedLayout {
                    extension_version,
                    extension_file,
                    reason,
                });
            }
            PatchResult::Patched { source } => source.into_owned(),
        };

        if self.dry_run {
            return Ok(PatchApplicationOutcome::WouldPatch {
                extension_version,
                extension_file,
            });
        }

        let backup_path = backup_path_for(&extension_file, Utc::now());
        fs::copy(&extension_file, &backup_path).map_err(|source| PatchError::Backup {
            path: extension_file.clone(),
            backup: backup_path.clone(),
            source,
        })?;
        tracing::info!(backup = %backup_path.display(), "backed up extension entry file");

        write_atomic(&extension_file, patched.as_bytes()).map_err(|source| PatchError::Write {
            path: extension_file.clone(),
            source,
        })?;
        tracing::info!(
            file = %extension_file.display(),
            version = %extension_version,
            "patched extension with rename command"
        );

        Ok(PatchApplicationOutcome::Patched {
            extension_version,
            extension_file,
            backup_path,
        })
    }
}

/// Replace `path` via a sibling temp file and rename, keeping its permissions.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".codex-rename-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{RENAME_REGISTRATION_SIGNATURE, fixtures};
    use crate::testing::FakeCatalog;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn install(dir: &TempDir, contents: &str) -> PathBuf {
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let file = out.join("extension.js");
        fs::write(&file, contents).unwrap();
        file
    }

    fn applier(dir: &TempDir) -> PatchApplier {
        PatchApplier::new(
            Arc::new(FakeCatalog::installed_at(dir.path(), "0.4.12")),
            "openai.chatgpt",
        )
    }

    fn backups(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path().join("out"))
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().contains(".bak-"))
            .collect()
    }

    #[test]
    fn backup_name_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 8, 30, 12).unwrap()
            + chrono::Duration::milliseconds(345);
        let path = backup_path_for(Path::new("/ext/out/extension.js"), at);
        assert_eq!(
            path,
            PathBuf::from("/ext/out/extension.js.bak-2026-10-17T08-30-12-345Z-codex-rename-thread")
        );
    }

    #[test]
    fn not_installed() {
        let applier = PatchApplier::new(Arc::new(FakeCatalog::empty()), "openai.chatgpt");
        assert_eq!(applier.apply().unwrap(), PatchApplicationOutcome::NotInstalled);
    }

    #[test]
    fn entry_file_missing() {
        let dir = TempDir::new().unwrap();
        let outcome = applier(&dir).apply().unwrap();
        assert_eq!(
            outcome,
            PatchApplicationOutcome::ExtensionFileMissing {
                extension_version: "0.4.12".into(),
                extension_file: dir.path().join("out").join("extension.js"),
            }
        );
    }

    #[test]
    fn unsupported_layout_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let original = "function activate(e){e.push(1)}";
        let file = install(&dir, original);

        let outcome = applier(&dir).apply().unwrap();
        assert_eq!(outcome.status(), "unsupported_layout");
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
        assert!(backups(&dir).is_empty());
    }

    #[test]
    fn already_patched_skips_write() {
        let dir = TempDir::new().unwrap();
        let original = format!("x.{RENAME_REGISTRATION_SIGNATURE},f);");
        let file = install(&dir, &original);

        let outcome = applier(&dir).apply().unwrap();
        assert_eq!(outcome.status(), "already_patched");
        assert!(outcome.needs_reload());
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
        assert!(backups(&dir).is_empty());
    }

    #[test]
    fn patch_backs_up_then_rewrites() {
        let dir = TempDir::new().unwrap();
        let original = fixtures::bundle();
        let file = install(&dir, &original);

        let outcome = applier(&dir).apply().unwrap();
        let PatchApplicationOutcome::Patched {
            extension_version,
            extension_file,
            backup_path,
        } = outcome.clone()
        else {
            panic!("expected patched, got {outcome:?}");
        };
        assert_eq!(extension_version, "0.4.12");
        assert_eq!(extension_file, file);

        let name = backup_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("extension.js.bak-"));
        assert!(name.ends_with("-codex-rename-thread"));
        assert_eq!(backups(&dir), vec![backup_path.clone()]);
        assert_eq!(fs::read_to_string(&backup_path).unwrap(), original);

        let patched = fs::read_to_string(&file).unwrap();
        assert!(patched.contains(RENAME_REGISTRATION_SIGNATURE));
        assert!(patched.len() > original.len());
    }

    #[test]
    fn second_run_reports_already_patched() {
        let dir = TempDir::new().unwrap();
        install(&dir, &fixtures::bundle());
        let applier = applier(&dir);

        assert_eq!(applier.apply().unwrap().status(), "patched");
        assert_eq!(applier.apply().unwrap().status(), "already_patched");
        assert_eq!(backups(&dir).len(), 1);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        install(&dir, &fixtures::bundle());
        applier(&dir).apply().unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("out"))
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let original = fixtures::bundle();
        let file = install(&dir, &original);

        let outcome = applier(&dir).dry_run(true).apply().unwrap();
        assert_eq!(outcome.status(), "would_patch");
        assert!(!outcome.needs_reload());
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
        assert!(backups(&dir).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file = install(&dir, &fixtures::bundle());
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        applier(&dir).apply().unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = PatchApplicationOutcome::UnsupportedLayout {
            extension_version: "1.0.0".into(),
            extension_file: PathBuf::from("/x/out/extension.js"),
            reason: LayoutMismatch::MissingNewChatRegistration,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "unsupported_layout");
        assert_eq!(value["extension_version"], "1.0.0");
        assert_eq!(value["reason"]["kind"], "missing_new_chat_registration");
    }
}
