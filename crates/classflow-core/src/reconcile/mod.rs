//! Diff/patch reconciliation engine.
//!
//! Keeps a generated composite artifact in sync with its evolving class
//! definition while preserving hand-written edits. The baseline is always
//! re-derived by rendering the current definition; the persisted state is
//! the artifact itself plus an optional sibling patch file holding the
//! captured edits.

pub mod diff;
pub mod patch;
pub mod state;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ClassflowError, ClassflowResult};
use crate::reconcile::patch::{apply_hunks, FilePatch, PatchRecord};

pub use diff::{diff_lines, Hunk, HunkLine};
pub use patch::{ApplyOutcome, DIFF_CONTEXT};
pub use state::ArtifactState;

/// What a reconciliation run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First render; artifact written verbatim.
    Seeded(Vec<PathBuf>),
    /// Artifact already equals the baseline; nothing written.
    Clean,
    /// Stored edits replayed on top of the fresh baseline; the patch file
    /// was re-derived against the new baseline.
    Reapplied {
        files: Vec<PathBuf>,
        patch_path: PathBuf,
    },
    /// `force` discarded local modifications that had no patch.
    Forced(Vec<PathBuf>),
}

/// Reconciles one composite artifact directory against freshly rendered
/// baseline content.
pub struct Reconciler {
    /// Directory holding the artifact files.
    dir: PathBuf,
    /// Artifact name; the patch and conflict files derive from it.
    name: String,
}

impl Reconciler {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Path of the stored patch file.
    pub fn patch_path(&self) -> PathBuf {
        self.dir.join(format!("{}.diff", self.name.replace('/', "-")))
    }

    /// Path of the conflict output file.
    pub fn rej_path(&self) -> PathBuf {
        self.dir.join(format!("{}.rej", self.name.replace('/', "-")))
    }

    /// Determine the artifact state against a fresh baseline.
    ///
    /// An artifact with none of its files on disk is unseeded; one with
    /// any file differing from the baseline is diverged.
    pub fn state(&self, fresh: &BTreeMap<String, String>) -> ClassflowResult<ArtifactState> {
        let on_disk = self.read_files(fresh)?;
        if on_disk.values().all(|v| v.is_none()) {
            return Ok(ArtifactState::Unseeded);
        }
        let clean = fresh
            .iter()
            .all(|(path, text)| on_disk.get(path).and_then(|v| v.as_deref()) == Some(text.as_str()));
        if clean {
            Ok(ArtifactState::Clean)
        } else {
            Ok(ArtifactState::Diverged {
                has_patch: self.patch_path().exists(),
            })
        }
    }

    /// Run the full reconciliation state machine.
    ///
    /// Never overwrites diverged files without applying their patch;
    /// `force` is the explicit escape hatch when no patch exists.
    pub fn reconcile(
        &self,
        fresh: &BTreeMap<String, String>,
        force: bool,
    ) -> ClassflowResult<ReconcileOutcome> {
        match self.state(fresh)? {
            ArtifactState::Unseeded => {
                let written = self.write_files(fresh)?;
                info!(artifact = %self.name, "seeded new artifact");
                Ok(ReconcileOutcome::Seeded(written))
            }
            ArtifactState::Clean => {
                // A patch left behind after edits were reverted is stale.
                let patch_path = self.patch_path();
                if patch_path.exists() {
                    debug!(path = %patch_path.display(), "removing stale patch");
                    fs::remove_file(&patch_path)?;
                }
                Ok(ReconcileOutcome::Clean)
            }
            ArtifactState::Diverged { has_patch: false } => {
                if !force {
                    return Err(ClassflowError::DivergedWithoutPatch(
                        self.dir.join(fresh.keys().next().cloned().unwrap_or_default()),
                    ));
                }
                let written = self.write_files(fresh)?;
                info!(artifact = %self.name, "overwrote modified artifact (--force)");
                Ok(ReconcileOutcome::Forced(written))
            }
            ArtifactState::Diverged { has_patch: true } => self.reapply(fresh),
        }
    }

    /// Replay the stored patch on top of the fresh baseline.
    fn reapply(&self, fresh: &BTreeMap<String, String>) -> ClassflowResult<ReconcileOutcome> {
        let patch_path = self.patch_path();
        let record = PatchRecord::parse(
            &fs::read_to_string(&patch_path)?,
            &patch_path.display().to_string(),
        )?;

        let mut patched: BTreeMap<String, String> = BTreeMap::new();
        let mut applied = 0usize;
        let mut total = 0usize;
        let mut rejected: Vec<FilePatch> = Vec::new();
        for (path, baseline) in fresh {
            match record.file(path) {
                Some(file_patch) => {
                    total += file_patch.hunks.len();
                    let outcome = apply_hunks(baseline, &file_patch.hunks);
                    applied += outcome.applied;
                    if !outcome.conflicts.is_empty() {
                        rejected.push(FilePatch {
                            path: path.clone(),
                            hunks: outcome.conflicts,
                        });
                    }
                    patched.insert(path.clone(), outcome.text);
                }
                None => {
                    patched.insert(path.clone(), baseline.clone());
                }
            }
        }

        // Hunks for files the baseline no longer produces cannot apply;
        // they are conflicts, not silently droppable.
        for file_patch in &record.files {
            if !fresh.contains_key(&file_patch.path) {
                total += file_patch.hunks.len();
                rejected.push(file_patch.clone());
            }
        }

        // Record the replayed edits against the new baseline, so the next
        // diff measures only further edits.
        let regenerated = PatchRecord::from_texts(
            fresh
                .iter()
                .map(|(path, baseline)| (path.as_str(), baseline.as_str(), patched[path].as_str())),
        );

        let written = self.write_files(&patched)?;

        if rejected.is_empty() {
            fs::remove_file(self.rej_path()).ok();
            if regenerated.is_empty() {
                // Every hunk was already part of the baseline.
                fs::remove_file(&patch_path)?;
            } else {
                self.write_atomic(&patch_path, &regenerated.render())?;
            }
            info!(artifact = %self.name, hunks = applied, "reapplied stored edits");
            Ok(ReconcileOutcome::Reapplied {
                files: written,
                patch_path,
            })
        } else {
            let rej_path = self.rej_path();
            let conflicts: Vec<String> = rejected
                .iter()
                .flat_map(|f| f.hunks.iter().map(move |h| format!("{}:{}", f.path, h.header())))
                .collect();
            let rej_record = PatchRecord { files: rejected };
            self.write_atomic(&rej_path, &rej_record.render())?;
            if regenerated.is_empty() {
                fs::remove_file(&patch_path)?;
            } else {
                self.write_atomic(&patch_path, &regenerated.render())?;
            }
            Err(ClassflowError::PatchConflict {
                applied,
                total,
                conflicts,
                rej_path,
            })
        }
    }

    /// Capture the current divergence as the stored patch (save).
    ///
    /// Returns the patch record and its path; a clean artifact removes
    /// any stale patch and reports there is nothing to capture.
    pub fn save_patch(
        &self,
        fresh: &BTreeMap<String, String>,
    ) -> ClassflowResult<(PatchRecord, PathBuf)> {
        let on_disk = self.read_files(fresh)?;
        let record = PatchRecord::from_texts(fresh.iter().map(|(path, baseline)| {
            (
                path.as_str(),
                baseline.as_str(),
                on_disk
                    .get(path)
                    .and_then(|v| v.as_deref())
                    .unwrap_or_default(),
            )
        }));

        let patch_path = self.patch_path();
        if record.is_empty() {
            if patch_path.exists() {
                fs::remove_file(&patch_path)?;
            }
            return Err(ClassflowError::NothingToPatch(self.name.clone()));
        }

        self.write_atomic(&patch_path, &record.render())?;
        info!(artifact = %self.name, path = %patch_path.display(), "patch file written");
        Ok((record, patch_path))
    }

    fn read_files(
        &self,
        fresh: &BTreeMap<String, String>,
    ) -> ClassflowResult<BTreeMap<String, Option<String>>> {
        let mut on_disk = BTreeMap::new();
        for path in fresh.keys() {
            let full = self.dir.join(path);
            let content = match fs::read_to_string(&full) {
                Ok(text) => Some(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            on_disk.insert(path.clone(), content);
        }
        Ok(on_disk)
    }

    fn write_files(&self, files: &BTreeMap<String, String>) -> ClassflowResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(files.len());
        for (path, content) in files {
            let full = self.dir.join(path);
            self.write_atomic(&full, content)?;
            written.push(full);
        }
        Ok(written)
    }

    /// Write to a temporary sibling and rename, so an aborted run never
    /// leaves a half-written artifact.
    fn write_atomic(&self, path: &Path, content: &str) -> ClassflowResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
