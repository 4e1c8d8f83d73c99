//! Uploaded assets.
//!
//! Files stream into `incoming/` under a random name, then are either renamed to their
//! permanent id-prefixed location (`flyers/`, `mapping/`) or removed. `incoming/` is wiped daily.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EventError;

const INCOMING: &str = "incoming";
const FLYERS: &str = "flyers";
const MAPPING: &str = "mapping";

#[derive(Clone, Debug)]
pub struct UploadDirs {
    root: PathBuf,
}

/// Renames done so far for one submission, so a failure part-way can put them back.
#[derive(Debug, Default)]
pub struct Relocation {
    moved: Vec<(PathBuf, PathBuf)>,
}

impl Relocation {
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// Moves every relocated file back to where it was staged, newest first.
    /// A file that cannot be moved back is removed instead.
    pub async fn rollback(self) {
        for (staged, placed) in self.moved.into_iter().rev() {
            match tokio::fs::rename(&placed, &staged).await {
                Ok(()) => debug!("Returned {} to {}", placed.display(), staged.display()),
                Err(e) => {
                    warn!("Could not return {}: {}", placed.display(), e);
                    if let Err(e) = tokio::fs::remove_file(&placed).await {
                        warn!("Could not remove {}: {}", placed.display(), e);
                    }
                }
            }
        }
    }
}

/// A file sitting in the temporary area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Sanitized extension including the dot, or empty.
    pub extension: String,
}

impl UploadDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn incoming(&self) -> PathBuf {
        self.root.join(INCOMING)
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        for dir in [INCOMING, FLYERS, MAPPING] {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }

    /// Creates an empty staged file for an upload named `original_name` by the client.
    pub async fn stage(&self, original_name: Option<&str>) -> std::io::Result<(StagedFile, File)> {
        tokio::fs::create_dir_all(self.incoming()).await?;
        let extension = original_name.map(sanitized_extension).unwrap_or_default();
        let path = self
            .incoming()
            .join(format!("temp_{}{}", Uuid::new_v4().simple(), extension));
        let file = File::create(&path).await?;
        Ok((StagedFile { path, extension }, file))
    }

    /// Moves the flyer to `flyers/<id><ext>`. Returns the path relative to the uploads root.
    pub async fn relocate_flyer(
        &self,
        moves: &mut Relocation,
        file: &StagedFile,
        event_id: &str,
    ) -> Result<String, EventError> {
        self.relocate(moves, file, FLYERS, &format!("{}{}", event_id, file.extension))
            .await
    }

    /// Moves mapping images to `mapping/<id>-<n><ext>`, numbered from 1 in upload order.
    pub async fn relocate_mapping(
        &self,
        moves: &mut Relocation,
        files: &[StagedFile],
        event_id: &str,
    ) -> Result<Vec<String>, EventError> {
        let mut out = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let name = format!("{}-{}{}", event_id, index + 1, file.extension);
            out.push(self.relocate(moves, file, MAPPING, &name).await?);
        }
        Ok(out)
    }

    async fn relocate(
        &self,
        moves: &mut Relocation,
        file: &StagedFile,
        dir: &str,
        name: &str,
    ) -> Result<String, EventError> {
        let target_dir = self.root.join(dir);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(EventError::storage)?;
        let target = target_dir.join(name);
        // rename leaves the source in place on failure
        tokio::fs::rename(&file.path, &target)
            .await
            .map_err(|e| {
                EventError::storage(format!("moving {} failed: {}", file.path.display(), e))
            })?;
        moves.moved.push((file.path.clone(), target));
        Ok(format!("{}/{}", dir, name))
    }

    /// Empties the temporary area. Returns how many files were removed.
    pub async fn cleanup_incoming(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(self.incoming()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!("Could not list {}: {}", self.incoming().display(), e);
                return 0;
            }
        };
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error reading {}: {}", self.incoming().display(), e);
                    break;
                }
            };
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", entry.path().display(), e),
            }
        }
        removed
    }
}

/// Removes staged files, logging (not failing on) each error.
pub async fn discard(files: &[StagedFile]) {
    for file in files {
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => debug!("Discarded upload {}", file.path.display()),
            Err(e) => warn!("Could not discard upload {}: {}", file.path.display(), e),
        }
    }
}

fn sanitized_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
