//! On-disk session storage.
//!
//! A session is the unit of persistence for one storyboard run, addressed by
//! an opaque id. Layout under the configured output root:
//!
//! ```text
//! output/<session_id>/frame_001.png      ordered frame images
//! output/<session_id>/frame_002.png
//! output/<session_id>/metadata.json      {"frames":[{frame_number,description}]}
//! output/<session_id>/storyboard.pdf     rendered artifact (optional)
//! output/.temp/<run>/                    transient reference chain, one dir per run
//! ```
//!
//! The disk is the sole persistence mechanism — there is no in-memory
//! registry beyond process lifetime. This layer never renumbers or reorders;
//! frame filenames and metadata frame numbers stay in agreement because both
//! are written from the same immutable plan.

use crate::error::StoryboardError;
use crate::frames::{FrameDescription, GeneratedFrame, SessionMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the rendered artifact inside a session directory.
pub const PDF_FILENAME: &str = "storyboard.pdf";

/// Name of the metadata sidecar inside a session directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Maps session ids to directories of ordered frame images, a metadata
/// sidecar, and an optional rendered PDF.
#[derive(Debug, Clone)]
pub struct SessionStore {
    output_dir: PathBuf,
}

impl SessionStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Mint a fresh opaque session id.
    pub fn mint_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Directory holding one session's files.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.output_dir.join(session_id)
    }

    /// Root for transient reference images; each in-flight run claims its
    /// own subdirectory underneath.
    pub fn temp_dir(&self) -> PathBuf {
        self.output_dir.join(".temp")
    }

    /// Path of one frame image: `frame_NNN.png`, zero-padded to width 3 so
    /// lexicographic filename order equals numeric frame order.
    pub fn frame_path(&self, session_id: &str, frame_number: u32) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("frame_{frame_number:03}.png"))
    }

    /// Path of the rendered PDF for a session (whether or not it exists).
    pub fn pdf_path(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join(PDF_FILENAME)
    }

    /// Persist generated frames, creating the session directory if absent.
    /// Returns the written paths in input order.
    pub async fn save_frames(
        &self,
        frames: &[GeneratedFrame],
        session_id: &str,
    ) -> Result<Vec<PathBuf>, StoryboardError> {
        let dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoryboardError::SessionWriteFailed {
                path: dir.clone(),
                source: e,
            })?;

        let mut paths = Vec::with_capacity(frames.len());
        for frame in frames {
            let path = self.frame_path(session_id, frame.frame_number);
            tokio::fs::write(&path, &frame.image).await.map_err(|e| {
                StoryboardError::SessionWriteFailed {
                    path: path.clone(),
                    source: e,
                }
            })?;
            paths.push(path);
        }
        debug!(session = %session_id, frames = frames.len(), "saved session frames");
        Ok(paths)
    }

    /// Write the metadata sidecar for a session.
    pub async fn save_metadata(
        &self,
        frames: &[FrameDescription],
        session_id: &str,
    ) -> Result<(), StoryboardError> {
        let dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoryboardError::SessionWriteFailed {
                path: dir.clone(),
                source: e,
            })?;

        let metadata = SessionMetadata {
            frames: frames.to_vec(),
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StoryboardError::Internal(format!("metadata serialisation: {e}")))?;

        let path = dir.join(METADATA_FILENAME);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StoryboardError::SessionWriteFailed { path, source: e })
    }

    /// Load the metadata sidecar, ordered by frame number.
    ///
    /// Absent or corrupt metadata degrades to an empty list — callers treat
    /// descriptions as optional decoration, never a hard dependency.
    pub async fn load_metadata(&self, session_id: &str) -> Vec<FrameDescription> {
        let path = self.session_dir(session_id).join(METADATA_FILENAME);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<SessionMetadata>(&raw) {
            Ok(mut metadata) => {
                metadata.frames.sort_by_key(|f| f.frame_number);
                metadata.frames
            }
            Err(e) => {
                warn!(session = %session_id, "ignoring corrupt metadata sidecar: {e}");
                Vec::new()
            }
        }
    }

    /// List a session's frame images in ascending frame order.
    ///
    /// Sorted by filename, which equals numeric order given the fixed
    /// zero-padding width. Empty if the session directory is absent.
    pub async fn list_frame_paths(&self, session_id: &str) -> Vec<PathBuf> {
        let dir = self.session_dir(session_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut paths = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_frame_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        paths
    }

    /// Overwrite a frame image in place. The file must already exist — this
    /// is the edit flow's persistence step, not a create.
    pub async fn overwrite_frame(
        &self,
        session_id: &str,
        frame_number: u32,
        image: &[u8],
    ) -> Result<PathBuf, StoryboardError> {
        let path = self.frame_path(session_id, frame_number);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(StoryboardError::FrameNotFound { path }),
        }
        tokio::fs::write(&path, image)
            .await
            .map_err(|e| StoryboardError::SessionWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }

    /// Remove the rendered PDF if present; returns whether it existed.
    ///
    /// Used to invalidate a stale artifact before a frame edit. Removing a
    /// missing file is a successful no-op.
    pub async fn delete_pdf(&self, session_id: &str) -> bool {
        let path = self.pdf_path(session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(session = %session_id, "removed stale storyboard PDF");
                true
            }
            Err(_) => false,
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = SessionStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn save_frames_zero_pads_and_preserves_order() {
        let (_dir, store) = store();
        let frames = vec![
            GeneratedFrame {
                frame_number: 1,
                image: vec![1],
            },
            GeneratedFrame {
                frame_number: 2,
                image: vec![2],
            },
        ];
        let paths = store.save_frames(&frames, "sid").await.unwrap();
        assert!(paths[0].ends_with("frame_001.png"));
        assert!(paths[1].ends_with("frame_002.png"));
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn list_frame_paths_is_numeric_order() {
        let (_dir, store) = store();
        let session = store.session_dir("sid");
        std::fs::create_dir_all(&session).unwrap();
        // Created deliberately out of order; listing must not depend on
        // filesystem enumeration order.
        for name in ["frame_010.png", "frame_002.png", "frame_001.png"] {
            std::fs::write(session.join(name), b"x").unwrap();
        }
        std::fs::write(session.join(METADATA_FILENAME), b"{}").unwrap();

        let paths = store.list_frame_paths("sid").await;
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["frame_001.png", "frame_002.png", "frame_010.png"]);
    }

    #[tokio::test]
    async fn list_frame_paths_missing_session_is_empty() {
        let (_dir, store) = store();
        assert!(store.list_frame_paths("nope").await.is_empty());
    }

    #[tokio::test]
    async fn metadata_round_trip_sorted_by_frame_number() {
        let (_dir, store) = store();
        let frames = vec![
            FrameDescription {
                frame_number: 2,
                description: "second".into(),
            },
            FrameDescription {
                frame_number: 1,
                description: "first".into(),
            },
        ];
        store.save_metadata(&frames, "sid").await.unwrap();
        let loaded = store.load_metadata("sid").await;
        assert_eq!(loaded[0].frame_number, 1);
        assert_eq!(loaded[1].description, "second");
    }

    #[tokio::test]
    async fn corrupt_metadata_degrades_to_empty() {
        let (_dir, store) = store();
        let session = store.session_dir("sid");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join(METADATA_FILENAME), b"{not json").unwrap();
        assert!(store.load_metadata("sid").await.is_empty());
    }

    #[tokio::test]
    async fn delete_pdf_reports_existence() {
        let (_dir, store) = store();
        assert!(!store.delete_pdf("sid").await);

        let session = store.session_dir("sid");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(store.pdf_path("sid"), b"%PDF").unwrap();

        assert!(store.delete_pdf("sid").await);
        assert!(!store.pdf_path("sid").exists());
        assert!(!store.delete_pdf("sid").await);
    }

    #[tokio::test]
    async fn overwrite_missing_frame_is_not_found() {
        let (_dir, store) = store();
        let err = store.overwrite_frame("sid", 4, b"x").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
