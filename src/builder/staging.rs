use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Blank,
    Preview,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Blank => write!(f, "Blank"),
            Kind::Preview => write!(f, "Preview"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Pdf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagingError {
    #[error("Please upload a valid image file (JPG, JPEG, PNG, or PDF)")]
    UnsupportedType { content_type: String },
}

/// User-selected content with the MIME type it was declared as. Nothing is checked yet.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub file_name: String,
    pub content_type: String,
    pub contents: Vec<u8>,
}

impl FileHandle {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            contents,
        }
    }

    /// Reads a file from disk, declaring its type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, content_type_for_path(path), contents))
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn media_kind(content_type: &str) -> Option<MediaKind> {
    match content_type {
        "image/jpeg" | "image/png" | "image/jpg" => Some(MediaKind::Image),
        "application/pdf" => Some(MediaKind::Pdf),
        _ => None,
    }
}

/// A file that passed the type gate, tagged with its media kind.
#[derive(Debug, Clone)]
pub struct StagedFile {
    handle: FileHandle,
    media: MediaKind,
}

impl StagedFile {
    pub fn file_name(&self) -> &str {
        &self.handle.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.handle.content_type
    }

    pub fn contents(&self) -> &[u8] {
        &self.handle.contents
    }

    pub fn media(&self) -> MediaKind {
        self.media
    }
}

impl TryFrom<FileHandle> for StagedFile {
    type Error = StagingError;

    fn try_from(handle: FileHandle) -> Result<Self, Self::Error> {
        let media = media_kind(&handle.content_type).ok_or_else(|| {
            StagingError::UnsupportedType {
                content_type: handle.content_type.clone(),
            }
        })?;
        Ok(Self { handle, media })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SidePair {
    pub blank: Option<StagedFile>,
    pub preview: Option<StagedFile>,
}

impl SidePair {
    pub fn is_complete(&self) -> bool {
        self.blank.is_some() && self.preview.is_some()
    }

    fn slot_mut(&mut self, kind: Kind) -> &mut Option<StagedFile> {
        match kind {
            Kind::Blank => &mut self.blank,
            Kind::Preview => &mut self.preview,
        }
    }

    fn slot(&self, kind: Kind) -> Option<&StagedFile> {
        match kind {
            Kind::Blank => self.blank.as_ref(),
            Kind::Preview => self.preview.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadSet {
    pub front: SidePair,
    pub back: SidePair,
}

impl UploadSet {
    /// Stages a file in a slot, replacing whatever was there. A rejected file leaves the
    /// slot unchanged.
    pub fn stage(&mut self, side: Side, kind: Kind, file: FileHandle) -> Result<(), StagingError> {
        let staged = StagedFile::try_from(file)?;
        tracing::debug!(%side, %kind, file = staged.file_name(), "staged template file");
        *self.side_mut(side).slot_mut(kind) = Some(staged);
        Ok(())
    }

    pub fn unstage(&mut self, side: Side, kind: Kind) {
        *self.side_mut(side).slot_mut(kind) = None;
    }

    pub fn get(&self, side: Side, kind: Kind) -> Option<&StagedFile> {
        self.side(side).slot(kind)
    }

    pub fn side(&self, side: Side) -> &SidePair {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    /// Multipart field name and file for every slot that goes out with the upload. Back
    /// slots are skipped for single-sided templates.
    pub fn upload_parts(&self, both_sides: bool) -> Vec<(&'static str, &StagedFile)> {
        let mut slots = vec![
            ("frontBlank", self.front.blank.as_ref()),
            ("frontPreview", self.front.preview.as_ref()),
        ];
        if both_sides {
            slots.push(("backBlank", self.back.blank.as_ref()));
            slots.push(("backPreview", self.back.preview.as_ref()));
        }

        slots
            .into_iter()
            .filter_map(|(field, file)| file.map(|file| (field, file)))
            .collect()
    }

    fn side_mut(&mut self, side: Side) -> &mut SidePair {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }
}
