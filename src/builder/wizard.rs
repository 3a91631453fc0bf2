use std::future::Future;

use thiserror::Error;

use crate::builder::sizes::{DimensionErrors, DimensionSelector, TemplateDraft};
use crate::builder::staging::{FileHandle, Kind, Side, StagingError, UploadSet};
use crate::client::ApiError;
use crate::rest_types::{Category, Orientation, Template, TemplateRecord, UploadedUrlSet};

const UPLOAD_FALLBACK_MESSAGE: &str = "Failed to upload template files";
const COMMIT_FALLBACK_MESSAGE: &str = "Failed to create template";

/// The two endpoints the wizard submits to.
pub trait TemplateBackend {
    fn upload_template_files(
        &self,
        uploads: &UploadSet,
        both_sides: bool,
    ) -> impl Future<Output = Result<UploadedUrlSet, ApiError>>;

    /// Resolves to `None` when the server accepted the record but its echo of the created
    /// template could not be read.
    fn create_template(
        &self,
        record: &TemplateRecord,
    ) -> impl Future<Output = Result<Option<Template>, ApiError>>;
}

impl<T: TemplateBackend> TemplateBackend for &T {
    fn upload_template_files(
        &self,
        uploads: &UploadSet,
        both_sides: bool,
    ) -> impl Future<Output = Result<UploadedUrlSet, ApiError>> {
        (**self).upload_template_files(uploads, both_sides)
    }

    fn create_template(
        &self,
        record: &TemplateRecord,
    ) -> impl Future<Output = Result<Option<Template>, ApiError>> {
        (**self).create_template(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    CollectDimensions,
    CollectUploads,
    SaveModalOpen,
    Committed,
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardStep::CollectDimensions => write!(f, "collecting dimensions"),
            WizardStep::CollectUploads => write!(f, "collecting uploads"),
            WizardStep::SaveModalOpen => write!(f, "saving the template"),
            WizardStep::Committed => write!(f, "committed"),
        }
    }
}

/// Where the caller should go after a wizard action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    TemplateList,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveForm {
    pub template_name: String,
    pub category: Option<Category>,
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("Please fix the errors in custom dimensions")]
    InvalidDimensions(DimensionErrors),
    #[error("Unknown card size '{0}'")]
    UnknownSize(String),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("Please upload both blank and preview templates for {0} side")]
    MissingUploads(Side),
    #[error("Please enter a template name")]
    MissingTemplateName,
    #[error("Please select a template category")]
    MissingCategory,
    #[error("Please select template orientation")]
    MissingOrientation,
    #[error("{0}")]
    UploadFailed(String),
    #[error("{0}")]
    CommitFailed(String),
    #[error("Not available while {0}")]
    WrongStep(WizardStep),
}

/// Drives one template creation from dimensions to the committed record.
///
/// Submitting takes `&mut self`, so a wizard never has more than one request in flight.
pub struct TemplateWizard<B> {
    backend: B,
    step: WizardStep,
    dimensions: DimensionSelector,
    draft: Option<TemplateDraft>,
    uploads: UploadSet,
    uploaded: Option<UploadedUrlSet>,
    save_form: SaveForm,
    committed: Option<TemplateRecord>,
    created: Option<Template>,
}

impl<B: TemplateBackend> TemplateWizard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            step: WizardStep::CollectDimensions,
            dimensions: DimensionSelector::default(),
            draft: None,
            uploads: UploadSet::default(),
            uploaded: None,
            save_form: SaveForm::default(),
            committed: None,
            created: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn dimensions(&self) -> &DimensionSelector {
        &self.dimensions
    }

    pub fn dimensions_mut(&mut self) -> Result<&mut DimensionSelector, WizardError> {
        self.expect_step(WizardStep::CollectDimensions)?;
        Ok(&mut self.dimensions)
    }

    pub fn select_size(&mut self, size_id: &str) -> Result<(), WizardError> {
        if self.dimensions_mut()?.select(size_id) {
            Ok(())
        } else {
            Err(WizardError::UnknownSize(size_id.to_string()))
        }
    }

    pub fn draft(&self) -> Option<&TemplateDraft> {
        self.draft.as_ref()
    }

    pub fn uploads(&self) -> &UploadSet {
        &self.uploads
    }

    pub fn stage(&mut self, side: Side, kind: Kind, file: FileHandle) -> Result<(), WizardError> {
        self.expect_step(WizardStep::CollectUploads)?;
        Ok(self.uploads.stage(side, kind, file)?)
    }

    pub fn unstage(&mut self, side: Side, kind: Kind) -> Result<(), WizardError> {
        self.expect_step(WizardStep::CollectUploads)?;
        self.uploads.unstage(side, kind);
        Ok(())
    }

    pub fn uploaded_urls(&self) -> Option<&UploadedUrlSet> {
        self.uploaded.as_ref()
    }

    pub fn save_form(&self) -> &SaveForm {
        &self.save_form
    }

    pub fn save_form_mut(&mut self) -> Result<&mut SaveForm, WizardError> {
        self.expect_step(WizardStep::SaveModalOpen)?;
        Ok(&mut self.save_form)
    }

    /// The record the server accepted, once committed.
    pub fn committed(&self) -> Option<&TemplateRecord> {
        self.committed.as_ref()
    }

    /// The server's view of the created template, when its response carried a readable one.
    pub fn created(&self) -> Option<&Template> {
        self.created.as_ref()
    }

    fn both_sides(&self) -> bool {
        self.dimensions.sides().both_sides()
    }

    /// Guard for leaving the upload step.
    pub fn check_uploads(&self) -> Result<(), WizardError> {
        if !self.uploads.front.is_complete() {
            return Err(WizardError::MissingUploads(Side::Front));
        }
        if self.both_sides() && !self.uploads.back.is_complete() {
            return Err(WizardError::MissingUploads(Side::Back));
        }
        Ok(())
    }

    /// Advances the wizard: confirms dimensions on step one, uploads the staged files on
    /// step two. A failed upload keeps every staged file for the retry.
    pub async fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::CollectDimensions => {
                let draft = self
                    .dimensions
                    .confirm()
                    .map_err(WizardError::InvalidDimensions)?;
                tracing::info!(
                    size = %draft.size_id,
                    width = draft.width,
                    height = draft.height,
                    unit = %draft.unit,
                    "template dimensions configured"
                );
                self.draft = Some(draft);
                self.step = WizardStep::CollectUploads;
            }
            WizardStep::CollectUploads => {
                self.check_uploads()?;
                let both_sides = self.both_sides();

                tracing::info!(both_sides, "uploading template files");
                let urls = self
                    .backend
                    .upload_template_files(&self.uploads, both_sides)
                    .await
                    .map_err(|e| {
                        tracing::warn!(error = %e, "template upload failed");
                        WizardError::UploadFailed(e.user_message(UPLOAD_FALLBACK_MESSAGE))
                    })?;

                if both_sides && !urls.has_back() {
                    return Err(WizardError::UploadFailed(
                        "Upload response is missing the back side files".to_string(),
                    ));
                }

                self.uploaded = Some(urls);
                self.step = WizardStep::SaveModalOpen;
            }
            other => return Err(WizardError::WrongStep(other)),
        }

        Ok(self.step)
    }

    /// Assembles the record the commit endpoint receives from the draft, the uploaded URLs
    /// and the save form.
    pub fn build_record(&self) -> Result<TemplateRecord, WizardError> {
        let name = self.save_form.template_name.trim();
        if name.is_empty() {
            return Err(WizardError::MissingTemplateName);
        }
        let category = self.save_form.category.ok_or(WizardError::MissingCategory)?;
        let orientation = self
            .save_form
            .orientation
            .ok_or(WizardError::MissingOrientation)?;

        let (Some(draft), Some(urls)) = (&self.draft, &self.uploaded) else {
            return Err(WizardError::WrongStep(self.step));
        };

        let (back_blank_url, back_preview_url) = if draft.both_sides {
            (urls.back_blank_url.clone(), urls.back_preview_url.clone())
        } else {
            (None, None)
        };

        Ok(TemplateRecord {
            name: name.to_string(),
            category,
            folder: orientation.folder().to_string(),
            template_width: draft.width,
            template_height: draft.height,
            unit: draft.unit,
            both_sides: draft.both_sides,
            orientation,
            front_blank_url: urls.front_blank_url.clone(),
            front_preview_url: urls.front_preview_url.clone(),
            back_blank_url,
            back_preview_url,
            tags: Vec::new(),
        })
    }

    /// Commits the template. Only the create endpoint is called; a failure keeps the form
    /// and the uploaded URLs so the user can retry.
    pub async fn save(&mut self) -> Result<Navigation, WizardError> {
        self.expect_step(WizardStep::SaveModalOpen)?;
        let record = self.build_record()?;

        tracing::info!(name = %record.name, folder = %record.folder, "creating template");
        let template = self.backend.create_template(&record).await.map_err(|e| {
            tracing::warn!(error = %e, "template commit failed");
            WizardError::CommitFailed(e.user_message(COMMIT_FALLBACK_MESSAGE))
        })?;

        match &template {
            Some(template) => tracing::info!(id = %template.id, "template saved"),
            None => tracing::info!("template saved"),
        }
        self.committed = Some(record);
        self.created = template;
        self.step = WizardStep::Committed;
        Ok(Navigation::TemplateList)
    }

    /// Step back. Leaving from the first step exits the wizard and drops its state.
    pub fn back(&mut self) -> Navigation {
        match self.step {
            WizardStep::CollectDimensions | WizardStep::Committed => Navigation::TemplateList,
            WizardStep::CollectUploads => {
                self.step = WizardStep::CollectDimensions;
                Navigation::Stay
            }
            WizardStep::SaveModalOpen => {
                self.step = WizardStep::CollectUploads;
                Navigation::Stay
            }
        }
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep(self.step))
        }
    }
}
