use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::builder::sizes::{CUSTOM_SIZE_ID, DEFAULT_SIZE_ID, SideMode};
use crate::builder::staging::{FileHandle, Kind, Side};
use crate::builder::wizard::{TemplateBackend, TemplateWizard};
use crate::rest_types::{Category, Orientation, Unit};

/// `template.toml`: everything the wizard asks for, for non-interactive runs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateManifest {
    #[serde(default = "default_size")]
    pub size: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub unit: Option<Unit>,
    #[serde(default = "default_both_sides")]
    pub both_sides: bool,
    pub name: String,
    pub category: Category,
    pub orientation: Orientation,
    pub files: ManifestFiles,
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestFiles {
    pub front_blank: PathBuf,
    pub front_preview: PathBuf,
    pub back_blank: Option<PathBuf>,
    pub back_preview: Option<PathBuf>,
}

fn default_size() -> String {
    DEFAULT_SIZE_ID.to_string()
}

fn default_both_sides() -> bool {
    true
}

impl TemplateManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut manifest: TemplateManifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        manifest.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(manifest)
    }

    pub fn sides(&self) -> SideMode {
        if self.both_sides {
            SideMode::Both
        } else {
            SideMode::Single
        }
    }

    /// Every (side, kind, path) the manifest stages, resolved against its directory.
    pub fn slots(&self) -> Vec<(Side, Kind, PathBuf)> {
        let mut slots = vec![
            (Side::Front, Kind::Blank, self.resolve(&self.files.front_blank)),
            (Side::Front, Kind::Preview, self.resolve(&self.files.front_preview)),
        ];
        if let Some(path) = &self.files.back_blank {
            slots.push((Side::Back, Kind::Blank, self.resolve(path)));
        }
        if let Some(path) = &self.files.back_preview {
            slots.push((Side::Back, Kind::Preview, self.resolve(path)));
        }
        slots
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Fills the dimension step of a fresh wizard.
    pub fn apply_dimensions<B: TemplateBackend>(&self, wizard: &mut TemplateWizard<B>) -> Result<()> {
        wizard.select_size(&self.size)?;
        let dimensions = wizard.dimensions_mut()?;

        if self.size == CUSTOM_SIZE_ID {
            let width = self
                .width
                .ok_or_else(|| anyhow!("A custom size needs `width`"))?;
            let height = self
                .height
                .ok_or_else(|| anyhow!("A custom size needs `height`"))?;
            dimensions.set_width(&width.to_string());
            dimensions.set_height(&height.to_string());
        }
        if let Some(unit) = self.unit {
            dimensions.set_unit(unit);
        }
        dimensions.set_sides(self.sides());
        Ok(())
    }

    /// Stages every file the manifest names.
    pub fn apply_uploads<B: TemplateBackend>(&self, wizard: &mut TemplateWizard<B>) -> Result<()> {
        for (side, kind, path) in self.slots() {
            let handle = FileHandle::from_path(&path)?;
            wizard
                .stage(side, kind, handle)
                .with_context(|| format!("Cannot use {} as {side} {kind}", path.display()))?;
        }
        Ok(())
    }

    pub fn apply_save_form<B: TemplateBackend>(&self, wizard: &mut TemplateWizard<B>) -> Result<()> {
        let form = wizard.save_form_mut()?;
        form.template_name = self.name.clone();
        form.category = Some(self.category);
        form.orientation = Some(self.orientation);
        Ok(())
    }
}
