use crate::rest_types::Unit;

pub const CUSTOM_SIZE_ID: &str = "custom";
pub const DEFAULT_SIZE_ID: &str = "cr80";

/// Unit every preset is registered in.
pub const PRESET_UNIT: Unit = Unit::Mm;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizePreset {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub width: f64,
    pub height: f64,
}

pub const STANDARD_SIZES: &[SizePreset] = &[
    SizePreset {
        id: "cr80",
        title: "CR80",
        description: "85.6 × 54 mm, Standard Credit Card Size",
        width: 85.6,
        height: 53.98,
    },
    SizePreset {
        id: "cr79",
        title: "CR79",
        description: "83.9 × 52.1 mm, Slightly Smaller",
        width: 83.9,
        height: 52.1,
    },
    SizePreset {
        id: "cr100",
        title: "CR100",
        description: "98.5 × 67 mm, Oversized",
        width: 98.5,
        height: 67.0,
    },
    SizePreset {
        id: "a7",
        title: "A7",
        description: "105 × 74 mm, Badge Size",
        width: 105.0,
        height: 74.0,
    },
    SizePreset {
        id: "a6",
        title: "A6",
        description: "148 × 105 mm, Badge Size",
        width: 148.0,
        height: 105.0,
    },
];

pub fn find_preset(id: &str) -> Option<&'static SizePreset> {
    STANDARD_SIZES.iter().find(|preset| preset.id == id)
}

/// Validates a raw dimension input. `Ok` carries the parsed value, `Err` the message
/// shown next to the field.
pub fn validate_dimension(raw: &str, field_name: &str) -> Result<f64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("{field_name} is required"));
    }

    match raw.parse::<f64>() {
        Ok(value) if !value.is_finite() => Err(format!("{field_name} must be a number")),
        Ok(value) if value <= 0.0 => Err(format!("{field_name} must be greater than 0")),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("{field_name} must be a number")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideMode {
    #[default]
    Both,
    Single,
}

impl SideMode {
    pub fn both_sides(self) -> bool {
        matches!(self, SideMode::Both)
    }
}

/// One editable numeric input with blur-then-change validation.
#[derive(Debug, Clone)]
pub struct DimensionField {
    label: &'static str,
    raw: String,
    touched: bool,
    error: Option<String>,
}

impl DimensionField {
    fn new(label: &'static str, value: f64) -> Self {
        Self {
            label,
            raw: value.to_string(),
            touched: false,
            error: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    fn set(&mut self, raw: &str) {
        self.raw = raw.to_string();
        if self.touched {
            self.revalidate();
        }
    }

    fn blur(&mut self) {
        self.touched = true;
        self.revalidate();
    }

    fn revalidate(&mut self) -> Option<f64> {
        match validate_dimension(&self.raw, self.label) {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }
}

/// Step-one configuration handed to the upload step.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub size_id: String,
    pub width: f64,
    pub height: f64,
    pub unit: Unit,
    pub both_sides: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionErrors {
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DimensionSelector {
    size_id: String,
    width: DimensionField,
    height: DimensionField,
    unit: Unit,
    sides: SideMode,
}

impl Default for DimensionSelector {
    fn default() -> Self {
        let preset = &STANDARD_SIZES[0];
        Self {
            size_id: preset.id.to_string(),
            width: DimensionField::new("Width", preset.width),
            height: DimensionField::new("Height", preset.height),
            unit: PRESET_UNIT,
            sides: SideMode::default(),
        }
    }
}

impl DimensionSelector {
    pub fn size_id(&self) -> &str {
        &self.size_id
    }

    pub fn is_custom(&self) -> bool {
        self.size_id == CUSTOM_SIZE_ID
    }

    pub fn width(&self) -> &DimensionField {
        &self.width
    }

    pub fn height(&self) -> &DimensionField {
        &self.height
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn sides(&self) -> SideMode {
        self.sides
    }

    /// Returns `false` for an unknown identifier, leaving the selection untouched.
    pub fn select(&mut self, size_id: &str) -> bool {
        if size_id == CUSTOM_SIZE_ID {
            self.size_id = CUSTOM_SIZE_ID.to_string();
            return true;
        }

        let Some(preset) = find_preset(size_id) else {
            return false;
        };

        self.size_id = preset.id.to_string();
        self.unit = PRESET_UNIT;
        self.width.set(&preset.width.to_string());
        self.height.set(&preset.height.to_string());
        true
    }

    pub fn set_width(&mut self, raw: &str) {
        self.switch_to_custom();
        self.width.set(raw);
    }

    pub fn set_height(&mut self, raw: &str) {
        self.switch_to_custom();
        self.height.set(raw);
    }

    pub fn blur_width(&mut self) {
        self.width.blur();
    }

    pub fn blur_height(&mut self) {
        self.height.blur();
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    pub fn set_sides(&mut self, sides: SideMode) {
        self.sides = sides;
    }

    /// Gate for leaving step one. Custom sizes get both fields marked touched so their
    /// errors render.
    pub fn confirm(&mut self) -> Result<TemplateDraft, DimensionErrors> {
        let (width, height) = if self.is_custom() {
            self.width.touched = true;
            self.height.touched = true;
            let width = self.width.revalidate();
            let height = self.height.revalidate();
            match (width, height) {
                (Some(width), Some(height)) => (width, height),
                _ => {
                    return Err(DimensionErrors {
                        width: self.width.error.clone(),
                        height: self.height.error.clone(),
                    });
                }
            }
        } else {
            let preset = find_preset(&self.size_id).unwrap_or(&STANDARD_SIZES[0]);
            (preset.width, preset.height)
        };

        Ok(TemplateDraft {
            size_id: self.size_id.clone(),
            width,
            height,
            unit: self.unit,
            both_sides: self.sides.both_sides(),
        })
    }

    fn switch_to_custom(&mut self) {
        if !self.is_custom() {
            self.size_id = CUSTOM_SIZE_ID.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_overwrites_dimensions() {
        for preset in STANDARD_SIZES {
            let mut selector = DimensionSelector::default();
            selector.select(CUSTOM_SIZE_ID);
            selector.set_width("12");
            selector.set_unit(Unit::In);

            assert!(selector.select(preset.id));
            assert_eq!(selector.size_id(), preset.id);
            assert!(!selector.is_custom());
            assert_eq!(selector.unit(), Unit::Mm);

            let draft = selector.confirm().unwrap();
            assert_eq!(draft.size_id, preset.id);
            assert_eq!(draft.width, preset.width);
            assert_eq!(draft.height, preset.height);
        }
    }

    #[test]
    fn test_unknown_size_is_rejected() {
        let mut selector = DimensionSelector::default();
        assert!(!selector.select("cr1000"));
        assert_eq!(selector.size_id(), DEFAULT_SIZE_ID);
    }

    #[test]
    fn test_validate_dimension_rejects_non_positive_and_garbage() {
        for raw in ["", "   ", "abc", "0", "-1", "-0.01", "0.0", "NaN", "inf", "1.2.3"] {
            let result = validate_dimension(raw, "Width");
            assert!(
                matches!(&result, Err(message) if !message.is_empty()),
                "expected error for {raw:?}"
            );
        }
    }

    #[test]
    fn test_validate_dimension_accepts_positive_values() {
        for (raw, expected) in [("54", 54.0), ("0.01", 0.01), (" 85.6 ", 85.6), ("1e2", 100.0)] {
            assert_eq!(validate_dimension(raw, "Height"), Ok(expected));
        }
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            validate_dimension("", "Width"),
            Err("Width is required".to_string())
        );
        assert_eq!(
            validate_dimension("wide", "Width"),
            Err("Width must be a number".to_string())
        );
        assert_eq!(
            validate_dimension("0", "Height"),
            Err("Height must be greater than 0".to_string())
        );
    }

    #[test]
    fn test_trailing_unit_text_is_not_a_number() {
        for raw in ["54mm", "85.6 mm", "3in"] {
            assert_eq!(
                validate_dimension(raw, "Width"),
                Err("Width must be a number".to_string())
            );
        }
    }

    #[test]
    fn test_cr80_edit_scenario() {
        let mut selector = DimensionSelector::default();
        assert!(selector.select("cr80"));
        assert_eq!(selector.width().raw(), "85.6");
        assert_eq!(selector.height().raw(), "53.98");
        assert_eq!(selector.unit(), Unit::Mm);

        // Untouched field: editing alone does not surface an error.
        selector.set_width("0");
        assert!(selector.is_custom());
        assert_eq!(selector.width().error(), None);

        selector.blur_width();
        assert_eq!(
            selector.width().error(),
            Some("Width must be greater than 0")
        );

        // Touched field: every change re-validates.
        selector.set_width("54");
        assert_eq!(selector.width().error(), None);
        selector.set_width("");
        assert_eq!(selector.width().error(), Some("Width is required"));
    }

    #[test]
    fn test_confirm_custom_marks_fields_touched() {
        let mut selector = DimensionSelector::default();
        selector.select(CUSTOM_SIZE_ID);
        selector.set_width("abc");
        selector.set_height("-4");
        assert!(!selector.width().is_touched());

        let errors = selector.confirm().unwrap_err();
        assert_eq!(errors.width.as_deref(), Some("Width must be a number"));
        assert_eq!(
            errors.height.as_deref(),
            Some("Height must be greater than 0")
        );
        assert!(selector.width().is_touched());
        assert!(selector.height().is_touched());
    }

    #[test]
    fn test_confirm_custom_uses_entered_values() {
        let mut selector = DimensionSelector::default();
        selector.set_width("90");
        selector.set_height("60.5");
        selector.set_unit(Unit::Cm);
        selector.set_sides(SideMode::Single);

        let draft = selector.confirm().unwrap();
        assert_eq!(draft.size_id, CUSTOM_SIZE_ID);
        assert_eq!(draft.width, 90.0);
        assert_eq!(draft.height, 60.5);
        assert_eq!(draft.unit, Unit::Cm);
        assert!(!draft.both_sides);
    }
}
