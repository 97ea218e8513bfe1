//! Output settings: width, height, and radius fields with clamp bounds.
//!
//! Field input arrives as raw text. Anything that is not an integer resets
//! the field to 1; integers are clamped into the field's bounds. Width and
//! height stay tied to the source aspect ratio.

use crate::error::{Result, SdfError};

/// An integer field with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSetting {
    value: u32,
    min: u32,
    max: u32,
}

impl NumericSetting {
    pub fn new(value: u32, min: u32, max: u32) -> Self {
        debug_assert!(min <= max);
        NumericSetting {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Parse field text as an integer. `"12"`, `" 12 "` and `"12.0"` are
    /// accepted; `"1.5"`, `"abc"` and `""` are not.
    pub fn parse(input: &str) -> Result<i64> {
        let invalid = || SdfError::InvalidNumericInput {
            input: input.to_string(),
        };
        let parsed: f64 = input.trim().parse().map_err(|_| invalid())?;
        if !parsed.is_finite() || parsed.fract() != 0.0 {
            return Err(invalid());
        }
        Ok(parsed as i64)
    }

    /// Clamp an already-integer value into bounds and store it.
    pub fn set_clamped(&mut self, value: i64) -> u32 {
        self.value = value.clamp(self.min as i64, self.max as i64) as u32;
        self.value
    }

    /// Apply raw field input and return the resulting value.
    pub fn apply_input(&mut self, input: &str) -> u32 {
        match Self::parse(input) {
            Ok(value) => self.set_clamped(value),
            Err(err) => {
                log::warn!("{}, resetting to 1", err);
                self.set_clamped(1)
            }
        }
    }
}

/// Width/height/radius fields plus the aspect ratio that links the first two.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    width: NumericSetting,
    height: NumericSetting,
    radius: NumericSetting,
    aspect: f64,
    enabled: bool,
}

impl OutputSettings {
    pub fn new(
        width_bounds: (u32, u32),
        height_bounds: (u32, u32),
        radius_bounds: (u32, u32),
        radius: u32,
    ) -> Self {
        OutputSettings {
            width: NumericSetting::new(1, width_bounds.0, width_bounds.1),
            height: NumericSetting::new(1, height_bounds.0, height_bounds.1),
            radius: NumericSetting::new(radius, radius_bounds.0, radius_bounds.1),
            aspect: 1.0,
            enabled: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width.value()
    }

    pub fn height(&self) -> u32 {
        self.height.value()
    }

    pub fn radius(&self) -> u32 {
        self.radius.value()
    }

    /// Fields accept input only once a source image is loaded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reset width/height to the new source size and enable the fields.
    pub fn load_source(&mut self, width: u32, height: u32) {
        self.aspect = width as f64 / height.max(1) as f64;
        self.width.set_clamped(width as i64);
        self.height.set_clamped(height as i64);
        self.enabled = true;
    }

    /// New width text; height follows as `round(width / aspect)`.
    pub fn set_width_input(&mut self, input: &str) {
        if !self.enabled {
            return;
        }
        let width = self.width.apply_input(input);
        self.height.set_clamped((width as f64 / self.aspect).round() as i64);
    }

    /// New height text; width follows as `round(height * aspect)`.
    pub fn set_height_input(&mut self, input: &str) {
        if !self.enabled {
            return;
        }
        let height = self.height.apply_input(input);
        self.width.set_clamped((height as f64 * self.aspect).round() as i64);
    }

    pub fn set_radius_input(&mut self, input: &str) {
        if !self.enabled {
            return;
        }
        self.radius.apply_input(input);
    }
}
