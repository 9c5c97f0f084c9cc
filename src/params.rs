use std::fmt;
use thiserror::Error;

/// Number of discrete steps a parameter slider spans (positions `0..=SLIDER_MAX`).
pub const SLIDER_MAX: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamId {
    Contrast,
    Brightness,
    Saturation,
    Gamma,
}

impl ParamId {
    /// Every parameter, in the order the `eq` filter lists them.
    pub const ALL: [ParamId; 4] = [
        ParamId::Contrast,
        ParamId::Brightness,
        ParamId::Saturation,
        ParamId::Gamma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamId::Contrast => "contrast",
            ParamId::Brightness => "brightness",
            ParamId::Saturation => "saturation",
            ParamId::Gamma => "gamma",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> ParameterSpec {
        let (min, max, default) = match self {
            ParamId::Contrast => (0.0, 2.0, 1.0),
            ParamId::Brightness => (-0.5, 0.5, 0.0),
            ParamId::Saturation => (0.0, 3.0, 1.0),
            ParamId::Gamma => (0.1, 5.0, 1.0),
        };
        ParameterSpec {
            id: self,
            min,
            max,
            default,
            precision: 2,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("{id}: range [{min}, {max}] is empty")]
    DegenerateRange { id: ParamId, min: f64, max: f64 },

    #[error("{id}: default {default} lies outside [{min}, {max}]")]
    DefaultOutOfRange {
        id: ParamId,
        default: f64,
        min: f64,
        max: f64,
    },

    #[error("{id}: value {value} lies outside [{min}, {max}]")]
    ValueOutOfRange {
        id: ParamId,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("slider maximum must be positive, got {0}")]
    EmptySlider(i32),
}

/// Immutable description of one adjustable quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub id: ParamId,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Decimal places used when rendering a value.
    pub precision: usize,
}

impl ParameterSpec {
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Runtime value of a parameter plus the affine map between it and a slider position.
///
/// `position = value * scale - offset` and `value = (position + offset) / scale`, where
/// `scale = slider_max / (max - min)` and `offset = min * scale`. Position 0 is `min`,
/// position `slider_max` is `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    spec: ParameterSpec,
    value: f64,
    scale: f64,
    offset: f64,
    slider_max: i32,
}

impl Parameter {
    pub fn new(spec: ParameterSpec, slider_max: i32) -> Result<Self, ParamError> {
        if slider_max <= 0 {
            return Err(ParamError::EmptySlider(slider_max));
        }
        // `!(min < max)` also rejects NaN bounds
        if !(spec.min < spec.max) {
            return Err(ParamError::DegenerateRange {
                id: spec.id,
                min: spec.min,
                max: spec.max,
            });
        }
        if !spec.contains(spec.default) {
            return Err(ParamError::DefaultOutOfRange {
                id: spec.id,
                default: spec.default,
                min: spec.min,
                max: spec.max,
            });
        }

        let scale = f64::from(slider_max) / (spec.max - spec.min);
        Ok(Self {
            spec,
            value: spec.default,
            scale,
            offset: spec.min * scale,
            slider_max,
        })
    }

    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    pub fn id(&self) -> ParamId {
        self.spec.id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn slider_position(&self) -> i32 {
        (self.value * self.scale - self.offset).round() as i32
    }

    /// Positions outside `0..=slider_max` are clamped so the value stays in range.
    pub fn set_from_slider_position(&mut self, position: i32) {
        let position = position.clamp(0, self.slider_max);
        self.value = (f64::from(position) + self.offset) / self.scale;
    }

    pub fn set_value(&mut self, value: f64) -> Result<(), ParamError> {
        if !self.spec.contains(value) {
            return Err(ParamError::ValueOutOfRange {
                id: self.spec.id,
                value,
                min: self.spec.min,
                max: self.spec.max,
            });
        }
        self.value = value;
        Ok(())
    }

    pub fn reset_to_default(&mut self) {
        self.value = self.spec.default;
    }

    /// Compares at display precision: a value that renders like the default counts as default.
    pub fn label_is_default(&self) -> bool {
        self.label() == self.spec.format(self.spec.default)
    }

    pub fn label(&self) -> String {
        self.spec.format(self.value)
    }
}
