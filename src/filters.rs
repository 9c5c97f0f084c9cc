use crate::params::{ParamError, ParamId, Parameter, SLIDER_MAX};
use std::ops::{Index, IndexMut};

/// The four `eq` parameters, keyed by [`ParamId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustments {
    params: [Parameter; ParamId::ALL.len()],
}

impl Adjustments {
    pub fn new() -> Result<Self, ParamError> {
        let [contrast, brightness, saturation, gamma] =
            ParamId::ALL.map(|id| Parameter::new(id.spec(), SLIDER_MAX));
        Ok(Self {
            params: [contrast?, brightness?, saturation?, gamma?],
        })
    }

    /// Defaults, overridden by the given `(parameter, value)` pairs.
    pub fn with_values(values: &[(ParamId, f64)]) -> Result<Self, ParamError> {
        let mut adjustments = Self::new()?;
        for &(id, value) in values {
            adjustments[id].set_value(value)?;
        }
        Ok(adjustments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn is_identity(&self) -> bool {
        self.iter().all(Parameter::label_is_default)
    }

    /// `eq=contrast=<v>:brightness=<v>:saturation=<v>:gamma=<v>` using each parameter's label.
    pub fn eq_filter(&self) -> String {
        let opts: Vec<String> = self
            .iter()
            .map(|p| format!("{}={}", p.id(), p.label()))
            .collect();
        format!("eq={}", opts.join(":"))
    }

    /// Player command replacing the video filter chain with the current `eq` filter.
    pub fn vf_command(&self) -> [String; 3] {
        ["vf".into(), "set".into(), self.eq_filter()]
    }
}

impl Index<ParamId> for Adjustments {
    type Output = Parameter;

    fn index(&self, id: ParamId) -> &Parameter {
        &self.params[id.index()]
    }
}

impl IndexMut<ParamId> for Adjustments {
    fn index_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.params[id.index()]
    }
}

pub fn validate_slider_position(raw: &str) -> Result<i32, String> {
    let parsed: i32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` must be an integer between 0 and {SLIDER_MAX}"))?;
    if !(0..=SLIDER_MAX).contains(&parsed) {
        return Err(format!("slider position must be between 0 and {SLIDER_MAX}"));
    }
    Ok(parsed)
}

pub fn validate_percent(raw: &str) -> Result<f64, String> {
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` must be a number between 0 and 100"))?;
    if !(0.0..=100.0).contains(&parsed) {
        return Err("percentage must be between 0 and 100".into());
    }
    Ok(parsed)
}

pub fn parse_param_value(id: ParamId, raw: &str) -> Result<f64, String> {
    let spec = id.spec();
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if !spec.contains(parsed) {
        return Err(format!(
            "{id} must be between {} and {}",
            spec.format(spec.min),
            spec.format(spec.max)
        ));
    }
    Ok(parsed)
}

pub fn parse_contrast(raw: &str) -> Result<f64, String> {
    parse_param_value(ParamId::Contrast, raw)
}

pub fn parse_brightness(raw: &str) -> Result<f64, String> {
    parse_param_value(ParamId::Brightness, raw)
}

pub fn parse_saturation(raw: &str) -> Result<f64, String> {
    parse_param_value(ParamId::Saturation, raw)
}

pub fn parse_gamma(raw: &str) -> Result<f64, String> {
    parse_param_value(ParamId::Gamma, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eq_filter() {
        let adj = Adjustments::new().unwrap();
        assert_eq!(
            adj.eq_filter(),
            "eq=contrast=1.00:brightness=0.00:saturation=1.00:gamma=1.00"
        );
        assert!(adj.is_identity());
    }

    #[test]
    fn test_slider_change_reflected_in_filter() {
        let mut adj = Adjustments::new().unwrap();
        adj[ParamId::Contrast].set_from_slider_position(150);
        adj[ParamId::Brightness].set_from_slider_position(0);
        assert_eq!(
            adj.eq_filter(),
            "eq=contrast=1.50:brightness=-0.50:saturation=1.00:gamma=1.00"
        );
        assert!(!adj.is_identity());
    }

    #[test]
    fn test_vf_command() {
        let mut adj = Adjustments::new().unwrap();
        adj[ParamId::Gamma].set_value(2.25).unwrap();
        let cmd = adj.vf_command();
        assert_eq!(cmd[0], "vf");
        assert_eq!(cmd[1], "set");
        assert!(cmd[2].ends_with(":gamma=2.25"), "got {}", cmd[2]);
    }

    #[test]
    fn test_with_values() {
        let adj =
            Adjustments::with_values(&[(ParamId::Saturation, 0.0), (ParamId::Contrast, 2.0)])
                .unwrap();
        assert_eq!(adj[ParamId::Saturation].label(), "0.00");
        assert_eq!(adj[ParamId::Contrast].slider_position(), SLIDER_MAX);

        let err = Adjustments::with_values(&[(ParamId::Gamma, 9.0)]).unwrap_err();
        assert!(matches!(err, ParamError::ValueOutOfRange { .. }));
    }

    #[test]
    fn test_validate_slider_position() {
        assert_eq!(validate_slider_position("0"), Ok(0));
        assert_eq!(validate_slider_position(" 200 "), Ok(200));
        assert!(validate_slider_position("201").is_err());
        assert!(validate_slider_position("-1").is_err());
        assert!(validate_slider_position("half").is_err());
    }

    #[test]
    fn test_validate_percent() {
        assert_eq!(validate_percent("0"), Ok(0.0));
        assert_eq!(validate_percent(" 37.5"), Ok(37.5));
        assert!(validate_percent("100.1").is_err());
        assert!(validate_percent("NaN").is_err());
        assert!(validate_percent("end").is_err());
    }

    #[test]
    fn test_parse_param_value() {
        assert_eq!(parse_brightness("-0.25"), Ok(-0.25));
        assert_eq!(parse_gamma("0.1"), Ok(0.1));
        assert!(parse_gamma("0.05").is_err());
        assert!(parse_contrast("2.01").is_err());
        assert!(parse_saturation("lots").is_err());
    }
}
