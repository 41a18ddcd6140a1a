//! User-controlled effect knobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// A recognized parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKey {
    /// Overall reaction strength
    Intensity,
    /// Animation speed multiplier
    Speed,
    /// Rotation rate
    RotationSpeed,
    /// Smoothness of motion
    Fluidity,
    /// Geometric detail
    Complexity,
    /// Density of repeated elements
    PatternDensity,
    /// Rate of shape morphing
    MorphSpeed,
    /// Size multiplier
    Scale,
    /// Hue cycling on/off
    ColorCycle,
    /// Wireframe rendering on/off
    Wireframe,
}

impl ParamKey {
    /// All keys
    pub const ALL: [ParamKey; 10] = [
        ParamKey::Intensity,
        ParamKey::Speed,
        ParamKey::RotationSpeed,
        ParamKey::Fluidity,
        ParamKey::Complexity,
        ParamKey::PatternDensity,
        ParamKey::MorphSpeed,
        ParamKey::Scale,
        ParamKey::ColorCycle,
        ParamKey::Wireframe,
    ];

    /// Name used by the control surface
    pub fn name(&self) -> &'static str {
        match self {
            ParamKey::Intensity => "intensity",
            ParamKey::Speed => "speed",
            ParamKey::RotationSpeed => "rotationSpeed",
            ParamKey::Fluidity => "fluidity",
            ParamKey::Complexity => "complexity",
            ParamKey::PatternDensity => "patternDensity",
            ParamKey::MorphSpeed => "morphSpeed",
            ParamKey::Scale => "scale",
            ParamKey::ColorCycle => "colorCycle",
            ParamKey::Wireframe => "wireframe",
        }
    }

    /// Whether the knob is a switch rather than a number
    pub fn is_flag(&self) -> bool {
        matches!(self, ParamKey::ColorCycle | ParamKey::Wireframe)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamKey {
    type Err = ();

    /// Accepts camelCase and snake_case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ParamKey::ALL
            .into_iter()
            .find(|k| k.name().to_ascii_lowercase() == normalized)
            .ok_or(())
    }
}

/// Value assigned to a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Numeric knob
    Number(f32),
    /// Switch
    Flag(bool),
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Flag(v)
    }
}

/// Effect parameters; unset knobs fall back to each effect's own default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectParams {
    /// Overall reaction strength
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    /// Animation speed multiplier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Rotation rate
    #[serde(alias = "rotation_speed", skip_serializing_if = "Option::is_none")]
    pub rotation_speed: Option<f32>,
    /// Smoothness of motion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fluidity: Option<f32>,
    /// Geometric detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f32>,
    /// Density of repeated elements
    #[serde(alias = "pattern_density", skip_serializing_if = "Option::is_none")]
    pub pattern_density: Option<f32>,
    /// Rate of shape morphing
    #[serde(alias = "morph_speed", skip_serializing_if = "Option::is_none")]
    pub morph_speed: Option<f32>,
    /// Size multiplier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    /// Hue cycling on/off
    #[serde(alias = "color_cycle", skip_serializing_if = "Option::is_none")]
    pub color_cycle: Option<bool>,
    /// Wireframe rendering on/off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<bool>,
}

impl EffectParams {
    /// No knobs set
    pub fn new() -> Self {
        Self::default()
    }

    fn number_slot(&mut self, key: ParamKey) -> Option<&mut Option<f32>> {
        match key {
            ParamKey::Intensity => Some(&mut self.intensity),
            ParamKey::Speed => Some(&mut self.speed),
            ParamKey::RotationSpeed => Some(&mut self.rotation_speed),
            ParamKey::Fluidity => Some(&mut self.fluidity),
            ParamKey::Complexity => Some(&mut self.complexity),
            ParamKey::PatternDensity => Some(&mut self.pattern_density),
            ParamKey::MorphSpeed => Some(&mut self.morph_speed),
            ParamKey::Scale => Some(&mut self.scale),
            ParamKey::ColorCycle | ParamKey::Wireframe => None,
        }
    }

    fn flag_slot(&mut self, key: ParamKey) -> Option<&mut Option<bool>> {
        match key {
            ParamKey::ColorCycle => Some(&mut self.color_cycle),
            ParamKey::Wireframe => Some(&mut self.wireframe),
            _ => None,
        }
    }

    /// Numeric knob, if set
    pub fn number(&self, key: ParamKey) -> Option<f32> {
        match key {
            ParamKey::Intensity => self.intensity,
            ParamKey::Speed => self.speed,
            ParamKey::RotationSpeed => self.rotation_speed,
            ParamKey::Fluidity => self.fluidity,
            ParamKey::Complexity => self.complexity,
            ParamKey::PatternDensity => self.pattern_density,
            ParamKey::MorphSpeed => self.morph_speed,
            ParamKey::Scale => self.scale,
            ParamKey::ColorCycle | ParamKey::Wireframe => None,
        }
    }

    /// Switch, if set
    pub fn flag(&self, key: ParamKey) -> Option<bool> {
        match key {
            ParamKey::ColorCycle => self.color_cycle,
            ParamKey::Wireframe => self.wireframe,
            _ => None,
        }
    }

    /// Numeric knob or `default`
    pub fn resolve(&self, key: ParamKey, default: f32) -> f32 {
        self.number(key).filter(|v| v.is_finite()).unwrap_or(default)
    }

    /// Switch or `default`
    pub fn resolve_flag(&self, key: ParamKey, default: bool) -> bool {
        self.flag(key).unwrap_or(default)
    }

    /// Set a knob by its control-surface name.
    ///
    /// Returns false for unrecognized keys and for values of the wrong kind;
    /// both are ignored.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> bool {
        let Ok(key) = key.parse::<ParamKey>() else {
            trace!("EffectParams: ignoring unknown key '{}'", key);
            return false;
        };
        self.set_key(key, value)
    }

    /// Set a knob by key
    pub fn set_key(&mut self, key: ParamKey, value: impl Into<ParamValue>) -> bool {
        match value.into() {
            ParamValue::Number(v) => match self.number_slot(key) {
                Some(slot) => {
                    *slot = Some(v);
                    true
                }
                None => false,
            },
            ParamValue::Flag(v) => match self.flag_slot(key) {
                Some(slot) => {
                    *slot = Some(v);
                    true
                }
                None => false,
            },
        }
    }

    /// Unset a knob so the effect default applies again
    pub fn clear(&mut self, key: ParamKey) {
        if let Some(slot) = self.number_slot(key) {
            *slot = None;
        }
        if let Some(slot) = self.flag_slot(key) {
            *slot = None;
        }
    }

    /// Apply a loose JSON object from a control surface.
    ///
    /// Returns the number of keys applied.
    pub fn apply_json(&mut self, map: &serde_json::Map<String, serde_json::Value>) -> usize {
        let mut applied = 0;
        for (key, value) in map {
            let ok = match value {
                serde_json::Value::Number(n) => {
                    n.as_f64().is_some_and(|v| self.set(key, v as f32))
                }
                serde_json::Value::Bool(b) => self.set(key, *b),
                _ => false,
            };
            if ok {
                applied += 1;
            }
        }
        applied
    }

    /// Overlay every knob set in `other`
    pub fn merge(&mut self, other: &EffectParams) {
        for key in ParamKey::ALL {
            if let Some(v) = other.number(key) {
                self.set_key(key, v);
            }
            if let Some(v) = other.flag(key) {
                self.set_key(key, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_spellings() {
        assert_eq!("rotationSpeed".parse::<ParamKey>(), Ok(ParamKey::RotationSpeed));
        assert_eq!("rotation_speed".parse::<ParamKey>(), Ok(ParamKey::RotationSpeed));
        assert_eq!("colorCycle".parse::<ParamKey>(), Ok(ParamKey::ColorCycle));
        assert_eq!("bogus".parse::<ParamKey>(), Err(()));
    }

    #[test]
    fn test_resolve_falls_back() {
        let mut params = EffectParams::new();
        assert_eq!(params.resolve(ParamKey::Speed, 2.0), 2.0);
        assert!(params.set("speed", 0.5));
        assert_eq!(params.resolve(ParamKey::Speed, 2.0), 0.5);
        params.clear(ParamKey::Speed);
        assert_eq!(params.resolve(ParamKey::Speed, 2.0), 2.0);
    }

    #[test]
    fn test_wrong_kind_ignored() {
        let mut params = EffectParams::new();
        assert!(!params.set("wireframe", 1.0));
        assert!(!params.set("intensity", true));
        assert!(params.set("wireframe", true));
        assert!(params.resolve_flag(ParamKey::Wireframe, false));
    }

    #[test]
    fn test_non_finite_resolves_to_default() {
        let mut params = EffectParams::new();
        params.set_key(ParamKey::Scale, f32::NAN);
        assert_eq!(params.resolve(ParamKey::Scale, 1.0), 1.0);
    }

    #[test]
    fn test_deserialize_both_casings_and_unknown() {
        let params: EffectParams = serde_json::from_str(
            r#"{"rotationSpeed": 1.5, "pattern_density": 3, "glow": 9, "colorCycle": true}"#,
        )
        .unwrap();
        assert_eq!(params.rotation_speed, Some(1.5));
        assert_eq!(params.pattern_density, Some(3.0));
        assert_eq!(params.color_cycle, Some(true));
        assert_eq!(params.intensity, None);
    }

    #[test]
    fn test_apply_json() {
        let value = serde_json::json!({
            "intensity": 0.7,
            "wireframe": false,
            "glow": 1,
            "speed": "x"
        });
        let mut params = EffectParams::new();
        let applied = params.apply_json(value.as_object().unwrap());
        assert_eq!(applied, 2);
        assert_eq!(params.intensity, Some(0.7));
        assert_eq!(params.wireframe, Some(false));
    }

    #[test]
    fn test_merge() {
        let mut base = EffectParams::new();
        base.set("speed", 1.0);
        base.set("scale", 2.0);
        let mut overlay = EffectParams::new();
        overlay.set("speed", 3.0);
        overlay.set("colorCycle", true);
        base.merge(&overlay);
        assert_eq!(base.speed, Some(3.0));
        assert_eq!(base.scale, Some(2.0));
        assert_eq!(base.color_cycle, Some(true));
    }
}
