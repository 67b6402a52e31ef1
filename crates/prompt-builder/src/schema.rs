//! Request schema for prompt generation

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, PromptError, Result};

/// A `#RRGGBB` color with opacity in `0.0..=1.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorWithAlpha {
    pub hex: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_alpha() -> f64 {
    1.0
}

impl ColorWithAlpha {
    fn validate(&self, loc: &[&str], errors: &mut Vec<FieldError>) {
        if !is_hex_color(&self.hex) {
            errors.push(FieldError::new(
                loc.iter().copied().chain(["hex"]),
                "String should match pattern '^#([A-Fa-f0-9]{6})$'",
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            errors.push(FieldError::new(
                loc.iter().copied().chain(["alpha"]),
                "Input should be between 0 and 1",
            ));
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Form input submitted by the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDataIn {
    pub aspect_ratio: String,
    pub primary_colors: Vec<ColorWithAlpha>,
    pub theme: String,
    #[serde(default)]
    pub custom_theme: Option<String>,
    pub include_text: bool,
    #[serde(default)]
    pub text: Option<String>,
    pub font_family: String,
    pub background_color: ColorWithAlpha,
    pub style: String,
    /// Only used by the JSON endpoint; multipart uploads send a file instead
    #[serde(default)]
    pub reference_image_base64: Option<String>,
}

impl FormDataIn {
    /// Deserialize and validate in one step
    pub fn from_json(json: &str) -> Result<Self> {
        let form: FormDataIn = serde_json::from_str(json)?;
        form.validate()?;
        Ok(form)
    }

    /// Check field constraints serde cannot express, reporting every failure.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        for (i, color) in self.primary_colors.iter().enumerate() {
            let index = i.to_string();
            color.validate(&["primaryColors", index.as_str()], &mut errors);
        }
        self.background_color
            .validate(&["backgroundColor"], &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PromptError::Validation(errors))
        }
    }

    /// Non-empty reference image payload, if any
    pub fn reference_image(&self) -> Option<&str> {
        self.reference_image_base64
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "aspectRatio": "16:9",
            "primaryColors": [{"hex": "#FF0000", "alpha": 1.0}, {"hex": "#00ff00"}],
            "theme": "Nature",
            "includeText": false,
            "fontFamily": "Inter",
            "backgroundColor": {"hex": "#FFFFFF", "alpha": 0.5},
            "style": "watercolor"
        })
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let form = FormDataIn::from_json(&sample().to_string()).unwrap();
        assert_eq!(form.aspect_ratio, "16:9");
        assert_eq!(form.primary_colors.len(), 2);
        assert_eq!(form.primary_colors[1].alpha, 1.0);
        assert_eq!(form.custom_theme, None);
        assert_eq!(form.text, None);
        assert_eq!(form.reference_image(), None);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("style");

        let err = FormDataIn::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PromptError::Malformed(_)));
        assert!(err.to_string().contains("style"));
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut value = sample();
        value["primaryColors"][1]["hex"] = json!("red");
        value["backgroundColor"]["alpha"] = json!(1.5);

        let err = FormDataIn::from_json(&value.to_string()).unwrap_err();
        let errors = match err {
            PromptError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].loc, vec!["primaryColors", "1", "hex"]);
        assert_eq!(errors[1].loc, vec!["backgroundColor", "alpha"]);
    }

    #[test]
    fn test_blank_reference_image_is_ignored() {
        let mut value = sample();
        value["referenceImageBase64"] = json!("   ");
        let form = FormDataIn::from_json(&value.to_string()).unwrap();
        assert_eq!(form.reference_image(), None);

        value["referenceImageBase64"] = json!("aGVsbG8=");
        let form = FormDataIn::from_json(&value.to_string()).unwrap();
        assert_eq!(form.reference_image(), Some("aGVsbG8="));
    }

    #[test]
    fn test_hex_pattern() {
        assert!(is_hex_color("#a1B2c3"));
        assert!(!is_hex_color("a1B2c3"));
        assert!(!is_hex_color("#a1B2c"));
        assert!(!is_hex_color("#a1B2c3d"));
        assert!(!is_hex_color("#xyzxyz"));
    }
}
