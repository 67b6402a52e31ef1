//! Prompt document assembly

use serde::{Deserialize, Serialize};

use crate::color::hex_to_rgba;
use crate::error::Result;
use crate::schema::FormDataIn;

const GOAL: &str = "Generate a single image based on structured constraints.";
const TEXT_LAYOUT_HINT: &str = "safe-area, high-contrast, no-clipping";

/// Theme values that select the free-text `customTheme` instead
const CUSTOM_THEME_MARKERS: [&str; 3] = ["özel", "ozel", "custom"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub goal: String,
    pub aesthetics: Aesthetics,
    pub composition: Composition,
    pub overlays: Overlays,
    pub constraints: Constraints,
    pub references: References,
    pub output: Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aesthetics {
    pub theme: String,
    pub art_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub aspect_ratio: String,
    pub background: String,
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlays {
    pub include_text: bool,
    pub text_block: Option<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub font_family: String,
    pub layout_hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub noise: String,
    pub consistency: String,
    pub lighting: String,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            noise: "low".to_string(),
            consistency: "high".to_string(),
            lighting: "studio-balanced".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct References {
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub format: String,
    pub safety: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            safety: "standard".to_string(),
        }
    }
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOut {
    pub prompt: Prompt,
}

/// Assemble the prompt document for `data`, pointing at an optional reference image.
pub fn build_prompt(data: &FormDataIn, reference_image_url: Option<&str>) -> Result<Prompt> {
    let theme = if CUSTOM_THEME_MARKERS.contains(&data.theme.to_lowercase().as_str()) {
        data.custom_theme
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string()
    } else {
        data.theme.clone()
    };

    let palette = data
        .primary_colors
        .iter()
        .map(|c| hex_to_rgba(&c.hex, c.alpha))
        .collect::<Result<Vec<_>>>()?;
    let background = hex_to_rgba(&data.background_color.hex, data.background_color.alpha)?;

    let text = data.text.as_deref().unwrap_or_default().trim();
    let text_block = (data.include_text && !text.is_empty()).then(|| TextBlock {
        text: text.to_string(),
        font_family: data.font_family.clone(),
        layout_hint: TEXT_LAYOUT_HINT.to_string(),
    });

    Ok(Prompt {
        goal: GOAL.to_string(),
        aesthetics: Aesthetics {
            theme,
            art_style: data.style.clone(),
        },
        composition: Composition {
            aspect_ratio: data.aspect_ratio.clone(),
            background,
            palette,
        },
        overlays: Overlays {
            include_text: text_block.is_some(),
            text_block,
        },
        constraints: Constraints::default(),
        references: References {
            image_url: reference_image_url.map(str::to_string),
        },
        output: Output::default(),
    })
}
