use crate::error::{PromptError, Result};

/// `#RRGGBB` plus alpha to `rgba(r,g,b,a)` with alpha at two decimals
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Result<String> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PromptError::InvalidColor(hex.to_string()));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| PromptError::InvalidColor(hex.to_string()))
    };
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);

    Ok(format!("rgba({},{},{},{:.2})", r, g, b, alpha))
}
