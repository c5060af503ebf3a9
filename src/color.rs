//! Exon color parsing: hex, comma-separated RGB, or a small name table.
//! Invalid input warns and falls back to red rather than failing the run.

/// An RGB color with 0-255 components.
pub type Rgb = (u8, u8, u8);

const RED: Rgb = (255, 0, 0);

const NAMES: &[(&str, &str)] = &[
    ("red", "#FF0000"),
    ("blue", "#0000FF"),
    ("green", "#006600"),
    ("yellow", "#FFFF00"),
    ("purple", "#990099"),
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("orange", "#FF8000"),
    ("brown", "#663300"),
];

/// Parse a user-supplied color string.
pub fn parse_color(input: &str) -> Rgb {
    if let Some(rgb) = parse_rgb_triple(input) {
        return rgb;
    }

    let hex = if input.starts_with('#') {
        input.to_string()
    } else {
        match NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(input))
        {
            Some((_, hex)) => (*hex).to_string(),
            None => {
                log::warn!("invalid color input '{input}'; color is set to red");
                return RED;
            }
        }
    };

    match parse_hex(&hex) {
        Some(rgb) => rgb,
        None => {
            log::warn!(
                "invalid hex input '{input}' (values must range 0-9 and A-F); color is set to red"
            );
            RED
        }
    }
}

/// `R,G,B` with each component in 0-255.
fn parse_rgb_triple(input: &str) -> Option<Rgb> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != 3 {
        return None;
    }

    let mut components = [0u8; 3];
    for (slot, part) in components.iter_mut().zip(&parts) {
        *slot = part.trim().parse().ok()?;
    }

    Some((components[0], components[1], components[2]))
}

/// `#RRGGBB`.
fn parse_hex(input: &str) -> Option<Rgb> {
    let digits = input.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}
