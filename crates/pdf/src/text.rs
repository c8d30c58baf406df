//! Text helpers for the built-in Helvetica fonts: WinAnsi encoding, rough
//! glyph widths for layout, and German number formatting.

use rust_decimal::{Decimal, RoundingStrategy};

/// Encodes `text` for a font using `/WinAnsiEncoding`. Characters outside
/// the code page become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn glyph_width(ch: char) -> f32 {
    match ch {
        ' ' | '.' | ',' | ':' | ';' | '!' | '|' | 'i' | 'j' | 'l' | 'I' | '\'' => 0.278,
        'f' | 't' | 'r' | '(' | ')' | '/' | '-' => 0.333,
        '0'..='9' | '€' | '$' => 0.556,
        'm' | 'w' => 0.833,
        'M' | 'W' => 0.889,
        'A'..='Z' | 'Ä' | 'Ö' | 'Ü' => 0.667,
        '%' => 0.889,
        _ => 0.5,
    }
}

/// Approximate rendered width of `text` in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * font_size
}

/// Greedy word wrap against `max_width` points.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate =
            if current.is_empty() { word.to_string() } else { format!("{current} {word}") };
        if text_width(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `1234567.891` with two places becomes `1.234.567,89`.
pub fn format_decimal_de(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.*}", places as usize, rounded.abs());
    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}{grouped},{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn format_eur(value: Decimal) -> String {
    format!("{} €", format_decimal_de(value, 2))
}

pub fn format_percent(value: Decimal) -> String {
    format!("{} %", format_decimal_de(value, 2))
}
