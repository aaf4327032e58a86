use crate::scene::model::{MAX_DECIMALS, NumberFormat, Separator};

/// Format a counter value: round to `decimals`, group the integer part, wrap in prefix/suffix.
///
/// The minus sign goes in front of the prefix (`-$1,234K`). Non-finite values format as zero.
pub fn format_number(value: f64, fmt: &NumberFormat) -> String {
    let decimals = fmt.decimals.min(MAX_DECIMALS);
    let value = if value.is_finite() { value } else { 0.0 };
    let scale = 10f64.powi(i32::from(decimals));
    let rounded = (value.abs() * scale).round() / scale;
    let fixed = format!("{:.*}", usize::from(decimals), rounded);

    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    // "-0" is never shown
    let negative = value < 0.0 && rounded > 0.0;

    let mut out = String::with_capacity(fixed.len() + fmt.prefix.len() + fmt.suffix.len() + 8);
    if negative {
        out.push('-');
    }
    out.push_str(&fmt.prefix);
    push_grouped(&mut out, int_part, fmt.separator);
    if let Some(frac) = frac_part {
        out.push(fmt.separator.decimal_mark());
        out.push_str(frac);
    }
    out.push_str(&fmt.suffix);
    out
}

fn push_grouped(out: &mut String, digits: &str, separator: Separator) {
    let Some(sep) = separator.group_char() else {
        out.push_str(digits);
        return;
    };
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/format.rs"]
mod tests;
