//! Script-visible number formatting.

/// Formats a double the way script string conversion does.
///
/// Integral values in the plain-decimal range print without a fraction part,
/// everything else prints as the shortest round-tripping form. Magnitudes at
/// or above `1e21`, or below `1e-6`, switch to exponent notation with an
/// explicit sign on positive exponents.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // Both zeros print as "0".
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let mut buf = ryu::Buffer::new();
        let exp_form = buf.format(n);
        return match exp_form.find('e') {
            Some(pos) if !exp_form[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &exp_form[..pos], &exp_form[pos + 1..])
            }
            _ => exp_form.to_string(),
        };
    }
    // std's Display is shortest-round-trip and never uses exponent form,
    // which matches script output across the plain-decimal range.
    n.to_string()
}
