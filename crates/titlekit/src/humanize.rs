//! Human-readable sizes and durations

/// Approximate `num_bytes` with three significant digits and a decimal SI
/// prefix, e.g. `1.02 KB`
pub fn filesize(num_bytes: u64) -> String {
    if (num_bytes as f64) < 999.9 {
        return format!("{num_bytes} B");
    }
    let mut value = num_bytes as f64;
    let mut prefix = ' ';
    for next in ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'] {
        value /= 1000.0;
        prefix = next;
        if value < 999.9 {
            break;
        }
    }
    format!("{} {prefix}B", significant(value, 3))
}

/// `"1 hr 2 min 3 sec"` style rendering of a duration in seconds
pub fn duration(seconds: f64) -> String {
    if seconds < 1.0 {
        return "less than 1 sec".to_string();
    }
    let mut remaining = seconds.round() as u64;
    let mut components = Vec::new();
    for (magnitude, label) in [(3600, "hr"), (60, "min"), (1, "sec")] {
        if remaining >= magnitude {
            components.push(format!("{} {label}", remaining / magnitude));
            remaining %= magnitude;
        }
    }
    components.join(" ")
}

/// Format with `digits` significant digits, dropping trailing zeros
fn significant(value: f64, digits: usize) -> String {
    let integer_digits = if value >= 1.0 {
        value.log10().floor() as usize + 1
    } else {
        1
    };
    let decimals = digits.saturating_sub(integer_digits);
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}
