

/// First `max_chars` characters of `s`, never splitting a code point.
#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}


/// Danish currency notation: `.` groups thousands, `,` separates decimals.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped},{decimals}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_danish() {
        assert_eq!(safe_truncate("Nedrivning af væg", 12), "Nedrivning a");
        assert_eq!(safe_truncate("Påslag på ærter", 6), "Påslag");
    }

    #[test]
    fn test_safe_truncate_shorter() {
        assert_eq!(safe_truncate("VVS", 10), "VVS");
    }

    #[test]
    fn test_safe_truncate_ellipsis() {
        assert_eq!(safe_truncate_ellipsis("Udskiftning af rør", 11), "Udskiftning...");
        assert_eq!(safe_truncate_ellipsis("El", 11), "El");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(585.0), "585,00");
        assert_eq!(format_amount(2040.5), "2.040,50");
        assert_eq!(format_amount(1234567.891), "1.234.567,89");
        assert_eq!(format_amount(-300.0), "-300,00");
    }
}
