//! Display helpers shared by notifications and the log presenter.

/// Six decimal places, `-` if not finite.
pub fn price(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    format!("{value:.6}")
}

/// Ratio as a percentage with two decimals, eg/ `0.0512` → `5.12%`.
pub fn percent(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "-".to_string();
    }
    format!("{:.2}%", ratio * 100.0)
}

/// Like [`percent`] with an explicit sign, eg/ `+5.12%`.
pub fn signed_percent(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "-".to_string();
    }
    format!("{:+.2}%", ratio * 100.0)
}

/// Rounded to an integer with thousands separators, eg/ `6000000.4` → `6,000,000`.
pub fn volume(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_helpers() {
        struct TestCase {
            actual: String,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0
                actual: price(61000.0),
                expected: "61000.000000",
            },
            TestCase {
                // TC1
                actual: price(f64::NAN),
                expected: "-",
            },
            TestCase {
                // TC2
                actual: percent(1.0 / 60.0),
                expected: "1.67%",
            },
            TestCase {
                // TC3
                actual: percent(-0.05),
                expected: "-5.00%",
            },
            TestCase {
                // TC4
                actual: signed_percent(0.051),
                expected: "+5.10%",
            },
            TestCase {
                // TC5
                actual: volume(6_000_000.4),
                expected: "6,000,000",
            },
            TestCase {
                // TC6
                actual: volume(999.5),
                expected: "1,000",
            },
            TestCase {
                // TC7
                actual: volume(-1_234_567.0),
                expected: "-1,234,567",
            },
            TestCase {
                // TC8
                actual: volume(12.0),
                expected: "12",
            },
            TestCase {
                // TC9
                actual: volume(f64::INFINITY),
                expected: "-",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.actual, test.expected, "TC{} failed", index);
        }
    }
}
