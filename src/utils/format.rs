//! Display formatting for money amounts. Amounts are shown in the configured currency;
//! nothing is converted.

/// Decimal and grouping separators used by a BCP 47 language tag such as `de-DE`.
pub fn separators_for(locale: &str) -> (char, char) {
    let language = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match language.as_str() {
        "de" | "es" | "it" | "nl" | "pt" | "id" | "tr" | "da" => (',', '.'),
        "fr" | "pl" | "cs" | "sv" | "fi" | "nb" | "ru" | "uk" => (',', ' '),
        _ => ('.', ','),
    }
}

pub fn minor_units_for(currency: &str) -> usize {
    match currency {
        "JPY" | "KRW" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

pub fn format_number(value: f64, precision: usize, decimal: char, grouping: char) -> String {
    let body = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body.as_str(), None),
    };
    let mut out = String::new();
    if value < 0.0 && body.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, grouping));
    if let Some(frac_part) = frac_part {
        out.push(decimal);
        out.push_str(frac_part);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// `amount` with the currency code, e.g. `EUR 1.234,50` for `de-DE`.
pub fn format_amount(locale: &str, currency: &str, amount: f64) -> String {
    let (decimal, grouping) = separators_for(locale);
    let body = format_number(amount, minor_units_for(currency), decimal, grouping);
    format!("{currency} {body}")
}
