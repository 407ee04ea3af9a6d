use std::{collections::HashMap, str::FromStr};

use serde::{Deserialize, Serialize};

pub fn des_from_str<T: for<'a> Deserialize<'a>>(body: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(body)
}

pub fn ser_to_str<T: Serialize>(t: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(t)
}

pub fn extract_token(headers: &HashMap<String, String>) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    EnUs,
    EnGb,
    DeDe,
    FrFr,
    IdId,
}

impl FromStr for Locale {
    type Err = ();

    fn from_str(tag: &str) -> Result<Self, ()> {
        match tag.to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" | "en" => Ok(Locale::EnUs),
            "en-gb" => Ok(Locale::EnGb),
            "de-de" | "de" => Ok(Locale::DeDe),
            "fr-fr" | "fr" => Ok(Locale::FrFr),
            "id-id" | "id" => Ok(Locale::IdId),
            _ => Err(()),
        }
    }
}

impl Locale {
    fn separators(self) -> (&'static str, char) {
        match self {
            Locale::EnUs | Locale::EnGb => (",", '.'),
            Locale::DeDe | Locale::IdId => (".", ','),
            Locale::FrFr => ("\u{202f}", ','),
        }
    }

    fn symbol_after_amount(self) -> bool {
        matches!(self, Locale::DeDe | Locale::FrFr)
    }
}

fn currency_symbol(currency: &str) -> &str {
    match currency {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "IDR" => "Rp",
        "JPY" => "¥",
        other => other,
    }
}

fn group_digits(digits: &str, separator: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats an amount held in minor units with exactly two decimals.
pub fn format_money(minor_units: i64, currency: &str, locale: Locale) -> String {
    let (group, decimal) = locale.separators();
    let abs = minor_units.unsigned_abs();
    let number = format!(
        "{}{}{:02}",
        group_digits(&(abs / 100).to_string(), group),
        decimal,
        abs % 100
    );
    let sign = if minor_units < 0 { "-" } else { "" };
    let symbol = currency_symbol(currency);

    if locale.symbol_after_amount() {
        format!("{sign}{number}\u{a0}{symbol}")
    } else if symbol.len() == 3 && symbol == currency {
        format!("{sign}{symbol}\u{a0}{number}")
    } else {
        format!("{sign}{symbol}{number}")
    }
}

pub fn format_percent(value: f64, locale: Locale) -> String {
    let (group, decimal) = locale.separators();
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    let spacing = if locale.symbol_after_amount() { "\u{a0}" } else { "" };
    format!(
        "{sign}{}{decimal}{frac_part}{spacing}%",
        group_digits(int_part, group)
    )
}
