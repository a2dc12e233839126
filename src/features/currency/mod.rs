//! # Currency Feature
//!
//! Exchange rates against the rouble and conversion between any two listed
//! currencies (cross rates go through RUB).
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Rate cache, comma decimals in conversion input
//! - 1.0.0: Initial release

pub mod client;

pub use client::CurrencyClient;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;

/// Shown first in the rate list and in the morning summary
pub const PRIORITY_CURRENCIES: [&str; 7] = ["USD", "EUR", "GBP", "JPY", "CHF", "CNY", "UAH"];

pub const BASE_CURRENCY: &str = "RUB";

const CONVERSION_PATTERN: &str =
    r"^\s*(\d+(?:[.,]\d+)?)\s+([A-Za-z]{3})\s+(?:(?i:to|in)\s+)?([A-Za-z]{3})\s*$";

#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub code: String,
    pub name: String,
    /// Roubles per single unit
    pub per_unit: f64,
}

/// One day's rates, all quoted in roubles
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    /// Publication date, `YYYY-MM-DD`
    pub date: String,
    rates: HashMap<String, Rate>,
}

impl RateTable {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            rates: HashMap::new(),
        }
    }

    /// Add a quote of `value` roubles for `nominal` units
    pub fn insert(&mut self, code: &str, name: &str, value: f64, nominal: f64) {
        if nominal <= 0.0 {
            return;
        }
        let code = code.to_uppercase();
        self.rates.insert(
            code.clone(),
            Rate {
                code,
                name: name.to_string(),
                per_unit: value / nominal,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Roubles per unit of `code`; the rouble itself is 1
    pub fn rate_to_rub(&self, code: &str) -> Option<f64> {
        let code = code.to_uppercase();
        if code == BASE_CURRENCY {
            return Some(1.0);
        }
        self.rates.get(&code).map(|rate| rate.per_unit)
    }

    /// Units of `to` per unit of `from`
    pub fn cross_rate(&self, from: &str, to: &str) -> Result<f64> {
        let from_rate = self
            .rate_to_rub(from)
            .ok_or_else(|| anyhow!("Unknown currency: {}", from.to_uppercase()))?;
        let to_rate = self
            .rate_to_rub(to)
            .ok_or_else(|| anyhow!("Unknown currency: {}", to.to_uppercase()))?;
        Ok(from_rate / to_rate)
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        Ok(amount * self.cross_rate(from, to)?)
    }

    /// Priority currencies in their fixed order, then the rest by code
    pub fn ordered(&self) -> (Vec<&Rate>, Vec<&Rate>) {
        let priority: Vec<&Rate> = PRIORITY_CURRENCIES
            .iter()
            .filter_map(|code| self.rates.get(*code))
            .collect();

        let mut others: Vec<&Rate> = self
            .rates
            .values()
            .filter(|rate| !PRIORITY_CURRENCIES.contains(&rate.code.as_str()))
            .collect();
        others.sort_by(|a, b| a.code.cmp(&b.code));

        (priority, others)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

/// Parse `AMOUNT FROM TO`, e.g. `100 usd eur` or `12,5 EUR to RUB`
pub fn parse_conversion(input: &str) -> Result<ConversionRequest> {
    let pattern = Regex::new(CONVERSION_PATTERN)?;
    let captures = pattern
        .captures(input)
        .ok_or_else(|| anyhow!("Use the format AMOUNT FROM TO, e.g. 100 USD RUB"))?;

    let amount: f64 = captures[1]
        .replace(',', ".")
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", &captures[1]))?;
    if amount <= 0.0 {
        return Err(anyhow!("The amount must be greater than zero"));
    }

    Ok(ConversionRequest {
        amount,
        from: captures[2].to_uppercase(),
        to: captures[3].to_uppercase(),
    })
}

pub fn currency_emoji(code: &str) -> &'static str {
    match code {
        "USD" => "💵",
        "EUR" => "💶",
        "GBP" => "💷",
        "JPY" => "💴",
        "CHF" => "🇨🇭",
        "CNY" => "🇨🇳",
        "UAH" => "🇺🇦",
        "RUB" => "₽",
        _ => "💰",
    }
}

fn display_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%-d %B %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_rates(table: &RateTable) -> String {
    let (priority, others) = table.ordered();
    let mut text = format!("💱 **Exchange rates for {}**\n\n", display_date(&table.date));

    if !priority.is_empty() {
        text.push_str("**Major currencies:**\n");
        for rate in priority {
            text.push_str(&format!(
                "{} **{}**: {:.2} ₽\n",
                currency_emoji(&rate.code),
                rate.code,
                rate.per_unit
            ));
        }
    }

    if !others.is_empty() {
        text.push_str("\n**Other currencies:**\n");
        for rate in others {
            text.push_str(&format!(
                "💰 **{}** ({}): {:.2} ₽\n",
                rate.code, rate.name, rate.per_unit
            ));
        }
    }

    text.trim_end().to_string()
}

pub fn format_conversion(request: &ConversionRequest, result: f64) -> String {
    format!(
        "✅ **Conversion result**\n\n{} {:.2} {} =\n{} {:.2} {}",
        currency_emoji(&request.from),
        request.amount,
        request.from,
        currency_emoji(&request.to),
        result,
        request.to
    )
}

/// Compact rate block for the morning summary
pub fn format_morning_rates(table: &RateTable) -> String {
    let (priority, _) = table.ordered();
    priority
        .iter()
        .map(|rate| format!("{} {}: {:.2} ₽", currency_emoji(&rate.code), rate.code, rate.per_unit))
        .collect::<Vec<_>>()
        .join("\n")
}
