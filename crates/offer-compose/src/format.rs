//! Amount formatting for price tokens

use serde::{Deserialize, Serialize};

/// How monetary amounts are written into documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountFormat {
    pub decimals: usize,
    pub decimal_separator: char,
    /// `None` disables digit grouping
    pub thousands_separator: Option<char>,
    pub symbol: Option<String>,
    /// Write the symbol after the number ("1.00 €") instead of before
    pub symbol_after: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self {
            decimals: 2,
            decimal_separator: '.',
            thousands_separator: Some(','),
            symbol: None,
            symbol_after: false,
        }
    }
}

impl AmountFormat {
    pub fn format(&self, amount: f64) -> String {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let fixed = format!("{:.*}", self.decimals, amount.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::new();
        if amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }
        match self.thousands_separator {
            Some(sep) => out.push_str(&group_digits(int_part, sep)),
            None => out.push_str(int_part),
        }
        if let Some(frac) = frac_part {
            out.push(self.decimal_separator);
            out.push_str(frac);
        }

        match &self.symbol {
            Some(symbol) if self.symbol_after => format!("{} {}", out, symbol),
            Some(symbol) => format!("{}{}", symbol, out),
            None => out,
        }
    }
}

fn group_digits(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_groups_thousands() {
        let f = AmountFormat::default();
        assert_eq!(f.format(11000.0), "11,000.00");
        assert_eq!(f.format(999.5), "999.50");
        assert_eq!(f.format(-1234567.891), "-1,234,567.89");
        assert_eq!(f.format(-0.001), "0.00");
    }

    #[test]
    fn test_symbol_and_separators() {
        let f = AmountFormat {
            decimal_separator: ',',
            thousands_separator: Some('.'),
            symbol: Some("€".to_string()),
            symbol_after: true,
            ..AmountFormat::default()
        };
        assert_eq!(f.format(10500.0), "10.500,00 €");
    }
}
