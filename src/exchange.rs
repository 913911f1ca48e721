//! Exchange-rate lookup and optional local-currency revenue.
//!
//! Rates are reference data only: they are never joined into the fact table,
//! and [`apply_local_currency`] runs only when a caller asks for it.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::{
    data::Value,
    schema::{ColumnType, columns},
    table::Table,
};

#[derive(Debug, Clone, Default)]
pub struct ExchangeRates {
    rates: HashMap<(String, NaiveDate), Decimal>,
}

impl ExchangeRates {
    /// Builds the lookup from a normalized exchange-rate table. Rows with a
    /// null currency, date or rate are skipped; the first row of a repeated
    /// (currency, date) pair wins.
    pub fn from_table(table: &Table) -> Result<Self> {
        let index = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| anyhow!("Exchange rate table has no '{name}' column"))
        };
        let (currency_idx, date_idx, rate_idx) = (
            index(columns::CURRENCY)?,
            index(columns::DATE)?,
            index(columns::EXCHANGE)?,
        );
        let mut rates = HashMap::new();
        let mut skipped = 0usize;
        for row in 0..table.row_count() {
            let currency = table.value(row, currency_idx).map(Value::as_display);
            let date = table.value(row, date_idx).and_then(Value::as_date);
            let rate = table.value(row, rate_idx).and_then(Value::as_decimal);
            match (currency, date, rate) {
                (Some(currency), Some(date), Some(rate)) => {
                    rates
                        .entry((normalize_code(&currency), date))
                        .or_insert(rate);
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("Skipped {skipped} incomplete exchange rate row(s)");
        }
        Ok(Self { rates })
    }

    pub fn rate(&self, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.rates.get(&(normalize_code(currency), date)).copied()
    }

    pub fn convert(&self, amount_usd: Decimal, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.rate(currency, date).and_then(|rate| amount_usd.checked_mul(rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Adds `Revenue Local`, the USD revenue converted at the order-date rate of
/// the row's currency. Rows without a revenue, currency, date or rate get null.
pub fn apply_local_currency(fact: &Table, rates: &ExchangeRates) -> Result<Table> {
    let (Some(revenue_idx), Some(currency_idx), Some(date_idx)) = (
        fact.column_index(columns::REVENUE),
        fact.column_index(columns::CURRENCY_CODE),
        fact.column_index(columns::ORDER_DATE),
    ) else {
        debug!("Skipping local currency revenue: revenue, currency code or order date missing");
        return Ok(fact.clone());
    };
    let converted = (0..fact.row_count())
        .map(|row| {
            let amount = fact.value(row, revenue_idx).and_then(Value::as_decimal)?;
            let currency = fact.value(row, currency_idx).map(Value::as_display)?;
            let date = fact.value(row, date_idx).and_then(Value::as_date)?;
            rates.convert(amount, &currency, date).map(Value::Decimal)
        })
        .collect::<Vec<_>>();
    let converted_rows = converted.iter().filter(|v| v.is_some()).count();
    info!(
        "Converted revenue to local currency for {}/{} row(s)",
        converted_rows,
        fact.row_count()
    );
    fact.clone()
        .with_column(columns::REVENUE_LOCAL, ColumnType::Decimal, converted)
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn rates_table() -> Table {
        Table::from_rows(
            "rates",
            vec![
                ColumnMeta::new("Date", ColumnType::Date),
                ColumnMeta::new("Currency", ColumnType::String),
                ColumnMeta::new("Exchange", ColumnType::Decimal),
            ],
            vec![
                vec![
                    Some(Value::Date(date(1))),
                    Some(Value::String("EUR".into())),
                    Some(Value::Decimal(Decimal::new(9, 1))),
                ],
                vec![
                    Some(Value::Date(date(1))),
                    Some(Value::String("EUR".into())),
                    Some(Value::Decimal(Decimal::new(5, 1))),
                ],
                vec![Some(Value::Date(date(2))), Some(Value::String("CAD".into())), None],
            ],
        )
        .unwrap()
    }

    #[test]
    fn first_rate_wins_and_codes_are_case_insensitive() {
        let rates = ExchangeRates::from_table(&rates_table()).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates.rate("eur", date(1)), Some(Decimal::new(9, 1)));
        assert_eq!(rates.rate("CAD", date(2)), None);
        assert_eq!(
            rates.convert(Decimal::from(10), "EUR", date(1)),
            Some(Decimal::from(9))
        );
    }

    #[test]
    fn missing_columns_are_an_error() {
        let table = Table::new("rates", vec![ColumnMeta::new("Date", ColumnType::Date)]);
        assert!(ExchangeRates::from_table(&table).is_err());
    }
}
