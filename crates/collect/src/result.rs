//! Combined tables produced by the aggregator.

use std::io::{self, Write};

use crate::template::ParamValue;

/// Parameters and summary means of one run (or one run and projection).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    /// Template field values, in field order.
    pub params: Vec<ParamValue>,
    /// Column means, in summary-column order.
    pub values: Vec<f64>,
}

/// One row per matched run, sorted by the template fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    fields: Vec<String>,
    value_columns: Vec<String>,
    rows: Vec<AggregatedRow>,
}

impl AggregationResult {
    /// Build a result, stable-sorting the rows by the fields in declaration order.
    pub fn new(fields: Vec<String>, value_columns: Vec<String>, mut rows: Vec<AggregatedRow>) -> Self {
        rows.sort_by(|a, b| {
            a.params
                .iter()
                .zip(&b.params)
                .map(|(x, y)| x.sort_cmp(y))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            fields,
            value_columns,
            rows,
        }
    }

    /// Header: template fields followed by the summary columns.
    pub fn columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .chain(&self.value_columns)
            .map(String::as_str)
            .collect()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    /// Values of one summary column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.value_columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    /// Value of a template field in the given row.
    pub fn param(&self, row: usize, field: &str) -> Option<&ParamValue> {
        let idx = self.fields.iter().position(|f| f == field)?;
        self.rows.get(row)?.params.get(idx)
    }

    /// Write the table as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let header: Vec<String> = self.columns().into_iter().map(csv_field).collect();
        writeln!(writer, "{}", header.join(","))?;

        for row in &self.rows {
            let mut first = true;
            for param in &row.params {
                if !first {
                    write!(writer, ",")?;
                }
                write!(writer, "{}", csv_field(&param.to_string()))?;
                first = false;
            }
            for value in &row.values {
                if !first {
                    write!(writer, ",")?;
                }
                write!(writer, "{value}")?;
                first = false;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
