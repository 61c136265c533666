//! Core traits shared by the analyzers
//!
//! Every analyzer reports its name and minimum input size, and every result
//! table can be dumped as CSV for inspection.

use crate::error::Result;
use serde::Serialize;
use std::io;

/// Properties of an analyzer that don't depend on its input
pub trait AnalyzerProperties {
    /// Get the name of the analysis algorithm
    fn algorithm_name(&self) -> &'static str;

    /// Get the minimum number of observations required
    fn minimum_sample_size(&self) -> usize;
}

/// An in-memory result table that can be written out as CSV
pub trait TabularOutput {
    /// Row type written as one CSV record
    type Row: Serialize;

    /// Materialise the rows of the table
    fn rows(&self) -> Vec<Self::Row>;

    /// Write the table, with a header, to any writer
    fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in self.rows() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Render the table as a CSV string
    fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::Error::Computation(format!("CSV output is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        radius: f64,
        count: usize,
    }

    struct Table(Vec<(f64, usize)>);

    impl TabularOutput for Table {
        type Row = Row;

        fn rows(&self) -> Vec<Row> {
            self.0
                .iter()
                .map(|&(radius, count)| Row { radius, count })
                .collect()
        }
    }

    #[test]
    fn test_csv_dump_has_header_and_rows() {
        let table = Table(vec![(10.0, 3), (20.5, 0)]);
        let text = table.to_csv_string().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["radius,count", "10.0,3", "20.5,0"]);
    }
}
