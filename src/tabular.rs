//! Delimited-text parsing into header-keyed raw records.

use thiserror::Error;

use crate::model::RawRecord;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no data rows could be parsed from the input")]
    EmptyDataset,
}

#[derive(Debug, Default)]
pub struct ParsedTable {
    pub records: Vec<RawRecord>,
    pub warnings: Vec<String>,
}

/// Splits decoded text into ordered records keyed by the header row.
///
/// Quoted cells may contain the delimiter itself: a quote toggles an
/// "inside literal" state and delimiters inside it are data, not field
/// boundaries. Malformed rows are skipped with a warning, never fatal;
/// only an entirely empty dataset is.
pub fn parse_table(text: &str, delimiter: char) -> Result<ParsedTable, NormalizeError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(NormalizeError::EmptyDataset);
    };
    let headers = split_row(header_line, delimiter);

    let mut table = ParsedTable::default();
    for (index, line) in lines.enumerate() {
        let cells = split_row(line, delimiter);
        if cells.len() != headers.len() {
            table.warnings.push(format!(
                "row {}: expected {} cells, found {}; row skipped",
                index + 2,
                headers.len(),
                cells.len()
            ));
            continue;
        }

        let mut record = RawRecord::new();
        for (header, cell) in headers.iter().zip(cells) {
            record.push(header.clone(), cell);
        }
        table.records.push(record);
    }

    if table.records.is_empty() {
        return Err(NormalizeError::EmptyDataset);
    }
    Ok(table)
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == delimiter && !in_quotes => {
                cells.push(std::mem::take(&mut field));
            }
            _ => field.push(ch),
        }
    }
    cells.push(field);

    cells.iter().map(|cell| cell.trim().to_string()).collect()
}

fn needs_quotes(cell: &str, delimiter: char) -> bool {
    cell.contains(delimiter) || cell.contains('"')
}

/// Re-serializes records in the same delimited format, quoting cells that
/// contain the delimiter or quotes. Inverse of [`parse_table`] for trimmed
/// cell values.
pub fn to_delimited(records: &[RawRecord], delimiter: char) -> String {
    let mut out = String::new();
    let Some(first) = records.first() else {
        return out;
    };

    let headers: Vec<&str> = first.headers().collect();
    write_row(&mut out, headers.iter().copied(), delimiter);
    for record in records {
        write_row(
            &mut out,
            record.fields.iter().map(|(_, value)| value.as_str()),
            delimiter,
        );
    }
    out
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, delimiter: char) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(delimiter);
        }
        first = false;
        if needs_quotes(cell, delimiter) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_keyed_records_and_trims_cells() {
        let table = parse_table("sku;name\n 100 ; Akku \n101;Lader\n", ';').unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].get("sku"), Some("100"));
        assert_eq!(table.records[0].get("name"), Some("Akku"));
        assert!(table.warnings.is_empty());
    }

    #[test]
    fn quoted_cells_keep_embedded_delimiters() {
        let table = parse_table("sku,name\n100,\"Akku, 2er Pack\"\n", ',').unwrap();
        assert_eq!(table.records[0].get("name"), Some("Akku, 2er Pack"));
    }

    #[test]
    fn malformed_rows_are_skipped_with_warning() {
        let table = parse_table("sku;name\n100;Akku\n101;Lader;extra\n", ';').unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.warnings.len(), 1);
        assert!(table.warnings[0].contains("row 3"));
    }

    #[test]
    fn empty_lines_are_skipped() {
        let table = parse_table("sku;name\n\n100;Akku\n\n", ';').unwrap();
        assert_eq!(table.records.len(), 1);
    }

    #[test]
    fn zero_data_rows_is_empty_dataset() {
        assert!(matches!(
            parse_table("sku;name\n", ';'),
            Err(NormalizeError::EmptyDataset)
        ));
        assert!(matches!(
            parse_table("", ';'),
            Err(NormalizeError::EmptyDataset)
        ));
    }

    #[test]
    fn parse_then_serialize_preserves_cells() {
        let input = "sku;name\n100;\"Akku; lang\"\n101;\"Quote \"\"X\"\"\"\n";
        let table = parse_table(input, ';').unwrap();
        let rendered = to_delimited(&table.records, ';');
        let reparsed = parse_table(&rendered, ';').unwrap();
        assert_eq!(reparsed.records[0].get("name"), Some("Akku; lang"));
        assert_eq!(reparsed.records[1].get("name"), Some("Quote \"X\""));
    }
}
