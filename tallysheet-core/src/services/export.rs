//! CSV export
//!
//! Files start with a UTF-8 byte order mark so spreadsheet programs pick the
//! right encoding, and read back into the same grid the export was made from.

use std::io::{Read, Write};

use crate::domain::result::Result;
use crate::domain::{ColumnRef, Dataset};

/// UTF-8 byte order mark
pub const BOM: &str = "\u{FEFF}";

/// Write the visible columns of a dataset: header line, then one line per row
pub fn write_csv<W: Write>(dataset: &Dataset, columns: &[ColumnRef], writer: W) -> Result<()> {
    let header: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let rows = dataset
        .rows()
        .iter()
        .map(|row| columns.iter().map(|c| row.cell(c.index).to_string()).collect());
    write_rows(std::iter::once(header).chain(rows), writer)
}

/// Write a raw grid as-is
pub fn write_grid<W: Write>(grid: &[Vec<String>], writer: W) -> Result<()> {
    write_rows(grid.iter().cloned(), writer)
}

fn write_rows<W: Write>(rows: impl Iterator<Item = Vec<String>>, mut writer: W) -> Result<()> {
    writer.write_all(BOM.as_bytes())?;

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(writer);
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a CSV file back into a grid, dropping a leading byte order mark
///
/// Rows may be ragged; nothing is padded here.
pub fn read_csv<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let content = content.strip_prefix(BOM).unwrap_or(&content);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in rdr.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_export_starts_with_bom_and_quotes_as_needed() {
        let ds = Dataset::from_grid(
            None,
            &grid(&[
                &["Data", "Cliente", "Valor"],
                &["05/01/2026", "Acme, Filial 2", "1.234,56"],
            ]),
        );
        let columns = ds.visible_columns(None);
        let mut out = Vec::new();
        write_csv(&ds, &columns, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with('\u{FEFF}'));
        let lines: Vec<&str> = text.trim_start_matches('\u{FEFF}').lines().collect();
        assert_eq!(lines[0], "Data,Cliente,Valor");
        assert_eq!(lines[1], "05/01/2026,\"Acme, Filial 2\",\"1.234,56\"");
    }

    #[test]
    fn test_export_reads_back() {
        let source = grid(&[
            &["Data", "Observação"],
            &["05/01/2026", "disse \"ok\"\nnova linha"],
            &["06/01/2026", ""],
        ]);
        let ds = Dataset::from_grid(None, &source);
        let mut out = Vec::new();
        write_csv(&ds, &ds.visible_columns(None), &mut out).unwrap();

        let back = read_csv(out.as_slice()).unwrap();
        assert_eq!(back, source);
        assert_eq!(Dataset::from_grid(None, &back).len(), ds.len());
    }

    #[test]
    fn test_export_selected_columns_only() {
        let ds = Dataset::from_grid(
            None,
            &grid(&[&["Data", "Cliente", "UF"], &["05/01/2026", "Acme", "SP"]]),
        );
        let columns = ds.visible_columns(Some(&["UF".to_string()]));
        let mut out = Vec::new();
        write_csv(&ds, &columns, &mut out).unwrap();
        assert_eq!(read_csv(out.as_slice()).unwrap(), grid(&[&["UF"], &["SP"]]));
    }

    #[test]
    fn test_read_csv_without_bom() {
        let back = read_csv("a,b\n1\n".as_bytes()).unwrap();
        assert_eq!(back, grid(&[&["a", "b"], &["1"]]));
    }
}
