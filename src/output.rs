use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tabled::{settings::Style, Table, Tabled};

use crate::error::ReportError;

/// Write `value` as a four-space indented UTF-8 JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::YearMonth;

    #[derive(Serialize)]
    struct Doc {
        name: &'static str,
        month: YearMonth,
        missing: Option<f64>,
    }

    #[test]
    fn json_is_indented_with_four_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            name: "results",
            month: YearMonth::new(2025, 1),
            missing: None,
        };
        write_json(&path, &doc).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "{\n    \"name\": \"results\",\n    \"month\": \"2025-01\",\n    \"missing\": null\n}\n"
        );
    }
}
