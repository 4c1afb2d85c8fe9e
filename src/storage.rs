use crate::models::{Language, MapDataEntry};
use anyhow::Result;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix text cells that a spreadsheet would evaluate as a formula.
fn sanitize_cell(s: &str) -> String {
    match s.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{s}"),
        _ => s.to_string(),
    }
}

/// Save a value table as CSV with header. Names are resolved for `lang`;
/// missing values are written as empty cells.
pub fn save_csv<P: AsRef<Path>>(rows: &[MapDataEntry], lang: Language, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["region_code", "district_code", "commune_code", "name", "value"])?;
    for r in rows {
        let value = r.value.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            sanitize_cell(&r.region_code),
            sanitize_cell(r.district_code.as_deref().unwrap_or("")),
            sanitize_cell(r.commune_code.as_deref().unwrap_or("")),
            sanitize_cell(&r.display_name(lang)),
            value,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a value table as a pretty JSON array (`null` values kept).
pub fn save_json<P: AsRef<Path>>(rows: &[MapDataEntry], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(rows)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let rows = vec![
            MapDataEntry::new("DJ-AR", Some(65_000.0)),
            MapDataEntry::new("DJ-OB", None),
        ];
        save_csv(&rows, Language::Fr, &csvp).unwrap();
        save_json(&rows, &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
    }

    #[test]
    fn formula_starters_are_prefixed() {
        assert_eq!(sanitize_cell("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(sanitize_cell("@foo"), "'@foo");
        assert_eq!(sanitize_cell("Arta"), "Arta");
    }
}
