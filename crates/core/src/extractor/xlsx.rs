use crate::error::ExtractionError;
use crate::models::FileFormat;
use calamine::{DataType, Range, Reader, Xlsx};
use std::io::Cursor;
use tracing::warn;

/// One line per row, cells separated by single spaces, sheets in workbook order. Rows and columns
/// count from A1, so blank cells ahead of the first value still show up as empty fields.
pub fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::malformed(FileFormat::Xlsx, error))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut lines = Vec::new();

    for name in sheet_names {
        match workbook.worksheet_range(&name) {
            Some(Ok(range)) => lines.extend(sheet_lines(&range)),
            Some(Err(error)) => warn!(sheet = %name, %error, "skipping unreadable worksheet"),
            None => warn!(sheet = %name, "worksheet listed in workbook but missing"),
        }
    }

    Ok(lines.join("\n"))
}

/// calamine ranges start at the first used cell; pad back to A1.
fn sheet_lines(range: &Range<DataType>) -> Vec<String> {
    let (Some((start_row, start_col)), Some((_, end_col))) = (range.start(), range.end()) else {
        return Vec::new();
    };

    let blank_row = vec![String::new(); end_col as usize + 1].join(" ");
    let lead = vec![String::new(); start_col as usize];

    let mut lines = vec![blank_row; start_row as usize];
    lines.extend(range.rows().map(|row| {
        lead.iter()
            .cloned()
            .chain(row.iter().map(cell_text))
            .collect::<Vec<_>>()
            .join(" ")
    }));
    lines
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(value) => value.clone(),
        DataType::DateTime(_) => match cell.as_datetime() {
            Some(moment) => moment.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::extract_xlsx;
    use super::fixtures::{xlsx_package, xlsx_parts};
    use crate::extractor::ooxml::fixtures::zip_package;

    #[test]
    fn rows_become_space_joined_lines_across_sheets() {
        let parts = concat!(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#,
            r#"<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>3</v></c></row>"#,
            r#"<row r="3"><c r="A3" t="s"><v>3</v></c><c r="C3" t="s"><v>4</v></c></row>"#,
        );
        let notes = r#"<row r="1"><c r="A1" t="s"><v>5</v></c></row>"#;
        let bytes = xlsx_package(
            &[("Parts", parts), ("Notes", notes)],
            &["Name", "Qty", "bolts", "nuts", "spare", "tail"],
        );

        let text = extract_xlsx(&bytes).expect("workbook should be readable");

        assert_eq!(text, "Name Qty \nbolts 3 \nnuts  spare\ntail");
    }

    #[test]
    fn leading_blank_rows_and_columns_count_from_a1() {
        let sheet = r#"<row r="2"><c r="B2" t="s"><v>0</v></c></row>"#;
        let bytes = xlsx_package(&[("Offset", sheet)], &["x"]);

        let text = extract_xlsx(&bytes).expect("workbook should be readable");

        assert_eq!(text, " \n x");
    }

    #[test]
    fn date_formatted_cells_render_as_timestamps() {
        let sheet = r#"<row r="1"><c r="A1" s="1"><v>45292</v></c><c r="B1"><v>45292</v></c></row>"#;
        let bytes = xlsx_package(&[("Dates", sheet)], &[]);

        let text = extract_xlsx(&bytes).expect("workbook should be readable");

        assert_eq!(text, "2024-01-01 00:00:00 45292");
    }

    #[test]
    fn worksheet_with_missing_part_is_skipped() {
        let broken = r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#;
        let kept = r#"<row r="1"><c r="A1" t="s"><v>1</v></c></row>"#;
        let parts = xlsx_parts(&[("Lost", broken), ("Kept", kept)], &["lost", "kept"])
            .into_iter()
            .filter(|(name, _)| name != "xl/worksheets/sheet1.xml")
            .collect::<Vec<_>>();

        let text = extract_xlsx(&zip_package(&parts)).expect("other sheets still extract");

        assert_eq!(text, "kept");
    }

    #[test]
    fn blank_workbook_is_empty_text() {
        let bytes = xlsx_package(&[("Empty", "")], &[]);
        assert_eq!(extract_xlsx(&bytes).expect("blank workbook"), "");
    }

    #[test]
    fn non_zip_input_is_rejected() {
        assert!(extract_xlsx(b"not a workbook").is_err());
    }
}
