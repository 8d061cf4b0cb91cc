use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::UserConfig;
use crate::document::{CellRef, CellValue, Sheet};
use crate::model::{ConsoleCoverageRow, CoverageRecord};
use crate::style::{StyleTemplate, apply_threshold_fill};
use crate::util::format_ratio_percent;

const DATE_POSITION: CellRef = CellRef::new(1, 8);
const WARNING_HEADER_POSITION: CellRef = CellRef::new(2, 7);
const FATAL_HEADER_POSITION: CellRef = CellRef::new(2, 8);
const RESULT_START_ROW: u32 = 3;
const TEMPLATE_ROW: u32 = RESULT_START_ROW;

const INDEX_COLUMN: u32 = 1;
const NAME_COLUMN: u32 = 2;
const COVERAGE_COLUMN: u32 = 3;
const TOTAL_LINES_COLUMN: u32 = 4;
const COVERED_LINES_COLUMN: u32 = 5;
const UNCOVERED_LINES_COLUMN: u32 = 6;
const WARNING_MARK_COLUMN: u32 = 7;
const FATAL_MARK_COLUMN: u32 = 8;

const TEXT_HEADERS: [&str; 5] = [
    "ApexClassName",
    "Coverage",
    "TotalLines",
    "CoveredLines",
    "UncoveredLines",
];

pub fn write_text_table<W: Write>(output: &mut W, records: &[&CoverageRecord]) -> Result<()> {
    let rows = records
        .iter()
        .map(|record| {
            let row = ConsoleCoverageRow::from(*record);
            [
                row.apex_class_name,
                row.coverage,
                row.total_lines.to_string(),
                row.covered_lines.to_string(),
                row.uncovered_lines.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = TEXT_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    writeln!(
        output,
        "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {:>w4$}",
        TEXT_HEADERS[0],
        TEXT_HEADERS[1],
        TEXT_HEADERS[2],
        TEXT_HEADERS[3],
        TEXT_HEADERS[4],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3],
        w4 = widths[4],
    )?;
    for row in &rows {
        writeln!(
            output,
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {:>w4$}",
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
            w4 = widths[4],
        )?;
    }
    output.flush()?;
    Ok(())
}

pub fn write_json_table<W: Write>(output: &mut W, records: &[&CoverageRecord]) -> Result<()> {
    let rows = records
        .iter()
        .map(|record| ConsoleCoverageRow::from(*record))
        .collect::<Vec<_>>();
    serde_json::to_writer_pretty(&mut *output, &rows)
        .context("failed to serialize coverage json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

/// Fills the report sheet from the template row downwards; returns rows written.
pub fn render_report<S: Sheet + ?Sized>(
    sheet: &mut S,
    records: &[&CoverageRecord],
    config: &UserConfig,
    generated_at: &str,
) -> usize {
    let thresholds = &config.thresholds;
    let report_style = &config.report_style;
    let template = StyleTemplate::capture(&*sheet, TEMPLATE_ROW);
    if template.is_empty() {
        warn!(row = TEMPLATE_ROW, "template sheet has no used columns to copy styles from");
    } else {
        debug!(columns = template.len(), "captured template row styles");
    }

    sheet.set_value(DATE_POSITION, CellValue::from(generated_at));
    sheet.set_value(
        WARNING_HEADER_POSITION,
        CellValue::from(format!(
            "< {}%",
            format_ratio_percent(thresholds.warning_ratio)
        )),
    );
    sheet.set_value(
        FATAL_HEADER_POSITION,
        CellValue::from(format!("< {}%", format_ratio_percent(thresholds.fatal_ratio))),
    );

    for (offset, record) in (0_u32..).zip(records) {
        let row = RESULT_START_ROW + offset;
        let ratio = record.coverage_ratio();
        template.apply_to_row(sheet, row);

        let below_mark = || CellValue::from(report_style.below_mark.as_str());
        let cells = [
            (INDEX_COLUMN, Some(CellValue::from(u64::from(offset) + 1))),
            (NAME_COLUMN, Some(CellValue::from(record.unit_name.as_str()))),
            (COVERAGE_COLUMN, Some(CellValue::from(ratio))),
            (TOTAL_LINES_COLUMN, Some(CellValue::from(record.total_lines))),
            (COVERED_LINES_COLUMN, Some(CellValue::from(record.lines_covered))),
            (
                UNCOVERED_LINES_COLUMN,
                Some(CellValue::from(record.lines_uncovered)),
            ),
            (
                WARNING_MARK_COLUMN,
                thresholds.is_below_warning(ratio).then(below_mark),
            ),
            (
                FATAL_MARK_COLUMN,
                thresholds.is_below_fatal(ratio).then(below_mark),
            ),
        ];

        for (column, value) in cells {
            let at = CellRef::new(row, column);
            match value {
                Some(value) => sheet.set_value(at, value),
                None => sheet.clear_value(at),
            }
            apply_threshold_fill(sheet, at, ratio, thresholds, report_style);
        }
    }

    records.len()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::{render_report, write_json_table, write_text_table};
    use crate::config::UserConfig;
    use crate::document::{CellRef, CellValue, JsonSheet, JsonWorkbook, Sheet, XlsxWorkbook};
    use crate::model::CoverageRecord;
    use crate::style::FILL_PROPERTY;

    const CONFIG: &str = r#"
loginUrl: https://login.salesforce.com
apiVersion: "59.0"
accessToken: token
warningPercent: 0.8
fatalPercent: 0.5
warningColor: ffff00
fatalColor: ff0000
belowMark: "*"
"#;

    fn config() -> UserConfig {
        UserConfig::from_yaml_str(Path::new("user_config.yaml"), CONFIG)
            .expect("test config should parse")
    }

    fn record(name: &str, covered: u64, uncovered: u64) -> CoverageRecord {
        CoverageRecord::try_new(None, name.to_string(), covered, uncovered)
            .expect("line counts should fit")
    }

    fn template() -> JsonSheet {
        let mut sheet = JsonSheet::new("Coverage");
        sheet.set_value(CellRef::new(2, 2), CellValue::from("ApexClassName"));
        for column in 1..=8 {
            sheet.set_style_property(CellRef::new(3, column), "border", json!("thin"));
            sheet.set_style_property(CellRef::new(3, column), FILL_PROPERTY, json!("ffffff"));
        }
        sheet
    }

    fn fill(sheet: &JsonSheet, row: u32, column: u32) -> Option<serde_json::Value> {
        sheet
            .style(CellRef::new(row, column), &[FILL_PROPERTY])
            .get(FILL_PROPERTY)
            .cloned()
    }

    fn text(sheet: &JsonSheet, row: u32, column: u32) -> Option<CellValue> {
        sheet.value(CellRef::new(row, column)).cloned()
    }

    #[test]
    fn render_report_writes_headers_rows_marks_and_fills() {
        let records = [
            record("alpha", 9, 1),
            record("Beta", 6, 4),
            record("Gamma", 1, 3),
        ];
        let refs = records.iter().collect::<Vec<_>>();
        let mut sheet = template();

        let rows = render_report(&mut sheet, &refs, &config(), "2024/01/02 03:04:05");

        assert_eq!(rows, 3);
        assert_eq!(text(&sheet, 1, 8), Some(CellValue::from("2024/01/02 03:04:05")));
        assert_eq!(text(&sheet, 2, 7), Some(CellValue::from("< 80%")));
        assert_eq!(text(&sheet, 2, 8), Some(CellValue::from("< 50%")));

        assert_eq!(text(&sheet, 3, 1), Some(CellValue::Integer(1)));
        assert_eq!(text(&sheet, 3, 2), Some(CellValue::from("alpha")));
        assert_eq!(text(&sheet, 3, 3), Some(CellValue::Number(0.9)));
        assert_eq!(text(&sheet, 3, 7), None);
        assert_eq!(fill(&sheet, 3, 2), Some(json!("ffffff")));

        assert_eq!(text(&sheet, 4, 7), Some(CellValue::from("*")));
        assert_eq!(text(&sheet, 4, 8), None);
        assert_eq!(fill(&sheet, 4, 1), Some(json!("ffff00")));
        assert_eq!(fill(&sheet, 4, 8), Some(json!("ffff00")));

        assert_eq!(text(&sheet, 5, 4), Some(CellValue::Integer(4)));
        assert_eq!(text(&sheet, 5, 7), Some(CellValue::from("*")));
        assert_eq!(text(&sheet, 5, 8), Some(CellValue::from("*")));
        assert_eq!(fill(&sheet, 5, 6), Some(json!("ff0000")));

        assert_eq!(
            sheet
                .style(CellRef::new(5, 3), &["border"])
                .get("border")
                .cloned(),
            Some(json!("thin"))
        );
    }

    #[test]
    fn render_report_does_not_flag_ratio_equal_to_threshold() {
        let records = [record("Edge", 1, 1)];
        let refs = records.iter().collect::<Vec<_>>();
        let mut sheet = template();

        render_report(&mut sheet, &refs, &config(), "now");

        assert_eq!(text(&sheet, 3, 8), None);
        assert_eq!(text(&sheet, 3, 7), Some(CellValue::from("*")));
        assert_eq!(fill(&sheet, 3, 3), Some(json!("ffff00")));
    }

    #[test]
    fn render_report_uses_bundled_template() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/coverage_template.json");
        let mut workbook = JsonWorkbook::load(&path).expect("bundled template should load");
        let sheet = workbook.first_sheet_mut().expect("template has a sheet");
        let records = [record("AccountService", 3, 1)];
        let refs = records.iter().collect::<Vec<_>>();

        render_report(sheet, &refs, &config(), "now");

        assert_eq!(text(sheet, 3, 2), Some(CellValue::from("AccountService")));
        assert_eq!(
            sheet
                .style(CellRef::new(3, 3), &["numberFormat"])
                .get("numberFormat")
                .cloned(),
            Some(json!("0%"))
        );
        assert_eq!(fill(sheet, 3, 3), Some(json!("ffff00")));
    }

    #[test]
    fn render_report_fills_bundled_xlsx_template() {
        let template_path =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/coverage_template.xlsx");
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let result_path = dir.path().join("result").join("coverage_report.xlsx");
        let records = [record("AccountService", 3, 1), record("ContactTrigger", 1, 3)];
        let refs = records.iter().collect::<Vec<_>>();

        let mut workbook = XlsxWorkbook::load(&template_path).expect("bundled template should load");
        let sheet = workbook.first_sheet_mut().expect("template has a sheet");
        render_report(sheet, &refs, &config(), "2024/01/02 03:04:05");
        workbook.save(&result_path).expect("report should save");

        let mut report = XlsxWorkbook::load(&result_path).expect("report should reload");
        let sheet = report.first_sheet_mut().expect("report has a sheet");
        assert_eq!(sheet.get_value((8, 1)), "2024/01/02 03:04:05");
        assert_eq!(sheet.get_value((7, 2)), "< 80%");
        assert_eq!(sheet.get_value((2, 3)), "AccountService");
        assert_eq!(sheet.get_value((2, 4)), "ContactTrigger");
        assert_eq!(sheet.get_value((8, 4)), "*");
        assert_eq!(sheet.get_value((8, 3)), "");

        let style = sheet.style(CellRef::new(4, 3), &[FILL_PROPERTY, "numberFormat", "border"]);
        assert_eq!(style.get(FILL_PROPERTY), Some(&json!("FFFF0000")));
        assert_eq!(style.get("numberFormat"), Some(&json!("0%")));
        assert_eq!(style.get("border"), Some(&json!(true)));
        assert_eq!(
            sheet
                .style(CellRef::new(3, 2), &[FILL_PROPERTY])
                .get(FILL_PROPERTY)
                .cloned(),
            Some(json!("FFFFFF00"))
        );
    }

    #[test]
    fn write_text_table_aligns_columns() {
        let records = [
            record("AccountService", 2, 1),
            record("X", 10, 0),
        ];
        let refs = records.iter().collect::<Vec<_>>();
        let mut buffer = Vec::new();

        write_text_table(&mut buffer, &refs).expect("table should render");
        let rendered = String::from_utf8(buffer).expect("utf8 output");
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ApexClassName "));
        assert!(lines[1].starts_with("AccountService"));
        assert!(lines[1].contains("66%"));
        assert!(lines[2].contains("100%"));
        assert_eq!(lines[0].len(), lines[1].len());
    }

    #[test]
    fn write_json_table_uses_console_field_names() {
        let records = [record("A", 3, 1)];
        let refs = records.iter().collect::<Vec<_>>();
        let mut buffer = Vec::new();

        write_json_table(&mut buffer, &refs).expect("json should render");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");
        assert_eq!(
            value,
            json!([{
                "apexClassName": "A",
                "coverage": "75%",
                "totalLines": 4,
                "coveredLines": 3,
                "uncoveredLines": 1
            }])
        );
    }
}
