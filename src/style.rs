use serde_json::Value;

use crate::config::{ReportStyleConfig, Thresholds};
use crate::document::{CellRef, CellStyle, Sheet};

pub const FILL_PROPERTY: &str = "fill";

pub const TEMPLATE_STYLE_PROPERTIES: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "strikethrough",
    "subscript",
    "superscript",
    "fontSize",
    "fontFamily",
    "fontColor",
    "horizontalAlignment",
    "justifyLastLine",
    "indent",
    "verticalAlignment",
    "wrapText",
    "shrinkToFit",
    "textDirection",
    "textRotation",
    "angleTextCounterclockwise",
    "angleTextClockwise",
    "rotateTextUp",
    "rotateTextDown",
    "verticalText",
    FILL_PROPERTY,
    "border",
    "borderColor",
    "borderStyle",
    "diagonalBorderDirection",
    "numberFormat",
];

/// Per-column styles captured once from the template row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleTemplate {
    columns: Vec<CellStyle>,
}

impl StyleTemplate {
    /// Captures one style per column up to the sheet's used extent.
    pub fn capture<S: Sheet + ?Sized>(sheet: &S, template_row: u32) -> Self {
        let (_, max_column) = sheet.used_range_extent();
        let columns = (1..=max_column)
            .map(|column| {
                sheet.style(
                    CellRef::new(template_row, column),
                    TEMPLATE_STYLE_PROPERTIES,
                )
            })
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn apply_to_row<S: Sheet + ?Sized>(&self, sheet: &mut S, row: u32) {
        for (column, style) in (1_u32..).zip(&self.columns) {
            sheet.apply_style(CellRef::new(row, column), style);
        }
    }
}

/// Picks the fill override for a coverage ratio, if any.
pub fn threshold_fill<'a>(
    ratio: f64,
    thresholds: &Thresholds,
    style: &'a ReportStyleConfig,
) -> Option<&'a str> {
    if thresholds.is_below_fatal(ratio) {
        Some(style.fatal_color.as_str())
    } else if thresholds.is_below_warning(ratio) {
        Some(style.warning_color.as_str())
    } else {
        None
    }
}

pub fn apply_threshold_fill<S: Sheet + ?Sized>(
    sheet: &mut S,
    at: CellRef,
    ratio: f64,
    thresholds: &Thresholds,
    style: &ReportStyleConfig,
) {
    if let Some(color) = threshold_fill(ratio, thresholds, style) {
        sheet.set_style_property(at, FILL_PROPERTY, Value::String(color.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        FILL_PROPERTY, StyleTemplate, TEMPLATE_STYLE_PROPERTIES, apply_threshold_fill,
        threshold_fill,
    };
    use crate::config::{ReportStyleConfig, Thresholds};
    use crate::document::{CellRef, JsonSheet, Sheet};

    fn report_style() -> ReportStyleConfig {
        ReportStyleConfig {
            warning_color: "ffff00".to_string(),
            fatal_color: "ff0000".to_string(),
            below_mark: "*".to_string(),
        }
    }

    fn template_sheet() -> JsonSheet {
        let mut sheet = JsonSheet::new("Coverage");
        sheet.set_style_property(CellRef::new(3, 1), "bold", json!(true));
        sheet.set_style_property(CellRef::new(3, 2), FILL_PROPERTY, json!("eeeeee"));
        sheet.set_style_property(CellRef::new(3, 3), "numberFormat", json!("0%"));
        sheet
    }

    #[test]
    fn capture_takes_one_style_per_used_column() {
        let sheet = template_sheet();
        let template = StyleTemplate::capture(&sheet, 3);

        assert_eq!(template.len(), 3);

        let mut target = JsonSheet::new("Result");
        template.apply_to_row(&mut target, 7);
        assert_eq!(
            target
                .style(CellRef::new(7, 3), &["numberFormat"])
                .get("numberFormat"),
            Some(&json!("0%"))
        );
        assert_eq!(target.used_range_extent(), (7, 3));
    }

    #[test]
    fn apply_to_row_is_independent_of_row_index() {
        let mut sheet = template_sheet();
        let template = StyleTemplate::capture(&sheet, 3);

        template.apply_to_row(&mut sheet, 4);
        template.apply_to_row(&mut sheet, 9);

        for column in 1..=3 {
            let fourth = sheet.style(CellRef::new(4, column), TEMPLATE_STYLE_PROPERTIES);
            let ninth = sheet.style(CellRef::new(9, column), TEMPLATE_STYLE_PROPERTIES);
            assert_eq!(fourth, ninth, "column {column} should match");
        }
    }

    #[test]
    fn apply_to_row_is_idempotent() {
        let mut sheet = template_sheet();
        let template = StyleTemplate::capture(&sheet, 3);

        template.apply_to_row(&mut sheet, 5);
        let once = sheet.clone();
        template.apply_to_row(&mut sheet, 5);
        assert_eq!(sheet, once);
    }

    #[test]
    fn threshold_fill_uses_strict_less_than() {
        let thresholds = Thresholds::new(0.8, 0.5).expect("valid thresholds");
        let style = report_style();

        assert_eq!(threshold_fill(0.49, &thresholds, &style), Some("ff0000"));
        assert_eq!(threshold_fill(0.5, &thresholds, &style), Some("ffff00"));
        assert_eq!(threshold_fill(0.79, &thresholds, &style), Some("ffff00"));
        assert_eq!(threshold_fill(0.8, &thresholds, &style), None);
    }

    #[test]
    fn threshold_fill_overrides_template_fill() {
        let mut sheet = template_sheet();
        let template = StyleTemplate::capture(&sheet, 3);
        let thresholds = Thresholds::new(0.8, 0.5).expect("valid thresholds");
        let style = report_style();
        let at = CellRef::new(4, 2);

        template.apply_to_row(&mut sheet, 4);
        apply_threshold_fill(&mut sheet, at, 0.3, &thresholds, &style);
        assert_eq!(
            sheet.style(at, &[FILL_PROPERTY]).get(FILL_PROPERTY),
            Some(&json!("ff0000"))
        );

        let passing = CellRef::new(5, 2);
        template.apply_to_row(&mut sheet, 5);
        apply_threshold_fill(&mut sheet, passing, 0.9, &thresholds, &style);
        assert_eq!(
            sheet.style(passing, &[FILL_PROPERTY]).get(FILL_PROPERTY),
            Some(&json!("eeeeee"))
        );
    }
}
