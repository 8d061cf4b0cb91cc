use std::path::Path;

use anyhow::anyhow;
use serde_json::Value;
use umya_spreadsheet::{Border, Fill, Spreadsheet, Style, Worksheet, reader, writer};

use super::{CellRef, CellStyle, CellValue, Sheet, rendering_error};
use crate::error::ToolError;
use crate::style::FILL_PROPERTY;
use crate::util::write_atomically;

const NO_BORDER: &str = "none";
const NO_UNDERLINE: &str = "none";
const DEFAULT_BORDER: &str = "thin";
const GENERAL_FORMAT: &str = "General";
const DEFAULT_FONT_COLOR: &str = "FF000000";

#[derive(Debug, Clone, Copy)]
enum BorderSide {
    Left,
    Right,
    Top,
    Bottom,
}

const BORDER_SIDES: [BorderSide; 4] = [
    BorderSide::Left,
    BorderSide::Right,
    BorderSide::Top,
    BorderSide::Bottom,
];

/// Spreadsheet loaded from an .xlsx template and written back as .xlsx.
pub struct XlsxWorkbook {
    book: Spreadsheet,
}

impl XlsxWorkbook {
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        reader::xlsx::read(path)
            .map(|book| Self { book })
            .map_err(|err| rendering_error(path, err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ToolError> {
        write_atomically(path, |partial| {
            writer::xlsx::write(&self.book, partial)
                .map_err(|err| anyhow!("failed to write xlsx: {err}"))
        })
        .map_err(|err| rendering_error(path, format!("{err:#}")))
    }

    pub fn first_sheet_mut(&mut self) -> Option<&mut Worksheet> {
        self.book.get_sheet_mut(&0)
    }
}

impl From<Spreadsheet> for XlsxWorkbook {
    fn from(book: Spreadsheet) -> Self {
        Self { book }
    }
}

/// `ffff00` and `#ffff00` become opaque ARGB `FFFFFF00`.
pub fn to_argb(color: &str) -> String {
    let hex = color.trim().trim_start_matches('#').to_ascii_uppercase();
    if hex.len() == 6 {
        format!("FF{hex}")
    } else {
        hex
    }
}

fn coordinates(at: CellRef) -> (u32, u32) {
    (at.column, at.row)
}

fn non_empty(text: &str) -> Option<Value> {
    (!text.is_empty()).then(|| Value::from(text))
}

fn flag(value: bool) -> Option<Value> {
    value.then_some(Value::Bool(true))
}

fn border(style: &Style, side: BorderSide) -> Option<&Border> {
    let borders = style.get_borders()?;
    Some(match side {
        BorderSide::Left => borders.get_left(),
        BorderSide::Right => borders.get_right(),
        BorderSide::Top => borders.get_top(),
        BorderSide::Bottom => borders.get_bottom(),
    })
}

fn border_mut(style: &mut Style, side: BorderSide) -> &mut Border {
    let borders = style.get_borders_mut();
    match side {
        BorderSide::Left => borders.get_left_mut(),
        BorderSide::Right => borders.get_right_mut(),
        BorderSide::Top => borders.get_top_mut(),
        BorderSide::Bottom => borders.get_bottom_mut(),
    }
}

fn first_drawn_border(style: &Style) -> Option<&Border> {
    BORDER_SIDES
        .into_iter()
        .filter_map(|side| border(style, side))
        .find(|border| border.get_border_style() != NO_BORDER)
}

/// Reads one named property; `None` when the cell does not set it.
///
/// Properties without an xlsx mapping here always read as unset.
fn read_property(style: &Style, property: &str) -> Option<Value> {
    let font = style.get_font();
    match property {
        "bold" => flag(*font?.get_bold()),
        "italic" => flag(*font?.get_italic()),
        "strikethrough" => flag(*font?.get_strikethrough()),
        "underline" => {
            let underline = font?.get_underline();
            (underline != NO_UNDERLINE).then(|| non_empty(underline)).flatten()
        }
        "fontSize" => Some(Value::from(*font?.get_size())),
        "fontFamily" => non_empty(font?.get_name()),
        "fontColor" => non_empty(font?.get_color().get_argb()),
        "wrapText" => flag(*style.get_alignment()?.get_wrap_text()),
        FILL_PROPERTY => non_empty(style.get_background_color()?.get_argb()),
        "border" => first_drawn_border(style).map(|_| Value::Bool(true)),
        "borderStyle" => {
            first_drawn_border(style).and_then(|border| non_empty(border.get_border_style()))
        }
        "borderColor" => {
            first_drawn_border(style).and_then(|border| non_empty(border.get_color().get_argb()))
        }
        "numberFormat" => {
            let code = style.get_number_format()?.get_format_code();
            (code != GENERAL_FORMAT).then(|| non_empty(code)).flatten()
        }
        _ => None,
    }
}

/// Writes one named property; `Null` resets it to the workbook default.
fn write_property(style: &mut Style, property: &str, value: &Value) {
    if value.is_null() && read_property(style, property).is_none() {
        return;
    }

    match property {
        "bold" => {
            style.get_font_mut().set_bold(value.as_bool().unwrap_or(false));
        }
        "italic" => {
            style.get_font_mut().set_italic(value.as_bool().unwrap_or(false));
        }
        "strikethrough" => {
            style
                .get_font_mut()
                .set_strikethrough(value.as_bool().unwrap_or(false));
        }
        "underline" => {
            style
                .get_font_mut()
                .set_underline(value.as_str().unwrap_or(NO_UNDERLINE));
        }
        "fontSize" => {
            if let Some(size) = value.as_f64() {
                style.get_font_mut().set_size(size);
            }
        }
        "fontFamily" => {
            if let Some(name) = value.as_str() {
                style.get_font_mut().set_name(name);
            }
        }
        "fontColor" => {
            let argb = value.as_str().map_or_else(|| DEFAULT_FONT_COLOR.to_string(), to_argb);
            style.get_font_mut().get_color_mut().set_argb(argb);
        }
        "wrapText" => {
            style
                .get_alignment_mut()
                .set_wrap_text(value.as_bool().unwrap_or(false));
        }
        FILL_PROPERTY => match value.as_str() {
            Some(color) => {
                style.set_background_color(to_argb(color));
            }
            None => {
                style.set_fill(Fill::default());
            }
        },
        "border" => {
            let drawn = value.as_bool().unwrap_or(false);
            for side in BORDER_SIDES {
                let border = border_mut(style, side);
                if !drawn {
                    border.set_border_style(NO_BORDER);
                } else if border.get_border_style() == NO_BORDER {
                    border.set_border_style(DEFAULT_BORDER);
                }
            }
        }
        "borderStyle" => {
            let line = value.as_str().unwrap_or(NO_BORDER);
            for side in BORDER_SIDES {
                border_mut(style, side).set_border_style(line);
            }
        }
        "borderColor" => {
            if let Some(color) = value.as_str() {
                let argb = to_argb(color);
                for side in BORDER_SIDES {
                    border_mut(style, side).get_color_mut().set_argb(argb.clone());
                }
            }
        }
        "numberFormat" => {
            style
                .get_number_format_mut()
                .set_format_code(value.as_str().unwrap_or(GENERAL_FORMAT));
        }
        _ => {}
    }
}

impl Sheet for Worksheet {
    fn used_range_extent(&self) -> (u32, u32) {
        let (column, row) = self.get_highest_column_and_row();
        (row, column)
    }

    fn set_value(&mut self, at: CellRef, value: CellValue) {
        let cell = self.get_cell_mut(coordinates(at));
        match value {
            CellValue::Integer(number) => {
                cell.set_value_number(number as f64);
            }
            CellValue::Number(number) => {
                cell.set_value_number(number);
            }
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
        }
    }

    fn clear_value(&mut self, at: CellRef) {
        if self.get_cell(coordinates(at)).is_some() {
            self.get_cell_mut(coordinates(at)).set_value("");
        }
    }

    fn style(&self, at: CellRef, properties: &[&str]) -> CellStyle {
        let source = self.get_cell(coordinates(at)).map(|cell| cell.get_style());
        let mut captured = CellStyle::default();
        for property in properties {
            let value = source
                .and_then(|style| read_property(style, property))
                .unwrap_or(Value::Null);
            captured.set(*property, value);
        }
        captured
    }

    fn apply_style(&mut self, at: CellRef, style: &CellStyle) {
        let target = self.get_cell_mut(coordinates(at)).get_style_mut();
        for (property, value) in style.entries() {
            write_property(target, property, value);
        }
    }

    fn set_style_property(&mut self, at: CellRef, property: &str, value: Value) {
        let target = self.get_cell_mut(coordinates(at)).get_style_mut();
        write_property(target, property, &value);
    }
}
