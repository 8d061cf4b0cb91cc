mod xlsx;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::util::write_json_pretty;

pub use xlsx::XlsxWorkbook;

/// 1-based (row, column) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Number(value as f64), Self::Integer)
    }
}

/// Opaque bag of named style properties.
///
/// A `Null` entry means "property unset" and clears it when applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellStyle(BTreeMap<String, Value>);

impl CellStyle {
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(property).filter(|value| !value.is_null())
    }

    pub fn set(&mut self, property: impl Into<String>, value: Value) {
        self.0.insert(property.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every entry, unset (`Null`) ones included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn merge_from(&mut self, other: &CellStyle) {
        for (name, value) in &other.0 {
            if value.is_null() {
                self.0.remove(name);
            } else {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }
}

/// Cell-addressable grid that the report renderer writes into.
pub trait Sheet {
    /// Largest (row, column) holding a value or style; `(0, 0)` when empty.
    fn used_range_extent(&self) -> (u32, u32);

    fn set_value(&mut self, at: CellRef, value: CellValue);

    fn clear_value(&mut self, at: CellRef);

    /// Snapshot of the named properties; missing ones are captured as unset.
    fn style(&self, at: CellRef, properties: &[&str]) -> CellStyle;

    fn apply_style(&mut self, at: CellRef, style: &CellStyle);

    fn set_style_property(&mut self, at: CellRef, property: &str, value: Value);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
    #[serde(default, skip_serializing_if = "CellStyle::is_empty")]
    pub style: CellStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCell {
    row: u32,
    column: u32,
    #[serde(flatten)]
    cell: Cell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSheet {
    name: String,
    #[serde(default)]
    cells: Vec<StoredCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSheet", into = "StoredSheet")]
pub struct JsonSheet {
    pub name: String,
    cells: BTreeMap<CellRef, Cell>,
}

impl JsonSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn value(&self, at: CellRef) -> Option<&CellValue> {
        self.cells.get(&at).and_then(|cell| cell.value.as_ref())
    }

    fn cell_mut(&mut self, at: CellRef) -> &mut Cell {
        self.cells.entry(at).or_default()
    }
}

impl From<StoredSheet> for JsonSheet {
    fn from(stored: StoredSheet) -> Self {
        let cells = stored
            .cells
            .into_iter()
            .map(|stored_cell| {
                (
                    CellRef::new(stored_cell.row, stored_cell.column),
                    stored_cell.cell,
                )
            })
            .collect();
        Self {
            name: stored.name,
            cells,
        }
    }
}

impl From<JsonSheet> for StoredSheet {
    fn from(sheet: JsonSheet) -> Self {
        let cells = sheet
            .cells
            .into_iter()
            .map(|(at, cell)| StoredCell {
                row: at.row,
                column: at.column,
                cell,
            })
            .collect();
        Self {
            name: sheet.name,
            cells,
        }
    }
}

impl Sheet for JsonSheet {
    fn used_range_extent(&self) -> (u32, u32) {
        self.cells
            .keys()
            .fold((0, 0), |(max_row, max_column), at| {
                (max_row.max(at.row), max_column.max(at.column))
            })
    }

    fn set_value(&mut self, at: CellRef, value: CellValue) {
        self.cell_mut(at).value = Some(value);
    }

    fn clear_value(&mut self, at: CellRef) {
        if let Some(cell) = self.cells.get_mut(&at) {
            cell.value = None;
        }
    }

    fn style(&self, at: CellRef, properties: &[&str]) -> CellStyle {
        let source = self.cells.get(&at).map(|cell| &cell.style);
        let mut captured = CellStyle::default();
        for property in properties {
            let value = source
                .and_then(|style| style.get(property))
                .cloned()
                .unwrap_or(Value::Null);
            captured.set(*property, value);
        }
        captured
    }

    fn apply_style(&mut self, at: CellRef, style: &CellStyle) {
        self.cell_mut(at).style.merge_from(style);
    }

    fn set_style_property(&mut self, at: CellRef, property: &str, value: Value) {
        let mut single = CellStyle::default();
        single.set(property, value);
        self.cell_mut(at).style.merge_from(&single);
    }
}

/// Workbook persisted as pretty-printed JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonWorkbook {
    pub sheets: Vec<JsonSheet>,
}

impl JsonWorkbook {
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        let raw = fs::read(path).map_err(|err| rendering_error(path, err.to_string()))?;
        serde_json::from_slice(&raw).map_err(|err| rendering_error(path, err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ToolError> {
        write_json_pretty(path, self).map_err(|err| rendering_error(path, format!("{err:#}")))
    }

    pub fn first_sheet_mut(&mut self) -> Option<&mut JsonSheet> {
        self.sheets.first_mut()
    }
}

/// Report document; the template's extension picks the format (`.json` or xlsx).
pub enum Workbook {
    Xlsx(XlsxWorkbook),
    Json(JsonWorkbook),
}

impl Workbook {
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json {
            JsonWorkbook::load(path).map(Self::Json)
        } else {
            XlsxWorkbook::load(path).map(Self::Xlsx)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ToolError> {
        match self {
            Self::Xlsx(workbook) => workbook.save(path),
            Self::Json(workbook) => workbook.save(path),
        }
    }

    pub fn first_sheet_mut(&mut self) -> Option<&mut dyn Sheet> {
        match self {
            Self::Xlsx(workbook) => workbook
                .first_sheet_mut()
                .map(|sheet| sheet as &mut dyn Sheet),
            Self::Json(workbook) => workbook
                .first_sheet_mut()
                .map(|sheet| sheet as &mut dyn Sheet),
        }
    }
}

fn rendering_error(path: &Path, reason: String) -> ToolError {
    ToolError::Rendering {
        path: path.to_path_buf(),
        reason,
    }
}
