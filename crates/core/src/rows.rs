//! Raw row shapes, one per feed.
//!
//! The single-star feed arrives as flat string arrays (the Sheets `values`
//! endpoint with formulas rendered). The RTA feed arrives as nested cells
//! carrying hyperlink and bold attributes (the Sheets `spreadsheets.get`
//! endpoint with a field mask). Both Sheets response shapes deserialize
//! directly into the types here so fixtures can be captured verbatim.

use serde::{Deserialize, Serialize};

/// Rows as fetched from a feed.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRows {
    Flat(Vec<Vec<String>>),
    Structured(Vec<SheetRow>),
}

impl RawRows {
    pub fn len(&self) -> usize {
        match self {
            RawRows::Flat(rows) => rows.len(),
            RawRows::Structured(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row of the structured feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    pub cells: Vec<SheetCell>,
}

impl SheetRow {
    pub fn cell(&self, idx: usize) -> Option<&SheetCell> {
        self.cells.get(idx)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetCell {
    pub text: Option<String>,
    pub hyperlink: Option<String>,
    pub bold: bool,
}

impl SheetCell {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Google Sheets wire shapes
// ---------------------------------------------------------------------------

/// Response of `GET /spreadsheets/{id}/values/{range}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    pub fn into_rows(self) -> RawRows {
        let rows = self
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_to_string).collect())
            .collect();
        RawRows::Flat(rows)
    }
}

/// Response of `GET /spreadsheets/{id}?fields=sheets/data/rowData/values(...)`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<SheetData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SheetData {
    #[serde(default)]
    pub data: Vec<GridData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    #[serde(default)]
    pub row_data: Vec<RowData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RowData {
    #[serde(default)]
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_value: Option<ExtendedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<CellFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<TextFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextFormat {
    #[serde(default)]
    pub bold: bool,
}

impl Spreadsheet {
    /// Rows of the first grid of the first sheet (the only one requested).
    pub fn into_rows(self) -> RawRows {
        let rows = self
            .sheets
            .into_iter()
            .next()
            .and_then(|sheet| sheet.data.into_iter().next())
            .map(|grid| grid.row_data.into_iter().map(SheetRow::from).collect())
            .unwrap_or_default();
        RawRows::Structured(rows)
    }
}

impl From<RowData> for SheetRow {
    fn from(row: RowData) -> Self {
        SheetRow { cells: row.values.into_iter().map(SheetCell::from).collect() }
    }
}

impl From<CellData> for SheetCell {
    fn from(cell: CellData) -> Self {
        let text = cell.effective_value.and_then(|v| {
            v.string_value.or_else(|| v.number_value.map(|n| n.to_string()))
        });
        let bold = cell
            .user_entered_format
            .and_then(|f| f.text_format)
            .map(|t| t.bold)
            .unwrap_or(false);
        SheetCell { text, hyperlink: cell.hyperlink, bold }
    }
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
