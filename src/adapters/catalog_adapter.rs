//! Catalog files: one listed instrument per row, headered CSV.
//!
//! Exchange exports arrive as UTF-8 (with or without a BOM) or in the Korean
//! legacy code page. EUC-KR decoding covers both cp949 and plain euc-kr.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use encoding_rs::EUC_KR;
use tracing::debug;

use crate::domain::catalog::{CatalogEntry, CatalogLayout};
use crate::domain::error::EngineError;

const UTF8_BOM: &str = "\u{feff}";

pub struct CatalogAdapter;

fn decode(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(Cow::Borrowed(text.strip_prefix(UTF8_BOM).unwrap_or(text)));
    }
    EUC_KR.decode_without_bom_handling_and_without_replacement(bytes)
}

impl CatalogAdapter {
    /// Load every row with a non-blank ticker. Rows shorter than the name
    /// column get an empty name.
    pub fn load(path: &Path, layout: CatalogLayout) -> Result<Vec<CatalogEntry>, EngineError> {
        let file = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| EngineError::ConfigParse {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        let text = decode(&bytes).ok_or_else(|| EngineError::ConfigParse {
            file: file.clone(),
            reason: "catalog is neither UTF-8 nor cp949/euc-kr".into(),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut entries = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| EngineError::ConfigParse {
                file: file.clone(),
                reason: e.to_string(),
            })?;

            let ticker = record.get(layout.ticker_col).unwrap_or("").trim();
            if ticker.is_empty() {
                continue;
            }
            let name = layout
                .name_col
                .and_then(|col| record.get(col))
                .unwrap_or("")
                .trim();

            entries.push(CatalogEntry {
                ticker: ticker.to_string(),
                name: name.to_string(),
            });
        }

        debug!(file = %file, entries = entries.len(), "catalog loaded");
        Ok(entries)
    }
}
