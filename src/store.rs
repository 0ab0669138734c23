//! Storage seam for the feedback sheet.
//!
//! Everything above this module talks to a [`SheetStore`]; the concrete
//! backend is either the local grid below or the hosted sheet in
//! [`crate::remote`].

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::cell::CellValue;
use crate::saving;
use crate::spreadsheet::Spreadsheet;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid cell reference: {0}")]
    BadReference(String),

    #[error("sheet i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "web")]
    #[error("sheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "web")]
    #[error("sheet service credentials rejected: {0}")]
    Auth(#[from] gcp_auth::Error),

    #[error("sheet service answered {status}: {body}")]
    Api { status: u16, body: String },

    #[error("sheet lock poisoned")]
    Poisoned,
}

/// Read/write surface of a spreadsheet, modelled on a hosted worksheet
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Remove every value from the sheet
    async fn clear(&self) -> Result<(), StoreError>;

    /// Overwrite a block of cells whose top-left corner is `anchor` (e.g. `B10`)
    async fn update(&self, anchor: &str, values: Vec<Vec<CellValue>>) -> Result<(), StoreError>;

    /// Apply several block writes as one operation
    ///
    /// Backends that can do this in a single round trip or save override it.
    async fn batch_update(&self, updates: Vec<(&str, Vec<Vec<CellValue>>)>) -> Result<(), StoreError> {
        for (anchor, values) in updates {
            self.update(anchor, values).await?;
        }
        Ok(())
    }

    /// Append one row below the last used row
    async fn append_row(&self, values: Vec<CellValue>) -> Result<(), StoreError>;

    /// All values as text, rows padded to the widest row
    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Values inside an A1 range such as `A4:B4`
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError>;
}

/// Sheet held in process memory, optionally saved to disk after every write
pub struct LocalSheetStore {
    sheet: Mutex<Spreadsheet>,
    path: Option<PathBuf>,
}

impl LocalSheetStore {
    /// A sheet that lives only as long as the process
    pub fn in_memory() -> Self {
        LocalSheetStore {
            sheet: Mutex::new(Spreadsheet::new()),
            path: None,
        }
    }

    /// Load the sheet saved at `path`, or start blank when the file is missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sheet = if path.exists() {
            debug!("loading sheet from {}", path.display());
            saving::load_spreadsheet(&path)?
        } else {
            Spreadsheet::new()
        };

        Ok(LocalSheetStore {
            sheet: Mutex::new(sheet),
            path: Some(path),
        })
    }

    /// Run `f` against the locked sheet, then save it when a path is set
    fn write<T>(&self, f: impl FnOnce(&mut Spreadsheet) -> T) -> Result<T, StoreError> {
        let mut sheet = self.sheet.lock().map_err(|_| StoreError::Poisoned)?;
        let out = f(&mut *sheet);
        if let Some(path) = &self.path {
            saving::save_spreadsheet(&sheet, path)?;
        }
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&Spreadsheet) -> T) -> Result<T, StoreError> {
        let sheet = self.sheet.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&*sheet))
    }
}

#[async_trait]
impl SheetStore for LocalSheetStore {
    async fn clear(&self) -> Result<(), StoreError> {
        self.write(|sheet| sheet.clear())
    }

    async fn update(&self, anchor: &str, values: Vec<Vec<CellValue>>) -> Result<(), StoreError> {
        let at = Spreadsheet::parse_cell_name(anchor)
            .ok_or_else(|| StoreError::BadReference(anchor.to_string()))?;
        self.write(|sheet| sheet.update(at, &values))
    }

    /// Every anchor is checked before anything is written, and the sheet is
    /// saved once for the whole batch
    async fn batch_update(&self, updates: Vec<(&str, Vec<Vec<CellValue>>)>) -> Result<(), StoreError> {
        let mut resolved = Vec::with_capacity(updates.len());
        for (anchor, values) in updates {
            let at = Spreadsheet::parse_cell_name(anchor)
                .ok_or_else(|| StoreError::BadReference(anchor.to_string()))?;
            resolved.push((at, values));
        }
        self.write(|sheet| {
            for (at, values) in &resolved {
                sheet.update(*at, values);
            }
        })
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<(), StoreError> {
        let row = self.write(|sheet| sheet.append_row(&[values]))?;
        debug!("appended row {}", row);
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.read(Spreadsheet::get_all_values)
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let (start, end) = Spreadsheet::parse_range(range)
            .ok_or_else(|| StoreError::BadReference(range.to_string()))?;
        self.read(|sheet| sheet.get_range(start, end))
    }
}
