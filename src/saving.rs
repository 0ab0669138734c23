use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

use crate::spreadsheet::Spreadsheet;

/// Save a sheet to disk
///
/// The sheet is bincode-encoded and gzip-compressed. Missing parent
/// directories are created.
///
/// # Arguments
/// * `spreadsheet` - The sheet to save
/// * `filename` - Target file path
///
/// # Returns
/// * `std::io::Result<()>` - Success or an IO error
pub fn save_spreadsheet(spreadsheet: &Spreadsheet, filename: &Path) -> std::io::Result<()> {
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serialize_into(&mut writer, spreadsheet)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    // Flush explicitly so a failed gzip trailer is reported instead of dropped
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?.flush()?;

    Ok(())
}

/// Load a sheet saved by [`save_spreadsheet`]
///
/// # Arguments
/// * `filename` - Path of the saved file
///
/// # Returns
/// * `std::io::Result<Spreadsheet>` - The sheet, or an IO error
///
/// # Errors
/// * Returns `InvalidData` if the file is not a saved sheet
pub fn load_spreadsheet(filename: &Path) -> std::io::Result<Spreadsheet> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let spreadsheet: Spreadsheet = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(spreadsheet)
}
