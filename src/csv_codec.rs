//! CSV encoding and decoding for inventory import/export
//!
//! The wire format is plain comma-separated UTF-8 with a header row. Decoding
//! is schema-agnostic: every data row becomes a [`Record`] keyed by the header
//! names. Encoding always writes the fixed column order `sku,name,quantity`.

use std::path::Path;

use crate::error::{InventoryError, Result};
use crate::models::{Product, Record, FIELDS};

/// Parse header-first CSV text into one record per data row
///
/// Field names and values are not validated; a header with no data rows
/// yields an empty vector.
pub fn decode(bytes: &[u8]) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| InventoryError::Format(format!("CSV is not valid UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(InventoryError::Format("CSV has no header row".to_string()));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();
        records.push(record);
    }

    log::debug!(
        "Decoded {} CSV rows with columns {:?}",
        records.len(),
        headers.iter().collect::<Vec<_>>()
    );
    Ok(records)
}

/// Read a CSV file from disk and decode it
pub fn decode_file(path: &Path) -> Result<Vec<Record>> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode records with the standard `sku,name,quantity` header
pub fn encode(rows: &[Record]) -> Result<String> {
    encode_with_fields(rows, &FIELDS)
}

/// Encode records using an explicit column list
///
/// Every record must hold exactly the listed fields.
pub fn encode_with_fields(rows: &[Record], fields: &[&str]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(fields)?;

    for (index, record) in rows.iter().enumerate() {
        if let Some(extra) = record.keys().find(|key| !fields.contains(&key.as_str())) {
            return Err(InventoryError::Format(format!(
                "Row {} has unexpected field '{}'",
                index + 1,
                extra
            )));
        }

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = record.get(*field).ok_or_else(|| {
                InventoryError::Format(format!("Row {} is missing field '{}'", index + 1, field))
            })?;
            values.push(value.as_str());
        }
        writer.write_record(&values)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| InventoryError::Format(format!("Failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| InventoryError::Format(format!("CSV output is not valid UTF-8: {}", e)))
}

/// Reduce products to plain records and encode them
pub fn encode_products(products: &[Product]) -> Result<String> {
    let records: Vec<Record> = products.iter().map(Record::from).collect();
    encode(&records)
}

#[cfg(test)]
#[path = "csv_codec_tests.rs"]
mod tests;
