use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn record(sku: &str, name: &str, quantity: &str) -> Record {
    let mut record = Record::new();
    record.insert("sku".to_string(), sku.to_string());
    record.insert("name".to_string(), name.to_string());
    record.insert("quantity".to_string(), quantity.to_string());
    record
}

// ==================== decode ====================

#[test]
fn decode_maps_rows_by_header() {
    let csv = "sku,name,quantity\nA1,Hammer,5\nB2,Nails,100\n";

    let records = decode(csv.as_bytes()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0], record("A1", "Hammer", "5"));
    assert_eq!(records[1], record("B2", "Nails", "100"));
}

#[test]
fn decode_keeps_unknown_columns() {
    let csv = "sku,colour\nA1,red\n";

    let records = decode(csv.as_bytes()).unwrap();

    assert_eq!(records[0]["colour"], "red");
    assert!(!records[0].contains_key("name"));
}

#[test]
fn decode_header_only_yields_no_rows() {
    let records = decode(b"sku,name,quantity\n").unwrap();
    assert!(records.is_empty());
}

#[test]
fn decode_empty_input_fails() {
    let err = decode(b"").unwrap_err();
    assert!(matches!(err, InventoryError::Format(_)));
}

#[test]
fn decode_rejects_invalid_utf8() {
    let err = decode(&[0x73, 0x6b, 0x75, 0xff, 0xfe]).unwrap_err();
    assert!(matches!(err, InventoryError::Format(_)));
}

#[test]
fn decode_rejects_ragged_rows() {
    let csv = "sku,name,quantity\nA1,Hammer\n";

    let err = decode(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, InventoryError::Format(_)));
}

#[test]
fn decode_handles_quoted_fields() {
    let csv = "sku,name,quantity\nA1,\"Bolts, M6 \"\"hex\"\"\",12\n";

    let records = decode(csv.as_bytes()).unwrap();

    assert_eq!(records[0]["name"], "Bolts, M6 \"hex\"");
}

#[test]
fn decode_file_reads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "sku,name,quantity\nA1,Hammer,5\n").unwrap();

    let records = decode_file(file.path()).unwrap();

    assert_eq!(records, vec![record("A1", "Hammer", "5")]);
}

#[test]
fn decode_file_missing_is_io_error() {
    let err = decode_file(Path::new("/definitely/not/here.csv")).unwrap_err();
    assert!(matches!(err, InventoryError::Io(_)));
}

// ==================== encode ====================

#[test]
fn encode_writes_fixed_header_order() {
    let csv = encode(&[record("S1", "Widget", "10")]).unwrap();

    assert_eq!(csv, "sku,name,quantity\nS1,Widget,10\n");
}

#[test]
fn encode_empty_rows_writes_header_only() {
    assert_eq!(encode(&[]).unwrap(), "sku,name,quantity\n");
}

#[test]
fn encode_rejects_missing_field() {
    let mut incomplete = record("S1", "Widget", "10");
    incomplete.remove("quantity");

    let err = encode(&[incomplete]).unwrap_err();
    assert!(err.to_string().contains("quantity"));
}

#[test]
fn encode_rejects_unexpected_field() {
    let mut extra = record("S1", "Widget", "10");
    extra.insert("price".to_string(), "9.99".to_string());

    let err = encode(&[extra]).unwrap_err();
    assert!(err.to_string().contains("price"));
}

#[test]
fn encode_with_fields_uses_given_order() {
    let csv = encode_with_fields(&[record("S1", "Widget", "10")], &["quantity", "sku", "name"])
        .unwrap();

    assert_eq!(csv, "quantity,sku,name\n10,S1,Widget\n");
}

#[test]
fn encode_products_renders_quantity_as_integer() {
    let csv = encode_products(&[
        Product::new("S1", "Widget", 10),
        Product::new("S2", "Gadget, large", 0),
    ])
    .unwrap();

    assert_eq!(csv, "sku,name,quantity\nS1,Widget,10\nS2,\"Gadget, large\",0\n");
}

// ==================== round trip ====================

#[test]
fn decode_inverts_encode() {
    let rows = vec![
        record("A1", "Hammer", "5"),
        record("B2", "Quote \"me\"", "0"),
        record("C3", "Multi\nline", "42"),
        record("D4", "", "7"),
    ];

    let decoded = decode(encode(&rows).unwrap().as_bytes()).unwrap();

    assert_eq!(decoded, rows);
}
