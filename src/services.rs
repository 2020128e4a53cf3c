//! Request handling for the inventory endpoints
//!
//! Each operation validates its raw inputs, calls into the [`Inventory`]
//! and turns the result into a [`ServiceResponse`]. Database failures are
//! logged with their full context and reported to the client with a generic
//! message.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::csv_codec;
use crate::database::Inventory;
use crate::error::InventoryError;
use crate::models::{Product, QuantityOp};
use crate::upload::{has_allowed_extension, TempUpload};

const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["csv"];

/// Whether a request succeeded, or whose fault it was that it did not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError,
    ServerError,
}

/// Body of a service response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Human readable confirmation or error text
    Message(String),
    /// Exported CSV document
    Csv(String),
    /// Product listing
    Products(Vec<Product>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub outcome: Outcome,
    pub payload: Payload,
}

impl ServiceResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            payload: Payload::Message(message.into()),
        }
    }

    pub fn client_error(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::ClientError,
            payload: Payload::Message(message.into()),
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::ServerError,
            payload: Payload::Message(message.into()),
        }
    }

    fn csv(document: String) -> Self {
        Self {
            outcome: Outcome::Success,
            payload: Payload::Csv(document),
        }
    }

    fn products(products: Vec<Product>) -> Self {
        Self {
            outcome: Outcome::Success,
            payload: Payload::Products(products),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Message text, if the payload is a message
    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Payload::Message(message) => Some(message),
            _ => None,
        }
    }
}

/// A file received from a multipart form
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// An integer that may arrive as a JSON number or as a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    /// The value as a non-negative integer
    fn non_negative(&self, field: &str) -> Result<u64, InventoryError> {
        let value = match self {
            Count::Number(n) => *n,
            Count::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                InventoryError::Validation(format!("{} must be an integer, got '{}'", field, s))
            })?,
        };
        u64::try_from(value)
            .map_err(|_| InventoryError::Validation(format!("{} must be >= 0, got {}", field, value)))
    }
}

impl From<i64> for Count {
    fn from(n: i64) -> Self {
        Count::Number(n)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddProductRequest {
    pub sku: String,
    pub name: String,
    /// Defaults to 0 when absent
    #[serde(default)]
    pub quantity: Option<Count>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeNameRequest {
    pub sku: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuantityRequest {
    pub sku: String,
    pub operation: String,
    pub count: Count,
}

/// Parse the `items` selector: a JSON list of sku strings
///
/// A missing selector is treated as an empty list.
fn parse_items(items: Option<&str>) -> Result<Vec<String>, InventoryError> {
    match items {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
            InventoryError::Validation(format!("`items` is not a JSON list of strings: {}", e))
        }),
    }
}

fn require(value: &str, field: &str) -> Result<(), InventoryError> {
    if value.trim().is_empty() {
        Err(InventoryError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Reject a request the client got wrong
fn rejected(operation: &str, err: &InventoryError, message: impl Into<String>) -> ServiceResponse {
    log::warn!("{} rejected: {}", operation, err);
    ServiceResponse::client_error(message)
}

/// Report a failure on our side; details go to the log only
fn failed(operation: &str, err: &InventoryError, message: impl Into<String>) -> ServiceResponse {
    log::error!("{} failed: {}", operation, err);
    ServiceResponse::server_error(message)
}

/// Request handlers for the inventory endpoints
pub struct InventoryService {
    inventory: Arc<Inventory>,
    upload_dir: PathBuf,
}

impl InventoryService {
    pub fn new(inventory: Arc<Inventory>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            inventory,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Every product as a listing
    pub fn list_products(&self) -> ServiceResponse {
        match self.inventory.fetch_all() {
            Ok(products) => ServiceResponse::products(products),
            Err(e) => failed("list products", &e, "Server could not load the inventory."),
        }
    }

    /// Export the selected products as CSV; an empty selection exports all
    pub fn export_csv(&self, items: Option<&str>) -> ServiceResponse {
        let items = match parse_items(items) {
            Ok(items) => items,
            Err(e) => {
                return rejected(
                    "export",
                    &e,
                    "Parameter error! Must provide a JSON list of SKU strings for `items`.",
                )
            }
        };

        let products = if items.is_empty() {
            self.inventory.fetch_all()
        } else {
            self.inventory.fetch_by_skus(&items)
        };

        match products.and_then(|products| {
            let count = products.len();
            csv_codec::encode_products(&products).map(|csv| (csv, count))
        }) {
            Ok((csv, count)) => {
                log::info!("Exported {} products", count);
                ServiceResponse::csv(csv)
            }
            Err(e) => failed(
                "export",
                &e,
                "Server could not export the CSV file. Please try again.",
            ),
        }
    }

    /// Import products from an uploaded CSV file
    ///
    /// The upload is saved to a temporary file for the duration of the
    /// import and removed on every exit path.
    pub fn import_csv(&self, upload: Option<Upload>) -> ServiceResponse {
        let upload = match upload {
            Some(upload) if upload.filename.as_deref().is_some_and(|f| !f.is_empty()) => upload,
            _ => return ServiceResponse::client_error("No file selected."),
        };
        let filename = upload.filename.as_deref().unwrap_or_default();

        if upload.bytes.is_empty() || !has_allowed_extension(filename, ALLOWED_UPLOAD_EXTENSIONS) {
            let err = InventoryError::Validation(format!(
                "upload '{}' ({} bytes) is not a non-empty CSV file",
                filename,
                upload.bytes.len()
            ));
            return rejected(
                "import",
                &err,
                "Incorrect file extension (must be CSV), or invalid file.",
            );
        }

        let saved = match TempUpload::create(&self.upload_dir, filename, &upload.bytes) {
            Ok(saved) => saved,
            Err(e) => {
                return failed(
                    "import",
                    &InventoryError::Io(e),
                    "Server could not import the CSV file. Please try again.",
                )
            }
        };

        let result = csv_codec::decode_file(saved.path())
            .and_then(|records| self.inventory.bulk_insert(&records));
        drop(saved);

        match result {
            Ok(stats) => ServiceResponse::ok(format!(
                "CSV data successfully imported! ({} added, {} already present)",
                stats.inserted, stats.skipped
            )),
            Err(e) => failed(
                "import",
                &e,
                "Server could not import the CSV file. Please try again.",
            ),
        }
    }

    /// Add a single product
    ///
    /// A duplicate sku is reported as a server-side failure.
    pub fn add_product(&self, request: AddProductRequest) -> ServiceResponse {
        let quantity = match request.quantity.as_ref() {
            None => Ok(0),
            Some(count) => count.non_negative("Quantity"),
        };
        let quantity = match require(&request.sku, "sku").and(quantity) {
            Ok(quantity) => quantity,
            Err(e) => {
                let message = e.to_string();
                return rejected("add product", &e, message);
            }
        };

        match self.inventory.add(&request.sku, &request.name, quantity) {
            Ok(()) => ServiceResponse::ok("Successfully added the product"),
            Err(e @ InventoryError::Conflict { .. }) => {
                log::warn!("add product failed: {}", e);
                ServiceResponse::server_error(format!(
                    "Server could not add the specified product: sku '{}' already exists.",
                    request.sku
                ))
            }
            Err(e) => failed(
                "add product",
                &e,
                "Server could not add the specified product.",
            ),
        }
    }

    /// Delete the products named by a non-empty `items` selector
    pub fn delete_products(&self, items: Option<&str>) -> ServiceResponse {
        let items = parse_items(items).and_then(|items| {
            if items.is_empty() {
                Err(InventoryError::Validation("`items` must not be empty".to_string()))
            } else {
                Ok(items)
            }
        });
        let items = match items {
            Ok(items) => items,
            Err(e) => {
                return rejected(
                    "delete products",
                    &e,
                    "Parameter error! Must provide a non-empty JSON list of SKU strings for `items`.",
                )
            }
        };

        match self.inventory.delete(&items) {
            Ok(removed) => ServiceResponse::ok(format!("Successfully deleted products! ({} removed)", removed)),
            Err(e) => failed(
                "delete products",
                &e,
                "Server could not delete the specified products.",
            ),
        }
    }

    /// Rename a product; an unknown sku is not an error
    pub fn change_name(&self, request: ChangeNameRequest) -> ServiceResponse {
        if let Err(e) = require(&request.sku, "sku").and(require(&request.new_name, "new_name")) {
            let message = e.to_string();
            return rejected("change name", &e, message);
        }

        match self.inventory.rename(&request.sku, &request.new_name) {
            Ok(_) => ServiceResponse::ok("Successfully renamed the product"),
            Err(e) => failed(
                "change name",
                &e,
                "Server could not rename the specified product.",
            ),
        }
    }

    /// Add to, subtract from, or set a product's quantity
    pub fn update_quantity(&self, request: UpdateQuantityRequest) -> ServiceResponse {
        let parsed = require(&request.sku, "sku").and_then(|()| {
            let op = request.operation.parse::<QuantityOp>()?;
            let count = request.count.non_negative("Count")?;
            Ok((op, count))
        });
        let (op, count) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                let message = e.to_string();
                return rejected("update quantity", &e, message);
            }
        };

        match self.inventory.update_quantity(&request.sku, op, count) {
            Ok(_) => ServiceResponse::ok("Successfully updated the product quantity"),
            Err(e) if e.is_validation() => {
                let message = e.to_string();
                rejected("update quantity", &e, message)
            }
            Err(e) => failed(
                "update quantity",
                &e,
                "Server could not update the product quantity.",
            ),
        }
    }
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
