//! JSON fixtures for the in-memory directory (dev server, demos, tests).

use std::path::Path;

use serde::{Deserialize, Serialize};

use clinicbill_billing::{BillableEvent, Patient, PrintLayout, Provider, Tenant};

use super::DirectoryError;

/// Directory contents as loaded from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub print_layouts: Vec<PrintLayout>,
    #[serde(default)]
    pub events: Vec<BillableEvent>,
}

impl DirectorySeed {
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        serde_json::from_str(json).map_err(|e| DirectoryError::Corrupt(format!("seed: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DirectoryError::Unavailable(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}
