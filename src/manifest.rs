//! Access to the project's `AppManifest.json` as handed over by the CLI.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Keys under which manifests prior to v3 declared their vehicle model.
const LEGACY_MODEL_KEYS: [&str; 3] = ["vehicleModel", "VehicleModel", "vehicle-model"];

#[derive(Debug, Clone, Deserialize)]
pub struct Interface {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone)]
pub struct AppManifest {
    raw: Value,
    interfaces: Vec<Interface>,
}

impl AppManifest {
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        let interfaces = match raw.get("interfaces") {
            Some(list) => serde_json::from_value(list.clone())?,
            None => Vec::new(),
        };
        Ok(Self { raw, interfaces })
    }

    pub fn manifest_version(&self) -> Option<&str> {
        self.raw.get("manifestVersion").and_then(Value::as_str)
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interfaces_for_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Interface> {
        self.interfaces
            .iter()
            .filter(move |i| i.kind.as_deref() == Some(kind))
    }

    /// `src` of the vehicle model declared with one of the pre-v3 keys.
    pub fn legacy_model_src(&self) -> Result<&str> {
        LEGACY_MODEL_KEYS
            .iter()
            .find_map(|key| self.raw.get(*key))
            .and_then(|model| model.get("src"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Manifest("app manifest does not contain a valid vehicle model".into())
            })
    }
}
