use crate::config::OpenApiVersion;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A set of generated components, keyed by registry id
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub spec_version: OpenApiVersion,
    pub components: BTreeMap<String, Value>,
}

impl SchemaDocument {
    /// `{"openapi": ..., "components": {"schemas": ...}}`
    pub fn to_json(&self) -> Value {
        json!({
            "openapi": self.spec_version.document_version(),
            "components": { "schemas": self.components },
        })
    }

    pub fn component(&self, id: &str) -> Option<&Value> {
        self.components.get(id)
    }

    /// SHA-256 of the canonical JSON rendering, as lowercase hex.
    ///
    /// Equal fingerprints mean byte-identical documents, which is how
    /// determinism is checked across runs.
    pub fn fingerprint(&self) -> String {
        let canonical = self.to_json().to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}
