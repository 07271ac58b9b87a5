/// Errors that can occur during catalog operations.
///
/// Everything here is a malformed-input rejection at the key-derivation
/// boundary. Structural no-ops (removing a missing key, querying an empty
/// catalog) return `bool`/empty results instead, and precondition
/// violations (mutating during an in-flight rebucket, double-removing a
/// record) are documented caller errors the engine does not defend against.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("record '{record}' has no owning machine name, cannot derive a machine key")]
    MissingMachine { record: String },

    #[error("record '{record}' has no hash or size material to key under scheme {scheme}")]
    Unkeyable { record: String, scheme: &'static str },
}

impl CatalogError {
    pub fn missing_machine(record: impl Into<String>) -> Self {
        Self::MissingMachine {
            record: record.into(),
        }
    }

    pub fn unkeyable(record: impl Into<String>, scheme: &'static str) -> Self {
        Self::Unkeyable {
            record: record.into(),
            scheme,
        }
    }
}
