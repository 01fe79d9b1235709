use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the client keeps its access/refresh tokens. Tagged by "type" in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, Default)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Tokens live only for the lifetime of the process.
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// Tokens are persisted as JSON in a single file.
    #[serde(rename = "file")]
    File(FileStoreConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStoreConfig {
    pub path: String,
}
