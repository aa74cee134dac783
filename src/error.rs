use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("alignment must be a power of two, got {0}")]
    InvalidAlignment(u64),

    #[error("structure `{structure}` declares field `{field}` more than once")]
    DuplicateField { structure: String, field: String },

    #[error("field `{field}` of structure `{structure}` has no storage")]
    ZeroSizedField { structure: String, field: String },

    #[error("field `{field}` of structure `{structure}` has unsupported width {width}")]
    UnsupportedWidth {
        structure: String,
        field: String,
        width: u32,
    },

    #[error("structure `{structure}` outgrows 4 GiB at field `{field}`")]
    TooLarge { structure: String, field: String },

    #[error("no structure named `{0}` in the catalog")]
    UnknownStructure(String),

    #[error("failed to format the report")]
    Format(#[from] fmt::Error),

    #[error("failed to serialize layouts")]
    Serialize(#[from] ron::Error),
}
