use crate::classifier::RowRole;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixModelError {
    #[error("Missing required columns in {table}: {}", .missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },

    #[error("No period columns found (expected p0, p1, ..., pN)")]
    NoPeriodColumns,

    #[error("Project {project_id}: missing {role} row")]
    MissingRequiredRow { project_id: String, role: RowRole },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatrixModelError>;
