use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyzygyError {
    #[error("Database error: {0}")]
    #[diagnostic(code(syzygy::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Failed to load app details for client id {client_id}")]
    #[diagnostic(code(syzygy::client_lookup))]
    ClientLookup { client_id: String },

    #[error("{0}")]
    #[diagnostic(code(syzygy::other))]
    Other(String),
}
