use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("i/o error on document `{document}`: {source}")]
    Io {
        document: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document `{document}`: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("user not found")]
    UserNotFound,

    #[error("game not found")]
    GameNotFound,

    #[error("username is already taken")]
    UsernameTaken,
}

impl DbError {
    pub(crate) fn io(document: &'static str, source: std::io::Error) -> Self {
        DbError::Io { document, source }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
