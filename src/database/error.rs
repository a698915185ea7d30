use std::fmt::{self, Display};

use potion::Error;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Validation(String),
    SelfFollow,
    AlreadyExists(String),
    NotFound(String),
    Unauthenticated,
    Forbidden(String),
    Query(String),
}

impl ApiError {
    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn already_exists(info: &str) -> Self {
        Self::AlreadyExists(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn forbidden(info: &str) -> Self {
        Self::Forbidden(info.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::SelfFollow | ApiError::AlreadyExists(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(info)
            | ApiError::AlreadyExists(info)
            | ApiError::NotFound(info)
            | ApiError::Forbidden(info) => write!(f, "{info}"),
            ApiError::SelfFollow => write!(f, "You cannot subscribe to yourself"),
            ApiError::Unauthenticated => write!(f, "Authentication credentials were not provided"),
            // Storage details stay in the log.
            ApiError::Query(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        let info = match value {
            sqlx::Error::Configuration(e) => format!("{e}"),
            sqlx::Error::Database(e) => format!("{e}"),
            sqlx::Error::Io(e) => format!("{e}"),
            sqlx::Error::Tls(e) => format!("{e}"),
            sqlx::Error::Protocol(e) => e,
            sqlx::Error::RowNotFound => String::from("RowNotFound"),
            sqlx::Error::TypeNotFound { type_name } => format!("Type not found: {type_name}"),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                format!("Column index out of bounds {index} ({len})")
            }
            sqlx::Error::ColumnNotFound(e) => e,
            sqlx::Error::ColumnDecode { index, source } => {
                format!("Column decode {index} ({source})")
            }
            sqlx::Error::Decode(e) => format!("{e}"),
            sqlx::Error::PoolTimedOut => String::from("Pool timed out"),
            sqlx::Error::PoolClosed => String::from("Pool closed"),
            sqlx::Error::WorkerCrashed => String::from("Worker crashed"),
            sqlx::Error::Migrate(e) => format!("{e}"),
            _ => String::from("Unknown error"),
        };

        log::error!("Query failed: {info}");
        Self::Query(info)
    }
}

/// Maps constraint violations of a single statement onto domain errors,
/// leaving every other failure as a query error.
pub fn constraint_error(value: sqlx::Error, on_unique: ApiError, on_foreign_key: ApiError) -> ApiError {
    match &value {
        sqlx::Error::Database(e) if e.is_unique_violation() => on_unique,
        sqlx::Error::Database(e) if e.is_foreign_key_violation() => on_foreign_key,
        _ => ApiError::from(value),
    }
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        let info = Some(value.to_string());
        match value {
            ApiError::Validation(_) | ApiError::SelfFollow | ApiError::AlreadyExists(_) => Error {
                code: 400,
                info,
                redirect: None,
            },
            ApiError::Unauthenticated => Error {
                code: 401,
                info,
                redirect: None,
            },
            ApiError::Forbidden(_) => Error {
                code: 403,
                info,
                redirect: None,
            },
            ApiError::NotFound(_) => Error {
                code: 404,
                info,
                redirect: None,
            },
            ApiError::Query(_) => Error {
                code: 500,
                info,
                redirect: None,
            },
        }
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration ({})", self.info)
    }
}

impl std::error::Error for ConfigError {}
