use std::{fmt, io};

/// Crate-wide `Result` type using [`DocferryError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DocferryError>;

/// Top-level error type for docferry operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum DocferryError {
    /// Store connection errors. Always fatal for the surrounding run or
    /// task attempt.
    Connection(ConnectionError),

    /// Index/view query and pagination errors. Contained to the current
    /// key filter by the export orchestrator.
    Query(QueryError),

    /// Store-side write operation errors. Contained to the current key by
    /// the bulk write scheduler.
    StoreWrite(StoreWriteError),

    /// Page file errors on the export destination.
    PageFile(PageFileError),

    /// Record encoding/decoding errors.
    Codec(CodecError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection to the store cluster.
    ConnectionFailed(String),

    /// Invalid store node URL.
    InvalidUri(String),

    /// Connection timeout.
    Timeout,

    /// Not currently connected to the store.
    NotConnected,
}

/// Index traversal errors.
#[derive(Debug)]
pub enum QueryError {
    /// The named index/view does not exist.
    ViewNotFound(String),

    /// The store aborted a page fetch (network error, timeout).
    Pagination(String),

    /// `next` was called on a cursor after `has_next` returned false.
    ExhaustedCursor,
}

/// Store-side write operation errors.
#[derive(Debug)]
pub enum StoreWriteError {
    /// An `Add` hit an already existing key.
    DuplicateKey(String),

    /// A strict `Delete` targeted a missing key.
    MissingKey(String),

    /// The store rejected or failed the operation.
    Failed { key: String, reason: String },
}

/// Export destination file errors.
#[derive(Debug)]
pub enum PageFileError {
    /// The destination file exists and overwrite was not requested.
    AlreadyExists(String),

    /// The destination file could not be created. Treated as fatal by the
    /// orchestrator: if the destination cannot even be opened, the
    /// filesystem is considered unreachable.
    Create { path: String, reason: String },

    /// A write to an open page file failed. Contained to the current page.
    Write { path: String, reason: String },
}

/// Record format errors.
#[derive(Debug)]
pub enum CodecError {
    /// A key contains the field or row delimiter.
    DelimiterInKey(String),

    /// A document payload contains the row delimiter.
    DelimiterInDocument(String),

    /// A record has an empty key.
    EmptyKey,

    /// A `Set`/`Add` record carries no document payload.
    MissingDocument(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DocferryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocferryError::Connection(e) => write!(f, "Connection error: {e}"),
            DocferryError::Query(e) => write!(f, "Query error: {e}"),
            DocferryError::StoreWrite(e) => write!(f, "Store write error: {e}"),
            DocferryError::PageFile(e) => write!(f, "Page file error: {e}"),
            DocferryError::Codec(e) => write!(f, "Record format error: {e}"),
            DocferryError::Config(e) => write!(f, "Configuration error: {e}"),
            DocferryError::Io(e) => write!(f, "I/O error: {e}"),
            DocferryError::MongoDb(e) => write!(f, "Store driver error: {e}"),
            DocferryError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid store node URL: {uri}"),
            ConnectionError::Timeout => write!(f, "Connection timeout"),
            ConnectionError::NotConnected => write!(f, "Not connected to the store"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::ViewNotFound(name) => write!(f, "Index/view not found: {name}"),
            QueryError::Pagination(msg) => write!(f, "Page fetch aborted: {msg}"),
            QueryError::ExhaustedCursor => write!(f, "Cursor is exhausted"),
        }
    }
}

impl fmt::Display for StoreWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreWriteError::DuplicateKey(key) => write!(f, "Key already exists: {key}"),
            StoreWriteError::MissingKey(key) => write!(f, "Key not found: {key}"),
            StoreWriteError::Failed { key, reason } => {
                write!(f, "Operation failed for key '{key}': {reason}")
            }
        }
    }
}

impl fmt::Display for PageFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFileError::AlreadyExists(path) => write!(f, "File already exists: {path}"),
            PageFileError::Create { path, reason } => {
                write!(f, "Failed to create '{path}': {reason}")
            }
            PageFileError::Write { path, reason } => {
                write!(f, "Failed to write to '{path}': {reason}")
            }
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::DelimiterInKey(key) => {
                write!(f, "Key contains a delimiter: {key}")
            }
            CodecError::DelimiterInDocument(key) => {
                write!(f, "Document for key '{key}' contains the row delimiter")
            }
            CodecError::EmptyKey => write!(f, "Record has an empty key"),
            CodecError::MissingDocument(key) => {
                write!(f, "Record for key '{key}' has no document payload")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DocferryError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for QueryError {}
impl std::error::Error for StoreWriteError {}
impl std::error::Error for PageFileError {}
impl std::error::Error for CodecError {}
impl std::error::Error for ConfigError {}

/* ==================== Conversions to DocferryError ==================== */

impl From<io::Error> for DocferryError {
    fn from(err: io::Error) -> Self {
        DocferryError::Io(err)
    }
}

impl From<mongodb::error::Error> for DocferryError {
    fn from(err: mongodb::error::Error) -> Self {
        DocferryError::MongoDb(err)
    }
}

impl From<ConnectionError> for DocferryError {
    fn from(err: ConnectionError) -> Self {
        DocferryError::Connection(err)
    }
}

impl From<QueryError> for DocferryError {
    fn from(err: QueryError) -> Self {
        DocferryError::Query(err)
    }
}

impl From<StoreWriteError> for DocferryError {
    fn from(err: StoreWriteError) -> Self {
        DocferryError::StoreWrite(err)
    }
}

impl From<PageFileError> for DocferryError {
    fn from(err: PageFileError) -> Self {
        DocferryError::PageFile(err)
    }
}

impl From<CodecError> for DocferryError {
    fn from(err: CodecError) -> Self {
        DocferryError::Codec(err)
    }
}

impl From<ConfigError> for DocferryError {
    fn from(err: ConfigError) -> Self {
        DocferryError::Config(err)
    }
}

impl From<String> for DocferryError {
    fn from(msg: String) -> Self {
        DocferryError::Generic(msg)
    }
}

impl From<&str> for DocferryError {
    fn from(msg: &str) -> Self {
        DocferryError::Generic(msg.to_owned())
    }
}
