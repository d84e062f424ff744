//! Error handling for the sort engine

use std::io;
use thiserror::Error;

/// Custom error type for sort operations
#[derive(Error, Debug)]
pub enum SortError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Permission denied: {file}")]
    PermissionDenied { file: String },

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Is a directory: {file}")]
    IsDirectory { file: String },

    #[error("failed to read input: {source}")]
    Read { source: io::Error },

    #[error("failed to write output: {source}")]
    Write { source: io::Error },

    #[error("failed to persist run {run}: {source}")]
    RunWrite { run: usize, source: io::Error },

    #[error("failed to build run for chunk {chunk}: {source}")]
    Build {
        chunk: usize,
        #[source]
        source: Box<SortError>,
    },

    #[error("run {run} became unreadable during merge: {source}")]
    Merge { run: usize, source: io::Error },

    #[error("cannot create temporary working area: {source}")]
    TempDir { source: io::Error },

    #[error("worker sorting chunk {chunk} panicked")]
    Worker { chunk: usize },

    #[error("invalid field number: {field}")]
    InvalidKeyField { field: i64 },

    #[error("invalid chunk size: {size}")]
    InvalidChunkSize { size: usize },

    #[error("Thread pool error: {message}")]
    ThreadPoolError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SortError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SortError::PermissionDenied { .. }
            | SortError::FileNotFound { .. }
            | SortError::IsDirectory { .. }
            | SortError::Io(_)
            | SortError::Read { .. }
            | SortError::Write { .. } => crate::SORT_FAILURE,

            _ => crate::EXIT_FAILURE,
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(file: &str) -> Self {
        SortError::PermissionDenied {
            file: file.to_string(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        SortError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create an is directory error
    pub fn is_directory(file: &str) -> Self {
        SortError::IsDirectory {
            file: file.to_string(),
        }
    }

    pub fn read(source: io::Error) -> Self {
        SortError::Read { source }
    }

    pub fn write(source: io::Error) -> Self {
        SortError::Write { source }
    }

    /// Wrap a worker failure with the id of the chunk it was handling
    pub fn build(chunk: usize, source: SortError) -> Self {
        SortError::Build {
            chunk,
            source: Box::new(source),
        }
    }

    pub fn merge(run: usize, source: io::Error) -> Self {
        SortError::Merge { run, source }
    }

    /// Create a thread pool error
    pub fn thread_pool_error(message: &str) -> Self {
        SortError::ThreadPoolError {
            message: message.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(message: &str) -> Self {
        SortError::Internal {
            message: message.to_string(),
        }
    }
}

/// Result type for sort operations
pub type SortResult<T> = Result<T, SortError>;

/// Adds the offending file name to I/O errors
pub trait SortContext<T> {
    fn with_file_context(self, filename: &str) -> SortResult<T>;
}

impl<T> SortContext<T> for Result<T, io::Error> {
    fn with_file_context(self, filename: &str) -> SortResult<T> {
        self.map_err(|io_err| match io_err.kind() {
            io::ErrorKind::PermissionDenied => SortError::permission_denied(filename),
            io::ErrorKind::NotFound => SortError::file_not_found(filename),
            _ => SortError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", filename, io_err),
            )),
        })
    }
}
