use thiserror::Error;

/// Failure to size a bucket array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrimeError {
    /// No prime exists at or below the requested value.
    #[error("input too small for prime_below(): {requested}")]
    TooSmall {
        /// The value passed in.
        requested: usize,
    },
    /// The requested value exceeds [`MAX_PRIME`](crate::prime::MAX_PRIME).
    #[error("input too large for prime_below(): {requested} > {max}", max = crate::prime::MAX_PRIME)]
    TooLarge {
        /// The value passed in.
        requested: usize,
    },
}

/// Failure while loading a table from, or writing it to, a file.
#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum Error {
    /// The source file could not be opened for reading.
    #[error("cannot open {} for reading", path.display())]
    Open {
        /// Path that failed to open.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The destination file could not be created.
    #[error("cannot open {} for writing", path.display())]
    Create {
        /// Path that failed to open.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing or flushing entries failed after the file was opened.
    #[error("failed writing entries to {}", path.display())]
    Write {
        /// Path being written.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
