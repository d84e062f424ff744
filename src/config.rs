//! Configuration management for sort operations

use crate::error::{SortError, SortResult};
use std::str::FromStr;

/// Records per chunk when sorting externally
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Inputs larger than this many bytes are sorted externally
pub const DEFAULT_EXTERNAL_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Main configuration structure for sort operations
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Key field (1-based); 0 compares whole lines
    pub key_field: usize,
    /// Compare keys as floating-point numbers
    pub numeric: bool,
    /// Descending order
    pub reverse: bool,
    /// Output each distinct line only once
    pub unique: bool,
    /// Compare keys by month name
    pub month: bool,
    /// Strip trailing spaces and tabs from keys
    pub ignore_trailing_blanks: bool,
    /// Check if input is already sorted
    pub check: bool,
    /// Compare keys as human-readable sizes (1k, 2M, 3G)
    pub human_numeric: bool,
    /// Field separator; empty splits on runs of whitespace
    pub field_separator: String,
    /// Records per chunk in external mode
    pub chunk_size: usize,
    /// Number of chunks sorted concurrently
    pub parallel_threads: Option<usize>,
    /// Parent directory for the external sort working area
    pub temp_dir: Option<String>,
    /// Byte size above which a file input is sorted externally
    pub external_threshold: u64,
    /// File to read from (if not specified, use stdin)
    pub input_file: Option<String>,
    /// Output file path
    pub output_file: Option<String>,
}

/// Comparison mode after flag precedence has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Byte-wise comparison of keys
    Lexicographic,
    /// Floating-point comparison of keys
    Numeric,
    /// Human-readable numeric sorting (with suffixes like K, M, G)
    HumanNumeric,
    /// Month name sorting
    Month,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key_field: 0,
            numeric: false,
            reverse: false,
            unique: false,
            month: false,
            ignore_trailing_blanks: false,
            check: false,
            human_numeric: false,
            field_separator: "\t".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel_threads: None,
            temp_dir: None,
            external_threshold: DEFAULT_EXTERNAL_THRESHOLD,
            input_file: None,
            output_file: None,
        }
    }
}

impl SortConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comparison mode, clearing the other mode flags
    pub fn with_mode(mut self, mode: SortMode) -> Self {
        self.numeric = mode == SortMode::Numeric;
        self.human_numeric = mode == SortMode::HumanNumeric;
        self.month = mode == SortMode::Month;
        self
    }

    pub fn with_key_field(mut self, key_field: usize) -> Self {
        self.key_field = key_field;
        self
    }

    /// Enable reverse sorting
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Enable unique output
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Enable check mode
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_ignore_trailing_blanks(mut self, ignore: bool) -> Self {
        self.ignore_trailing_blanks = ignore;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set parallel threads
    pub fn with_parallel_threads(mut self, threads: Option<usize>) -> Self {
        self.parallel_threads = threads;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<String>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn with_external_threshold(mut self, threshold: u64) -> Self {
        self.external_threshold = threshold;
        self
    }

    pub fn with_input_file(mut self, input_file: Option<String>) -> Self {
        self.input_file = input_file;
        self
    }

    /// Set output file
    pub fn with_output_file(mut self, output_file: Option<String>) -> Self {
        self.output_file = output_file;
        self
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> SortResult<()> {
        if self.chunk_size == 0 {
            return Err(SortError::InvalidChunkSize {
                size: self.chunk_size,
            });
        }

        // Validate thread count
        if let Some(threads) = self.parallel_threads {
            if threads == 0 {
                return Err(SortError::thread_pool_error(
                    "thread count must be positive",
                ));
            }
            if threads > 1024 {
                return Err(SortError::thread_pool_error(
                    "too many threads (maximum 1024)",
                ));
            }
        }

        Ok(())
    }

    /// Resolve the mode flags: month wins over human-numeric, which wins over numeric
    pub fn mode(&self) -> SortMode {
        if self.month {
            SortMode::Month
        } else if self.human_numeric {
            SortMode::HumanNumeric
        } else if self.numeric {
            SortMode::Numeric
        } else {
            SortMode::Lexicographic
        }
    }

    /// Check if reading from stdin
    pub fn reading_from_stdin(&self) -> bool {
        matches!(self.input_file.as_deref(), None | Some("-"))
    }

    /// Get effective thread count
    pub fn effective_thread_count(&self) -> usize {
        self.parallel_threads.unwrap_or_else(num_cpus::get)
    }

    /// Create a configuration for check operations
    pub fn for_check(&self) -> Self {
        let mut config = self.clone();
        config.check = true;
        config.unique = false; // Not applicable for check
        config
    }
}

impl FromStr for SortMode {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicographic" | "text" | "default" => Ok(SortMode::Lexicographic),
            "numeric" | "n" => Ok(SortMode::Numeric),
            "human-numeric" | "h" => Ok(SortMode::HumanNumeric),
            "month" | "m" => Ok(SortMode::Month),
            _ => Err(SortError::internal(&format!("unknown sort mode: {s}"))),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortMode::Lexicographic => "lexicographic",
            SortMode::Numeric => "numeric",
            SortMode::HumanNumeric => "human-numeric",
            SortMode::Month => "month",
        };
        write!(f, "{name}")
    }
}

/// Builder pattern for creating configurations
pub struct SortConfigBuilder {
    config: SortConfig,
    key_field: i64,
}

impl SortConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
            key_field: 0,
        }
    }

    /// Set the key field; negative values are rejected by `build`
    pub fn key_field(mut self, field: i64) -> Self {
        self.key_field = field;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.config.numeric = true;
        self
    }

    pub fn human_numeric(mut self) -> Self {
        self.config.human_numeric = true;
        self
    }

    pub fn month(mut self) -> Self {
        self.config.month = true;
        self
    }

    /// Enable reverse sorting
    pub fn reverse(mut self) -> Self {
        self.config.reverse = true;
        self
    }

    /// Enable unique output
    pub fn unique(mut self) -> Self {
        self.config.unique = true;
        self
    }

    pub fn ignore_trailing_blanks(mut self) -> Self {
        self.config.ignore_trailing_blanks = true;
        self
    }

    /// Enable check mode
    pub fn check(mut self) -> Self {
        self.config.check = true;
        self
    }

    /// Set field separator
    pub fn field_separator(mut self, separator: &str) -> Self {
        self.config.field_separator = separator.to_string();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn parallel_threads(mut self, threads: usize) -> Self {
        self.config.parallel_threads = Some(threads);
        self
    }

    pub fn temp_dir(mut self, dir: String) -> Self {
        self.config.temp_dir = Some(dir);
        self
    }

    pub fn external_threshold(mut self, bytes: u64) -> Self {
        self.config.external_threshold = bytes;
        self
    }

    pub fn input_file(mut self, file: String) -> Self {
        self.config.input_file = Some(file);
        self
    }

    /// Set output file
    pub fn output_file(mut self, file: String) -> Self {
        self.config.output_file = Some(file);
        self
    }

    /// Build the final configuration
    pub fn build(mut self) -> SortResult<SortConfig> {
        self.config.key_field = usize::try_from(self.key_field)
            .map_err(|_| SortError::InvalidKeyField {
                field: self.key_field,
            })?;
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SortConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Preset configurations for common use cases
pub mod presets {
    use super::*;

    /// Configuration for numeric sorting
    pub fn numeric() -> SortConfig {
        SortConfig::new().with_mode(SortMode::Numeric)
    }

    /// Configuration for human-readable sizes
    pub fn human_numeric() -> SortConfig {
        SortConfig::new().with_mode(SortMode::HumanNumeric)
    }

    pub fn month() -> SortConfig {
        SortConfig::new().with_mode(SortMode::Month)
    }

    /// Configuration for sorting with unique output
    pub fn unique() -> SortConfig {
        SortConfig::new().with_unique(true)
    }

    /// Configuration for reverse sorting
    pub fn reverse() -> SortConfig {
        SortConfig::new().with_reverse(true)
    }

    /// Configuration for check mode
    pub fn check() -> SortConfig {
        SortConfig::new().with_check(true)
    }
}
