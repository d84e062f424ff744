use crate::check::{check_sorted, CheckOutcome};
use crate::compare::compare_ordered;
use crate::config::SortConfig;
use crate::error::{SortContext, SortError, SortResult};
use crate::external_sort::ExternalSort;
use crate::record::{write_records, Record, RecordReader};
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Order `records` in place under `config`.
///
/// The sort is stable, so records the comparator deems equal keep their
/// input order in both directions. Keys that fall back to text comparison
/// make the order non-transitive on mixed input; rayon's merge sort accepts
/// that, where `slice::sort_by` may panic.
pub fn order_records(records: &mut [Record], config: &SortConfig) {
    records.par_sort_by(|a, b| compare_ordered(a, b, config));
}

/// Keep the first occurrence of every original line, wherever later
/// duplicates appear
pub fn dedup_records(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.original().to_owned()))
        .collect()
}

/// In-memory sort: order, then drop repeated lines when `config.unique`
pub fn sort_records(mut records: Vec<Record>, config: &SortConfig) -> Vec<Record> {
    order_records(&mut records, config);
    if config.unique {
        dedup_records(records)
    } else {
        records
    }
}

/// Read all of `input`, sort it in memory and write it to `output`
pub fn sort_in_memory<R, W>(input: R, config: &SortConfig, output: &mut W) -> SortResult<()>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let records: Vec<Record> =
        RecordReader::new(input, &config.field_separator).collect::<SortResult<_>>()?;
    log::debug!("sorting {} records in memory", records.len());
    let sorted = sort_records(records, config);
    write_records(&sorted, output)
}

/// Sort driver: picks check, in-memory or external mode for one input
pub struct CoreSort {
    config: SortConfig,
}

impl CoreSort {
    pub fn new(config: SortConfig) -> Self {
        Self { config }
    }

    /// Stream the input through the sortedness checker
    pub fn check(&self) -> SortResult<CheckOutcome> {
        self.config.validate()?;
        let config = &self.config;

        match self.input_path() {
            None => {
                let stdin = io::stdin();
                check_sorted(RecordReader::new(stdin.lock(), &config.field_separator), config)
            }
            Some(path) => {
                let (file, _) = open_input(path)?;
                let reader = BufReader::new(file);
                check_sorted(RecordReader::new(reader, &config.field_separator), config)
            }
        }
    }

    /// Sort the input into the configured output
    pub fn sort(&self) -> SortResult<()> {
        self.config.validate()?;
        log::info!("sorting in {} mode", self.config.mode());

        match self.config.output_file.as_deref() {
            None => {
                let stdout = io::stdout();
                let mut output = BufWriter::new(stdout.lock());
                self.sort_into(&mut output)
            }
            Some(path) => self.sort_into_file(Path::new(path)),
        }
    }

    /// Write into a temporary file beside `path` and move it into place only
    /// once the whole sort has succeeded
    fn sort_into_file(&self, path: &Path) -> SortResult<()> {
        let name = path.to_string_lossy();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(parent).with_file_context(&name)?;
        {
            let mut output = BufWriter::new(staged.as_file_mut());
            self.sort_into(&mut output)?;
            output.flush().map_err(SortError::write)?;
        }

        staged
            .persist(path)
            .map_err(|err| SortError::write(err.error))?;
        log::debug!("output written to {name}");
        Ok(())
    }

    fn sort_into<W: Write + ?Sized>(&self, output: &mut W) -> SortResult<()> {
        let config = &self.config;

        let Some(path) = self.input_path() else {
            log::info!("reading standard input in memory");
            let stdin = io::stdin();
            return sort_in_memory(stdin.lock(), config, output);
        };

        let (file, size) = open_input(path)?;
        if size > config.external_threshold {
            log::info!(
                "{path} is {size} bytes (threshold {}), sorting externally",
                config.external_threshold
            );
            let sorter = ExternalSort::from_config(config)?;
            return sorter.sort(BufReader::new(file), config, output);
        }

        log::info!("{path} is {size} bytes, sorting in memory");
        if size == 0 {
            return output.flush().map_err(SortError::write);
        }

        // SAFETY: the mapping is read-only and dropped before returning;
        // concurrent truncation of the input by another process is not
        // guarded against, as with any mmap-based reader.
        let mapped = unsafe { Mmap::map(&file) }.with_file_context(path)?;
        sort_in_memory(&mapped[..], config, output)
    }

    fn input_path(&self) -> Option<&str> {
        if self.config.reading_from_stdin() {
            None
        } else {
            self.config.input_file.as_deref()
        }
    }
}

/// Open an input file, returning it with its size in bytes
fn open_input(path: &str) -> SortResult<(File, u64)> {
    let file = File::open(path).with_file_context(path)?;
    let metadata = file.metadata().with_file_context(path)?;
    if metadata.is_dir() {
        return Err(SortError::is_directory(path));
    }
    Ok((file, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{presets, SortConfigBuilder};
    use crate::record::read_records;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn sorted_lines(lines: &[&str], config: &SortConfig) -> Vec<String> {
        let records = lines
            .iter()
            .map(|line| Record::new(line.to_string(), &config.field_separator))
            .collect();
        sort_records(records, config)
            .into_iter()
            .map(Record::into_original)
            .collect()
    }

    #[test]
    fn test_numeric_sort() {
        assert_eq!(
            sorted_lines(&["10", "2", "33"], &presets::numeric()),
            ["2", "10", "33"]
        );
    }

    #[test]
    fn test_field_key_sort() -> SortResult<()> {
        let config = SortConfigBuilder::new().key_field(2).build()?;
        assert_eq!(
            sorted_lines(&["b\t1", "a\t2"], &config),
            ["b\t1", "a\t2"]
        );
        assert_eq!(
            sorted_lines(&["a\t2", "b\t1"], &config),
            ["b\t1", "a\t2"]
        );
        Ok(())
    }

    #[test]
    fn test_human_numeric_sort() {
        assert_eq!(
            sorted_lines(&["1k", "500", "2m"], &presets::human_numeric()),
            ["500", "1k", "2m"]
        );
    }

    #[test]
    fn test_month_sort() {
        assert_eq!(
            sorted_lines(&["Mar 1", "Jan 5", "Feb 2"], &presets::month()),
            ["Jan 5", "Feb 2", "Mar 1"]
        );
    }

    #[test]
    fn test_reverse_keeps_tie_order() -> SortResult<()> {
        let config = SortConfigBuilder::new().key_field(1).reverse().build()?;
        assert_eq!(
            sorted_lines(&["a\t1", "b\t1", "a\t2", "b\t2"], &config),
            ["b\t1", "b\t2", "a\t1", "a\t2"]
        );
        Ok(())
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let config = presets::numeric();
        let once = sorted_lines(&["5", "x", "-1", "3.5", "", "x"], &config);
        let as_str: Vec<&str> = once.iter().map(String::as_str).collect();
        assert_eq!(sorted_lines(&as_str, &config), once);
    }

    #[test]
    fn test_unique_is_global_not_adjacent() -> SortResult<()> {
        // Sorted by the second field, the two "x\t1" lines are not neighbours
        let config = SortConfigBuilder::new().key_field(2).unique().build()?;
        assert_eq!(
            sorted_lines(&["x\t1", "y\t1", "x\t1", "z\t0"], &config),
            ["z\t0", "x\t1", "y\t1"]
        );
        Ok(())
    }

    #[test]
    fn test_large_sort_is_stable() {
        let config = SortConfig::default().with_key_field(1);
        let mut records: Vec<Record> = (0..60_000)
            .map(|i| Record::new(format!("k{}\t{:06}", i % 7, i), "\t"))
            .collect();

        order_records(&mut records, &config);

        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.field(1) <= b.field(1));
            if a.field(1) == b.field(1) {
                assert!(a.field(2) < b.field(2), "{a:?} before {b:?}");
            }
        }
    }

    #[test]
    fn test_text_fallback_cycle_does_not_abort() {
        // 2 < 10 numerically, "10" < "1a" and "1a" < "2" as text
        let mut lines = Vec::new();
        for i in 0..40 {
            lines.push(["2", "10", "1a", "nan"][i % 4]);
        }
        let sorted = sorted_lines(&lines, &presets::numeric());
        assert_eq!(sorted.len(), lines.len());
        assert_eq!(sorted.iter().filter(|line| *line == "1a").count(), 10);
    }

    #[test]
    fn test_sort_in_memory_stream() -> SortResult<()> {
        let mut output = Vec::new();
        sort_in_memory(Cursor::new("b\r\nc\na"), &SortConfig::default(), &mut output)?;
        assert_eq!(output, b"a\nb\nc\n");
        Ok(())
    }

    fn write_input(dir: &TempDir, contents: &str) -> io::Result<String> {
        let path = dir.path().join("input.txt");
        fs::write(&path, contents)?;
        Ok(path.to_string_lossy().to_string())
    }

    fn output_path(dir: &TempDir) -> String {
        dir.path().join("output.txt").to_string_lossy().to_string()
    }

    #[test]
    fn test_sort_file_to_file() -> SortResult<()> {
        let dir = TempDir::new()?;
        let input = write_input(&dir, "zebra\napple\nbanana\ncherry\n")?;
        let output = output_path(&dir);

        let config = SortConfig::default()
            .with_input_file(Some(input))
            .with_output_file(Some(output.clone()));
        CoreSort::new(config).sort()?;

        assert_eq!(fs::read_to_string(&output)?, "apple\nbanana\ncherry\nzebra\n");
        Ok(())
    }

    #[test]
    fn test_external_mode_matches_in_memory() -> SortResult<()> {
        let dir = TempDir::new()?;
        let contents: String = (0..500)
            .map(|i| format!("{}\tv{}\n", (i * 7919) % 113, i % 5))
            .collect();
        let input = write_input(&dir, &contents)?;
        let output = output_path(&dir);

        let config = SortConfigBuilder::new()
            .numeric()
            .unique()
            .chunk_size(37)
            .parallel_threads(3)
            .external_threshold(0)
            .temp_dir(dir.path().to_string_lossy().to_string())
            .input_file(input)
            .output_file(output.clone())
            .build()?;
        CoreSort::new(config.clone()).sort()?;

        let expected = sort_records(read_records(Cursor::new(&contents), "\t")?, &config);
        let expected: String = expected
            .iter()
            .map(|record| format!("{}\n", record.original()))
            .collect();
        assert_eq!(fs::read_to_string(&output)?, expected);

        // Only the input and output remain; the working area is gone
        assert_eq!(fs::read_dir(dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_file() -> SortResult<()> {
        let dir = TempDir::new()?;
        let input = write_input(&dir, "")?;
        let output = output_path(&dir);

        let config = SortConfig::default()
            .with_input_file(Some(input))
            .with_output_file(Some(output.clone()));
        CoreSort::new(config).sort()?;
        assert_eq!(fs::read_to_string(&output)?, "");
        Ok(())
    }

    #[test]
    fn test_check_file() -> SortResult<()> {
        let dir = TempDir::new()?;
        let input = write_input(&dir, "1\n3\n2\n")?;

        let config = presets::check().with_input_file(Some(input));
        let outcome = CoreSort::new(config).check()?;
        assert!(!outcome.is_sorted);
        assert_eq!(outcome.first_violation, Some(2));
        Ok(())
    }

    #[test]
    fn test_missing_input_leaves_no_output() {
        let dir = TempDir::new().expect("temp dir");
        let input = dir.path().join("missing.txt").to_string_lossy().to_string();
        let output = output_path(&dir);

        let config = SortConfig::default()
            .with_input_file(Some(input))
            .with_output_file(Some(output.clone()));
        let result = CoreSort::new(config).sort();

        assert!(matches!(result, Err(SortError::FileNotFound { .. })));
        assert!(!Path::new(&output).exists());
    }

    #[test]
    fn test_directory_input_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let config = presets::check()
            .with_input_file(Some(dir.path().to_string_lossy().to_string()));
        assert!(matches!(
            CoreSort::new(config).check(),
            Err(SortError::IsDirectory { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let config = SortConfig::default()
            .with_chunk_size(0)
            .with_input_file(Some("/nonexistent/input".to_string()));
        assert!(matches!(
            CoreSort::new(config).sort(),
            Err(SortError::InvalidChunkSize { size: 0 })
        ));
    }
}
