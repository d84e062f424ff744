//! External sorting for inputs larger than memory
//!
//! Input records are cut into fixed-size chunks, each chunk is sorted by a
//! worker thread and persisted as a numbered run inside a private working
//! directory, and the runs are then merged into one ordered stream. The
//! working directory and everything in it is removed when the [`ExternalSort`]
//! is dropped, whether the sort succeeded or not.

use crate::compare::compare_ordered;
use crate::config::SortConfig;
use crate::core_sort::order_records;
use crate::error::{SortError, SortResult};
use crate::record::{write_record, Record, RecordReader};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

/// A sorted, persisted chunk of input. Dropping a run removes its file.
#[derive(Debug)]
pub struct Run {
    id: usize,
    path: PathBuf,
    len: usize,
}

impl Run {
    /// Sequence id of the chunk this run was built from
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the run
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("released run {}", self.id),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("cannot remove run file {}: {}", self.path.display(), err),
        }
    }
}

/// External sorter owning one temporary working area
pub struct ExternalSort {
    /// Records per chunk
    chunk_size: usize,
    /// Chunks sorted concurrently
    max_parallel: usize,
    /// Temporary directory for run files
    temp_dir: TempDir,
    /// Chunk whose worker panics, to exercise failure handling
    #[cfg(test)]
    panic_on_chunk: Option<usize>,
}

impl ExternalSort {
    /// Create an external sorter with its working area under `temp_dir_path`
    /// (or the system temporary directory)
    pub fn new(
        chunk_size: usize,
        max_parallel: usize,
        temp_dir_path: Option<&str>,
    ) -> SortResult<Self> {
        if chunk_size == 0 {
            return Err(SortError::InvalidChunkSize { size: chunk_size });
        }
        if max_parallel == 0 {
            return Err(SortError::thread_pool_error("thread count must be positive"));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("sort-chunks");
        let temp_dir = match temp_dir_path {
            Some(path) => builder.tempdir_in(path),
            None => builder.tempdir(),
        }
        .map_err(|source| SortError::TempDir { source })?;

        log::info!(
            "using {} as a temporary working area",
            temp_dir.path().display()
        );

        Ok(Self {
            chunk_size,
            max_parallel,
            temp_dir,
            #[cfg(test)]
            panic_on_chunk: None,
        })
    }

    pub fn from_config(config: &SortConfig) -> SortResult<Self> {
        Self::new(
            config.chunk_size,
            config.effective_thread_count(),
            config.temp_dir.as_deref(),
        )
    }

    /// Directory holding the run files
    pub fn work_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Sort `input` into `output`: build runs, then merge them
    pub fn sort<R, W>(&self, input: R, config: &SortConfig, output: &mut W) -> SortResult<()>
    where
        R: BufRead,
        W: Write + ?Sized,
    {
        let runs = self.build_runs(RecordReader::new(input, &config.field_separator), config)?;
        self.merge_runs(runs, config, output)
    }

    /// Partition `records` into chunks, sort them on at most `max_parallel`
    /// worker threads and persist each one as a run.
    ///
    /// Workers hand their runs back over a channel, so the returned list is
    /// in completion order, not id order. Only the first worker failure is
    /// kept; workers already running are allowed to finish but their runs
    /// are released. A read error stops chunking and is returned once the
    /// in-flight workers are done.
    pub fn build_runs<I>(&self, records: I, config: &SortConfig) -> SortResult<Vec<Run>>
    where
        I: IntoIterator<Item = SortResult<Record>>,
    {
        log::info!(
            "building runs (chunk size {}, at most {} in flight)",
            self.chunk_size,
            self.max_parallel
        );

        let mut records = records.into_iter();
        let (gate_tx, gate_rx) = bounded::<()>(self.max_parallel);
        let (run_tx, run_rx) = unbounded::<Run>();
        let (error_tx, error_rx) = bounded::<SortError>(1);

        let read_result = thread::scope(|scope| {
            let mut workers = Vec::new();
            let mut next_id = 0;

            let read_result = loop {
                let chunk = match self.next_chunk(&mut records) {
                    Ok(chunk) if chunk.is_empty() => break Ok(()),
                    Ok(chunk) => chunk,
                    Err(err) => break Err(err),
                };
                let id = next_id;
                next_id += 1;

                // Blocks while max_parallel chunks are in flight
                if gate_tx.send(()).is_err() {
                    break Err(SortError::internal("admission gate closed"));
                }
                let permit = GatePermit(gate_rx.clone());
                let run_tx = run_tx.clone();
                let error_tx = error_tx.clone();

                let handle = scope.spawn(move || {
                    let _permit = permit;
                    match self.persist_chunk(chunk, id, config) {
                        Ok(run) => {
                            let _ = run_tx.send(run);
                        }
                        Err(err) => report_failure(&error_tx, SortError::build(id, err)),
                    }
                });
                workers.push((id, handle));
            };

            for (id, handle) in workers {
                if handle.join().is_err() {
                    report_failure(&error_tx, SortError::Worker { chunk: id });
                }
            }
            read_result
        });
        drop(run_tx);

        let runs: Vec<Run> = run_rx.try_iter().collect();
        let failure = match read_result {
            Err(err) => Some(err),
            Ok(()) => error_rx.try_recv().ok(),
        };
        if let Some(err) = failure {
            log::debug!("releasing {} runs of a failed build", runs.len());
            return Err(err);
        }

        log::info!("built {} runs", runs.len());
        Ok(runs)
    }

    /// Merge `runs` into `output` in the order given by `config`.
    ///
    /// Keeps one buffered record per open run. Ties between runs go to the
    /// run with the lower id, which is the earlier part of the input. With
    /// `config.unique`, a record is emitted only if no record with the same
    /// original text was emitted before.
    pub fn merge_runs<W>(
        &self,
        mut runs: Vec<Run>,
        config: &SortConfig,
        output: &mut W,
    ) -> SortResult<()>
    where
        W: Write + ?Sized,
    {
        log::info!("merging {} runs", runs.len());
        runs.sort_unstable_by_key(Run::id);

        if runs.len() == 1 && !config.unique {
            if let Some(run) = runs.into_iter().next() {
                return copy_run(run, output);
            }
            return Ok(());
        }

        // On an open failure the runs not yet opened are dropped, and so released
        let mut cursors = runs
            .into_iter()
            .map(|run| RunCursor::open(run, &config.field_separator))
            .collect::<SortResult<Vec<_>>>()?;

        let mut heap = BinaryHeap::with_capacity(cursors.len());
        for (index, cursor) in cursors.iter_mut().enumerate() {
            match cursor.next_record()? {
                Some(record) => heap.push(Reverse(MergeEntry {
                    record,
                    cursor: index,
                    run_id: cursor.id,
                    config,
                })),
                None => cursor.close(),
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        while let Some(Reverse(entry)) = heap.pop() {
            let MergeEntry {
                record,
                cursor: index,
                run_id,
                ..
            } = entry;

            if !config.unique || !seen.contains(record.original()) {
                write_record(&record, output).map_err(SortError::write)?;
                if config.unique {
                    seen.insert(record.into_original());
                }
            }

            let cursor = &mut cursors[index];
            match cursor.next_record()? {
                Some(record) => heap.push(Reverse(MergeEntry {
                    record,
                    cursor: index,
                    run_id,
                    config,
                })),
                None => cursor.close(),
            }
        }

        output.flush().map_err(SortError::write)
    }

    fn next_chunk<I>(&self, records: &mut I) -> SortResult<Vec<Record>>
    where
        I: Iterator<Item = SortResult<Record>>,
    {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        for record in records.by_ref().take(self.chunk_size) {
            chunk.push(record?);
        }
        Ok(chunk)
    }

    /// Sort one chunk and write it to its run file
    fn persist_chunk(
        &self,
        mut chunk: Vec<Record>,
        id: usize,
        config: &SortConfig,
    ) -> SortResult<Run> {
        log::debug!("sorting chunk {id} ({} records)", chunk.len());
        #[cfg(test)]
        if self.panic_on_chunk == Some(id) {
            panic!("sorting chunk {id} failed");
        }
        order_records(&mut chunk, config);

        let path = self.run_path(id);
        let run_error = |source| SortError::RunWrite { run: id, source };

        let mut writer = BufWriter::new(File::create(&path).map_err(run_error)?);
        for record in &chunk {
            write_record(record, &mut writer).map_err(run_error)?;
        }
        writer.flush().map_err(run_error)?;

        log::debug!("persisted run {id} to {}", path.display());
        Ok(Run {
            id,
            path,
            len: chunk.len(),
        })
    }

    fn run_path(&self, id: usize) -> PathBuf {
        self.temp_dir.path().join(format!("run-{id:06}.txt"))
    }
}

/// One admission slot; the slot is freed when the permit drops, even if
/// the worker holding it panics
struct GatePermit(Receiver<()>);

impl Drop for GatePermit {
    fn drop(&mut self) {
        let _ = self.0.recv();
    }
}

/// Keep the first failure; later ones are dropped
fn report_failure(slot: &Sender<SortError>, err: SortError) {
    if let Err(dropped) = slot.try_send(err) {
        log::debug!("discarding additional failure: {}", dropped.into_inner());
    }
}

/// Stream a single run to the output unchanged
fn copy_run<W: Write + ?Sized>(run: Run, output: &mut W) -> SortResult<()> {
    let file = File::open(&run.path).map_err(|err| SortError::merge(run.id, err))?;
    let mut reader = BufReader::new(file);
    loop {
        let buf = reader
            .fill_buf()
            .map_err(|err| SortError::merge(run.id, err))?;
        if buf.is_empty() {
            break;
        }
        output.write_all(buf).map_err(SortError::write)?;
        let consumed = buf.len();
        reader.consume(consumed);
    }
    output.flush().map_err(SortError::write)
}

/// Forward cursor over one run; closing it releases the run
struct RunCursor {
    id: usize,
    reader: Option<RecordReader<BufReader<File>>>,
    run: Option<Run>,
}

impl RunCursor {
    fn open(run: Run, separator: &str) -> SortResult<Self> {
        let file = File::open(&run.path).map_err(|err| SortError::merge(run.id, err))?;
        log::debug!("opened run {}", run.id);
        Ok(Self {
            id: run.id,
            reader: Some(RecordReader::verbatim(BufReader::new(file), separator)),
            run: Some(run),
        })
    }

    fn next_record(&mut self) -> SortResult<Option<Record>> {
        let id = self.id;
        match self.reader.as_mut() {
            Some(reader) => reader.next_record().map_err(|err| SortError::merge(id, err)),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("closed run {}", self.id);
            self.run.take();
        }
    }
}

/// Buffered head of one run, ordered for a min-heap by `Reverse`
struct MergeEntry<'a> {
    record: Record,
    cursor: usize,
    run_id: usize,
    config: &'a SortConfig,
}

impl PartialEq for MergeEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry<'_> {}

impl PartialOrd for MergeEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_ordered(&self.record, &other.record, self.config)
            .then_with(|| self.run_id.cmp(&other.run_id))
    }
}
