//! Frame stores - the backing-store interface for volume data, plus the
//! in-memory and local-filesystem implementations.
//!
//! A store holds frames: rectangular blocks of whole traces, one frame per
//! position along the physical axes above the trace axis. Positions are
//! physical index vectors, fastest axis first, with the sample and trace
//! slots zero. A frame read reports how many rows the store actually holds;
//! zero rows means the frame was never written.
//!
//! Stores are sequential per handle. The open-mode state machine promotes
//! read to read-write only through a close-then-reopen; all other open calls
//! are idempotent.

use crate::error::{Result, SeisError};
use crate::metadata::DatasetDescriptor;
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

/// Open state of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Closed,
    Read,
    ReadWrite,
}

/// One frame of trace data: `data` is traces-per-frame rows by
/// samples-per-trace columns, zero-padded past `rows_read`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Number of rows the store actually holds for this frame. Zero means
    /// the frame is absent.
    pub rows_read: usize,
    pub data: Array2<f32>,
}

/// Backing-store interface for volume data.
#[async_trait]
pub trait FrameStore: Send + Sync {
    fn descriptor(&self) -> &DatasetDescriptor;

    fn mode(&self) -> OpenMode;

    /// Opens the store for reading. Idempotent when already open.
    async fn open_for_read(&mut self) -> Result<()>;

    /// Opens the store for reading and writing. Promoting an open read
    /// handle forces a close-then-reopen.
    async fn open_for_read_write(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Physical axis lengths, fastest axis first.
    fn axis_lengths(&self) -> &[usize] {
        &self.descriptor().axis_lengths
    }

    /// Physical axis labels, fastest axis first.
    fn axis_labels(&self) -> &[String] {
        &self.descriptor().axis_labels
    }

    /// Reads the frame at the given physical position.
    async fn read_frame(&mut self, position: &[usize]) -> Result<Frame>;

    /// Writes the first `row_count` rows of `data` as the frame at the given
    /// physical position.
    async fn write_frame(&mut self, position: &[usize], row_count: usize, data: &Array2<f32>)
        -> Result<()>;

    /// Reads one trace by its linear index over the whole volume.
    async fn read_trace(&mut self, index: usize) -> Result<Vec<f32>>;

    /// Writes one trace by its linear index over the whole volume.
    async fn write_trace(&mut self, index: usize, samples: &[f32]) -> Result<()>;
}

/// Linear frame index of a physical position, row-major over the axes above
/// the trace axis.
fn frame_index(descriptor: &DatasetDescriptor, position: &[usize]) -> Result<usize> {
    let lengths = &descriptor.axis_lengths;
    if position.len() != lengths.len() {
        return Err(SeisError::Validation(format!(
            "position {:?} does not address {} axes",
            position,
            lengths.len()
        )));
    }
    let mut index = 0;
    for phys in (2..lengths.len()).rev() {
        if position[phys] >= lengths[phys] {
            return Err(SeisError::OutOfBounds(format!(
                "position {:?} exceeds axis {} length {}",
                position, phys, lengths[phys]
            )));
        }
        index = index * lengths[phys] + position[phys];
    }
    Ok(index)
}

fn check_frame_data(
    descriptor: &DatasetDescriptor,
    row_count: usize,
    data: &Array2<f32>,
) -> Result<()> {
    if row_count > data.nrows()
        || row_count > descriptor.traces_per_frame()
        || data.ncols() != descriptor.samples_per_trace()
    {
        return Err(SeisError::Validation(format!(
            "frame data {}x{} with {} rows does not fit a {}x{} frame",
            data.nrows(),
            data.ncols(),
            row_count,
            descriptor.traces_per_frame(),
            descriptor.samples_per_trace()
        )));
    }
    Ok(())
}

fn check_trace_data(descriptor: &DatasetDescriptor, index: usize, samples: &[f32]) -> Result<()> {
    if index >= descriptor.num_traces() {
        return Err(SeisError::OutOfBounds(format!(
            "trace index {} exceeds {} traces",
            index,
            descriptor.num_traces()
        )));
    }
    if samples.len() != descriptor.samples_per_trace() {
        return Err(SeisError::Validation(format!(
            "{} samples for a {}-sample trace",
            samples.len(),
            descriptor.samples_per_trace()
        )));
    }
    Ok(())
}

fn require_open(name: &str, mode: OpenMode) -> Result<()> {
    if mode == OpenMode::Closed {
        return Err(SeisError::Configuration(format!(
            "store '{}' is not open",
            name
        )));
    }
    Ok(())
}

fn require_writable(name: &str, mode: OpenMode) -> Result<()> {
    if mode != OpenMode::ReadWrite {
        return Err(SeisError::Configuration(format!(
            "store '{}' is not open for writing",
            name
        )));
    }
    Ok(())
}

/// In-memory frame store, used by tests and demos.
#[derive(Debug, Clone)]
pub struct MemoryFrameStore {
    descriptor: DatasetDescriptor,
    mode: OpenMode,
    data: Vec<f32>,
    present: HashSet<usize>,
}

impl MemoryFrameStore {
    pub fn new(descriptor: DatasetDescriptor) -> Self {
        let data = vec![0.0; descriptor.num_traces() * descriptor.samples_per_trace()];
        Self {
            descriptor,
            mode: OpenMode::Closed,
            data,
            present: HashSet::new(),
        }
    }

    fn trace_base(&self, index: usize) -> usize {
        index * self.descriptor.samples_per_trace()
    }
}

#[async_trait]
impl FrameStore for MemoryFrameStore {
    fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    async fn open_for_read(&mut self) -> Result<()> {
        if self.mode == OpenMode::Closed {
            debug!(volume = %self.descriptor.name, "opening store for read");
            self.mode = OpenMode::Read;
        }
        Ok(())
    }

    async fn open_for_read_write(&mut self) -> Result<()> {
        match self.mode {
            OpenMode::ReadWrite => {}
            OpenMode::Read => {
                debug!(volume = %self.descriptor.name, "promoting read handle, close and reopen");
                self.close().await?;
                self.mode = OpenMode::ReadWrite;
            }
            OpenMode::Closed => {
                debug!(volume = %self.descriptor.name, "opening store for read-write");
                self.mode = OpenMode::ReadWrite;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.mode != OpenMode::Closed {
            debug!(volume = %self.descriptor.name, "closing store");
            self.mode = OpenMode::Closed;
        }
        Ok(())
    }

    async fn read_frame(&mut self, position: &[usize]) -> Result<Frame> {
        require_open(&self.descriptor.name, self.mode)?;
        let frame = frame_index(&self.descriptor, position)?;
        let rows = self.descriptor.traces_per_frame();
        let cols = self.descriptor.samples_per_trace();
        if !self.present.contains(&frame) {
            return Ok(Frame {
                rows_read: 0,
                data: Array2::zeros((rows, cols)),
            });
        }
        let base = frame * rows * cols;
        let data = Array2::from_shape_vec((rows, cols), self.data[base..base + rows * cols].to_vec())
            .map_err(|e| SeisError::Validation(e.to_string()))?;
        Ok(Frame {
            rows_read: rows,
            data,
        })
    }

    async fn write_frame(
        &mut self,
        position: &[usize],
        row_count: usize,
        data: &Array2<f32>,
    ) -> Result<()> {
        require_writable(&self.descriptor.name, self.mode)?;
        check_frame_data(&self.descriptor, row_count, data)?;
        let frame = frame_index(&self.descriptor, position)?;
        let cols = self.descriptor.samples_per_trace();
        let base = frame * self.descriptor.traces_per_frame() * cols;
        for row in 0..row_count {
            let start = base + row * cols;
            for (i, &value) in data.row(row).iter().enumerate() {
                self.data[start + i] = value;
            }
        }
        self.present.insert(frame);
        Ok(())
    }

    async fn read_trace(&mut self, index: usize) -> Result<Vec<f32>> {
        require_open(&self.descriptor.name, self.mode)?;
        if index >= self.descriptor.num_traces() {
            return Err(SeisError::OutOfBounds(format!(
                "trace index {} exceeds {} traces",
                index,
                self.descriptor.num_traces()
            )));
        }
        let base = self.trace_base(index);
        Ok(self.data[base..base + self.descriptor.samples_per_trace()].to_vec())
    }

    async fn write_trace(&mut self, index: usize, samples: &[f32]) -> Result<()> {
        require_writable(&self.descriptor.name, self.mode)?;
        check_trace_data(&self.descriptor, index, samples)?;
        let base = self.trace_base(index);
        self.data[base..base + samples.len()].copy_from_slice(samples);
        self.present.insert(index / self.descriptor.traces_per_frame());
        Ok(())
    }
}

const DESCRIPTOR_FILE: &str = "descriptor.json";

/// Local-filesystem frame store: a dataset directory holding the descriptor
/// JSON and one raw little-endian f32 file per written frame.
#[derive(Debug)]
pub struct FileFrameStore {
    root: PathBuf,
    descriptor: DatasetDescriptor,
    mode: OpenMode,
}

impl FileFrameStore {
    /// Creates a new dataset directory and persists the descriptor.
    pub async fn create(root: impl AsRef<Path>, descriptor: DatasetDescriptor) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        let store = Self {
            root,
            descriptor,
            mode: OpenMode::Closed,
        };
        store.persist_descriptor().await?;
        Ok(store)
    }

    /// Opens an existing dataset directory, loading its descriptor.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let descriptor = Self::load_descriptor(&root).await?;
        Ok(Self {
            root,
            descriptor,
            mode: OpenMode::Closed,
        })
    }

    async fn load_descriptor(root: &Path) -> Result<DatasetDescriptor> {
        let path = root.join(DESCRIPTOR_FILE);
        if !path.exists() {
            return Err(SeisError::NotFound(format!(
                "no dataset descriptor at {}",
                path.display()
            )));
        }
        let json = fs::read_to_string(&path).await?;
        DatasetDescriptor::from_json(&json)
    }

    async fn persist_descriptor(&self) -> Result<()> {
        let json = self.descriptor.to_json()?;
        let mut file = fs::File::create(self.root.join(DESCRIPTOR_FILE)).await?;
        file.write_all(json.as_bytes()).await?;
        Ok(())
    }

    fn frame_path(&self, frame: usize) -> PathBuf {
        self.root.join(format!("frame_{:06}.bin", frame))
    }

    fn store_err(&self, err: std::io::Error) -> SeisError {
        error!(volume = %self.descriptor.name, error = %err, "backing store failure");
        SeisError::backing_store(&self.descriptor.name, SeisError::Io(err))
    }

    /// Reads the raw frame file, padding to the full frame shape. Absent
    /// files read as zero rows.
    async fn read_frame_file(&self, frame: usize) -> Result<Frame> {
        let rows = self.descriptor.traces_per_frame();
        let cols = self.descriptor.samples_per_trace();
        let path = self.frame_path(frame);
        if !path.exists() {
            return Ok(Frame {
                rows_read: 0,
                data: Array2::zeros((rows, cols)),
            });
        }
        let bytes = fs::read(&path).await.map_err(|e| self.store_err(e))?;
        let rows_read = (bytes.len() / 4 / cols).min(rows);
        let mut data = Array2::zeros((rows, cols));
        for row in 0..rows_read {
            for col in 0..cols {
                let at = (row * cols + col) * 4;
                data[[row, col]] =
                    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
            }
        }
        Ok(Frame { rows_read, data })
    }

    async fn write_frame_file(
        &self,
        frame: usize,
        row_count: usize,
        data: &Array2<f32>,
    ) -> Result<()> {
        let cols = self.descriptor.samples_per_trace();
        let mut bytes = BytesMut::with_capacity(row_count * cols * 4);
        for row in 0..row_count {
            for &value in data.row(row) {
                bytes.put_f32_le(value);
            }
        }
        fs::write(self.frame_path(frame), &bytes)
            .await
            .map_err(|e| self.store_err(e))
    }
}

#[async_trait]
impl FrameStore for FileFrameStore {
    fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    async fn open_for_read(&mut self) -> Result<()> {
        if self.mode == OpenMode::Closed {
            debug!(volume = %self.descriptor.name, "opening store for read");
            self.descriptor = Self::load_descriptor(&self.root).await?;
            self.mode = OpenMode::Read;
        }
        Ok(())
    }

    async fn open_for_read_write(&mut self) -> Result<()> {
        match self.mode {
            OpenMode::ReadWrite => {}
            OpenMode::Read => {
                debug!(volume = %self.descriptor.name, "promoting read handle, close and reopen");
                self.close().await?;
                self.descriptor = Self::load_descriptor(&self.root).await?;
                self.mode = OpenMode::ReadWrite;
            }
            OpenMode::Closed => {
                debug!(volume = %self.descriptor.name, "opening store for read-write");
                self.descriptor = Self::load_descriptor(&self.root).await?;
                self.mode = OpenMode::ReadWrite;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.mode != OpenMode::Closed {
            debug!(volume = %self.descriptor.name, "closing store");
            self.mode = OpenMode::Closed;
        }
        Ok(())
    }

    async fn read_frame(&mut self, position: &[usize]) -> Result<Frame> {
        require_open(&self.descriptor.name, self.mode)?;
        let frame = frame_index(&self.descriptor, position)?;
        self.read_frame_file(frame).await
    }

    async fn write_frame(
        &mut self,
        position: &[usize],
        row_count: usize,
        data: &Array2<f32>,
    ) -> Result<()> {
        require_writable(&self.descriptor.name, self.mode)?;
        check_frame_data(&self.descriptor, row_count, data)?;
        let frame = frame_index(&self.descriptor, position)?;
        self.write_frame_file(frame, row_count, data).await
    }

    async fn read_trace(&mut self, index: usize) -> Result<Vec<f32>> {
        require_open(&self.descriptor.name, self.mode)?;
        if index >= self.descriptor.num_traces() {
            return Err(SeisError::OutOfBounds(format!(
                "trace index {} exceeds {} traces",
                index,
                self.descriptor.num_traces()
            )));
        }
        let frame = index / self.descriptor.traces_per_frame();
        let row = index % self.descriptor.traces_per_frame();
        let frame_data = self.read_frame_file(frame).await?;
        Ok(frame_data.data.row(row).to_vec())
    }

    async fn write_trace(&mut self, index: usize, samples: &[f32]) -> Result<()> {
        require_writable(&self.descriptor.name, self.mode)?;
        check_trace_data(&self.descriptor, index, samples)?;
        let frame = index / self.descriptor.traces_per_frame();
        let row = index % self.descriptor.traces_per_frame();
        let mut frame_data = self.read_frame_file(frame).await?;
        frame_data.data.row_mut(row).assign(&ArrayView1::from(samples));
        let row_count = frame_data.rows_read.max(row + 1);
        self.write_frame_file(frame, row_count, &frame_data.data).await
    }
}
