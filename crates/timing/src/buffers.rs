//! Aligned, guard-protected working buffers shared by every back-end
//! measured at one problem size.

use bytemuck::{Pod, Zeroable};
use spectrabench_kernels::backend::DynTransformBackend;
use spectrabench_kernels::config::ProblemSize;
use std::collections::TryReserveError;
use thiserror::Error;

/// Marker stored immediately after each logical buffer.
pub const GUARD_VALUE: f32 = 12345.0;

/// Alignment, in bytes, of every buffer handed to a back-end.
pub const BUFFER_ALIGN: usize = 64;

const LANE_FLOATS: usize = BUFFER_ALIGN / std::mem::size_of::<f32>();

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(64))]
struct Lane([f32; LANE_FLOATS]);

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to allocate {floats} floats")]
    Allocation {
        floats: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("{backend} requires {required}-byte alignment, buffers provide 64")]
    Alignment {
        backend: &'static str,
        required: usize,
    },
    #[error("{backend} needs {required} scratch floats, only {available} allocated")]
    ScratchTooSmall {
        backend: &'static str,
        required: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{backend} overwrote the guard after the {buffer} buffer at {size} (expected 12345, found {found})")]
pub struct CorruptionError {
    pub backend: String,
    pub size: ProblemSize,
    pub buffer: &'static str,
    pub found: f32,
}

/// Zero-initialized `f32` storage whose first element is 64-byte aligned.
pub struct AlignedBuffer {
    lanes: Vec<Lane>,
    len: usize,
}

impl AlignedBuffer {
    pub fn new(len: usize) -> Result<Self, BufferError> {
        let lane_count = len.div_ceil(LANE_FLOATS);
        let mut lanes = Vec::new();
        lanes
            .try_reserve_exact(lane_count)
            .map_err(|source| BufferError::Allocation {
                floats: len,
                source,
            })?;
        lanes.resize(lane_count, Lane::zeroed());
        Ok(Self { lanes, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &bytemuck::cast_slice::<Lane, f32>(&self.lanes)[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut bytemuck::cast_slice_mut::<Lane, f32>(&mut self.lanes)[..self.len]
    }
}

/// A logical buffer followed by one [`GUARD_VALUE`] slot.
pub struct GuardedBuffer {
    name: &'static str,
    storage: AlignedBuffer,
    len: usize,
}

impl GuardedBuffer {
    pub fn new(name: &'static str, len: usize) -> Result<Self, BufferError> {
        let mut storage = AlignedBuffer::new(len + 1)?;
        storage.as_mut_slice()[len] = GUARD_VALUE;
        Ok(Self { name, storage, len })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[f32] {
        &self.storage.as_slice()[..self.len]
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.storage.as_mut_slice()[..self.len]
    }

    pub fn guard(&self) -> f32 {
        self.storage.as_slice()[self.len]
    }

    pub fn check_guard(&self, backend: &str, size: ProblemSize) -> Result<(), CorruptionError> {
        let found = self.guard();
        if found.to_bits() == GUARD_VALUE.to_bits() {
            Ok(())
        } else {
            Err(CorruptionError {
                backend: backend.to_string(),
                size,
                buffer: self.name,
                found,
            })
        }
    }

    /// Test hook for the guard slot.
    #[doc(hidden)]
    pub fn storage_mut(&mut self) -> &mut [f32] {
        self.storage.as_mut_slice()
    }
}

/// Input, output and scratch buffers for one `(size, domain)`, allocated
/// once and reused by every back-end measured at that size.
pub struct BufferSet {
    size: ProblemSize,
    input: GuardedBuffer,
    output: GuardedBuffer,
    scratch: GuardedBuffer,
}

impl BufferSet {
    pub fn new(size: ProblemSize, scratch_len: usize) -> Result<Self, BufferError> {
        let len = size.float_len();
        Ok(Self {
            size,
            input: GuardedBuffer::new("input", len)?,
            output: GuardedBuffer::new("output", len)?,
            scratch: GuardedBuffer::new("scratch", scratch_len)?,
        })
    }

    /// Size scratch for the hungriest back-end and check that every
    /// back-end is satisfied with [`BUFFER_ALIGN`].
    pub fn for_backends(
        size: ProblemSize,
        backends: &[DynTransformBackend],
    ) -> Result<Self, BufferError> {
        for backend in backends {
            if backend.alignment() > BUFFER_ALIGN {
                return Err(BufferError::Alignment {
                    backend: backend.name(),
                    required: backend.alignment(),
                });
            }
        }
        let scratch_len = backends
            .iter()
            .filter(|backend| backend.supports(&size))
            .map(|backend| backend.scratch_len(&size))
            .max()
            .unwrap_or(0);
        Self::new(size, scratch_len)
    }

    pub fn size(&self) -> ProblemSize {
        self.size
    }

    pub fn input(&self) -> &[f32] {
        self.input.data()
    }

    pub fn output(&self) -> &[f32] {
        self.output.data()
    }

    pub fn input_mut(&mut self) -> &mut [f32] {
        self.input.data_mut()
    }

    /// Fill the input from `f(index)`.
    pub fn fill_input(&mut self, mut f: impl FnMut(usize) -> f32) {
        for (i, x) in self.input.data_mut().iter_mut().enumerate() {
            *x = f(i);
        }
    }

    /// Borrow input, output and the first `scratch_len` scratch floats.
    pub fn split(
        &mut self,
        backend: &'static str,
        scratch_len: usize,
    ) -> Result<(&[f32], &mut [f32], &mut [f32]), BufferError> {
        let available = self.scratch.len();
        if scratch_len > available {
            return Err(BufferError::ScratchTooSmall {
                backend,
                required: scratch_len,
                available,
            });
        }
        Ok((
            self.input.data(),
            self.output.data_mut(),
            &mut self.scratch.data_mut()[..scratch_len],
        ))
    }

    pub fn check_guards(&self, backend: &str) -> Result<(), CorruptionError> {
        self.input.check_guard(backend, self.size)?;
        self.output.check_guard(backend, self.size)?;
        self.scratch.check_guard(backend, self.size)
    }

    #[doc(hidden)]
    pub fn output_guarded_mut(&mut self) -> &mut GuardedBuffer {
        &mut self.output
    }
}
