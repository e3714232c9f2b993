// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Interfaces to read and write guest memory.
//!
//! A [`GuestMemory`] is one address space as seen from one bus master. A
//! device with several master ports (e.g: a DMA controller with one port per
//! AHB layer) holds one `GuestMemory` per port, and each may reach a
//! different memory topology.

#![forbid(unsafe_code)]

use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

/// A memory access error returned by one of the [`GuestMemory`] methods.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct GuestMemoryError(Box<GuestMemoryErrorInner>);

impl GuestMemoryError {
    fn new(
        debug_name: &Arc<str>,
        range: Range<u64>,
        op: GuestMemoryOperation,
        err: GuestMemoryBackingError,
    ) -> Self {
        GuestMemoryError(Box::new(GuestMemoryErrorInner {
            op,
            debug_name: debug_name.clone(),
            range,
            gpa: err.gpa,
            kind: err.kind,
            err: err.err,
        }))
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> GuestMemoryErrorKind {
        self.0.kind
    }
}

#[derive(Debug, Copy, Clone)]
enum GuestMemoryOperation {
    Read,
    Write,
}

impl std::fmt::Display for GuestMemoryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            GuestMemoryOperation::Read => "read",
            GuestMemoryOperation::Write => "write",
        })
    }
}

#[derive(Debug, Error)]
struct GuestMemoryErrorInner {
    op: GuestMemoryOperation,
    debug_name: Arc<str>,
    range: Range<u64>,
    gpa: u64,
    kind: GuestMemoryErrorKind,
    #[source]
    err: Box<dyn std::error::Error + Send + Sync>,
}

impl std::fmt::Display for GuestMemoryErrorInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "guest memory '{debug_name}': {op} error: failed to access {start:#x}-{end:#x}",
            debug_name = self.debug_name,
            op = self.op,
            start = self.range.start,
            end = self.range.end,
        )?;
        // Include the precise address if it differs from the start of the
        // range.
        if self.gpa != self.range.start {
            write!(f, " at {:#x}", self.gpa)?;
        }
        Ok(())
    }
}

/// A memory access error returned by a [`GuestMemoryAccess`] trait method.
#[derive(Debug)]
pub struct GuestMemoryBackingError {
    gpa: u64,
    kind: GuestMemoryErrorKind,
    err: Box<dyn std::error::Error + Send + Sync>,
}

/// The kind of memory access error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GuestMemoryErrorKind {
    /// An error that does not fit any other category.
    Other,
    /// The address is outside the valid range of the memory.
    OutOfRange,
}

impl GuestMemoryBackingError {
    /// Returns a new error for a memory access failure at address `gpa`.
    pub fn new(
        kind: GuestMemoryErrorKind,
        gpa: u64,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            gpa,
            err: err.into(),
        }
    }

    /// Returns a new error without an explicit kind.
    pub fn other(gpa: u64, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(GuestMemoryErrorKind::Other, gpa, err)
    }

    fn out_of_range(gpa: u64) -> Self {
        Self::new(GuestMemoryErrorKind::OutOfRange, gpa, OutOfRange)
    }
}

#[derive(Debug, Error)]
#[error("no memory at address")]
struct OutOfRange;

/// A backing for guest memory.
///
/// Implementations report failures with the precise failing address. The
/// [`GuestMemory`] wrapper adds the operation and the requested range.
pub trait GuestMemoryAccess: 'static + Send + Sync {
    /// Reads `dest.len()` bytes starting at `gpa`.
    fn read_at(&self, gpa: u64, dest: &mut [u8]) -> Result<(), GuestMemoryBackingError>;

    /// Writes all of `src` starting at `gpa`.
    fn write_at(&self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryBackingError>;
}

/// A zero-initialized, heap-allocated memory backing starting at address 0.
pub struct HeapMemory {
    buf: Box<[AtomicU8]>,
}

impl Debug for HeapMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapMemory")
            .field("len", &self.buf.len())
            .finish()
    }
}

impl HeapMemory {
    /// Allocates `size` bytes of zeroed memory.
    pub fn new(size: usize) -> Self {
        Self {
            buf: (0..size).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    /// Returns the length of the memory in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the memory is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn range(&self, gpa: u64, len: usize) -> Result<&[AtomicU8], GuestMemoryBackingError> {
        let start = usize::try_from(gpa).map_err(|_| GuestMemoryBackingError::out_of_range(gpa))?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                // Report the first byte that isn't backed.
                let first_bad = gpa.max(self.buf.len() as u64);
                GuestMemoryBackingError::out_of_range(first_bad)
            })?;
        Ok(&self.buf[start..end])
    }
}

impl GuestMemoryAccess for HeapMemory {
    fn read_at(&self, gpa: u64, dest: &mut [u8]) -> Result<(), GuestMemoryBackingError> {
        let src = self.range(gpa, dest.len())?;
        for (d, s) in dest.iter_mut().zip(src) {
            *d = s.load(Ordering::Relaxed);
        }
        Ok(())
    }

    fn write_at(&self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryBackingError> {
        let dest = self.range(gpa, src.len())?;
        for (d, s) in dest.iter().zip(src) {
            d.store(*s, Ordering::Relaxed);
        }
        Ok(())
    }
}

struct Empty;

impl GuestMemoryAccess for Empty {
    fn read_at(&self, gpa: u64, _dest: &mut [u8]) -> Result<(), GuestMemoryBackingError> {
        Err(GuestMemoryBackingError::out_of_range(gpa))
    }

    fn write_at(&self, gpa: u64, _src: &[u8]) -> Result<(), GuestMemoryBackingError> {
        Err(GuestMemoryBackingError::out_of_range(gpa))
    }
}

/// A handle to one guest address space.
///
/// Cloning is cheap and yields a handle to the same memory.
#[derive(Clone)]
pub struct GuestMemory {
    inner: Arc<GuestMemoryInner>,
}

struct GuestMemoryInner {
    debug_name: Arc<str>,
    imp: Box<dyn GuestMemoryAccess>,
}

impl Debug for GuestMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestMemory")
            .field("debug_name", &self.inner.debug_name)
            .finish()
    }
}

impl GuestMemory {
    /// Returns a new instance using `imp` as the backing.
    ///
    /// `debug_name` is used to specify which guest memory is being accessed in
    /// error messages.
    pub fn new(debug_name: impl Into<Arc<str>>, imp: impl GuestMemoryAccess) -> Self {
        Self {
            inner: Arc::new(GuestMemoryInner {
                debug_name: debug_name.into(),
                imp: Box::new(imp),
            }),
        }
    }

    /// Allocates a guest memory of `size` zeroed bytes on the heap.
    ///
    /// The debug name in errors will be "heap".
    pub fn allocate(size: usize) -> Self {
        Self::new("heap", HeapMemory::new(size))
    }

    /// Returns an empty guest memory, which fails every operation.
    pub fn empty() -> Self {
        Self::new("empty", Empty)
    }

    /// Returns the name used in error messages.
    pub fn debug_name(&self) -> &str {
        &self.inner.debug_name
    }

    fn wrap_err(
        &self,
        gpa: u64,
        len: usize,
        op: GuestMemoryOperation,
        err: GuestMemoryBackingError,
    ) -> GuestMemoryError {
        let range = gpa..gpa.wrapping_add(len as u64);
        GuestMemoryError::new(&self.inner.debug_name, range, op, err)
    }

    /// Writes `src` into guest memory at address `gpa`.
    pub fn write_at(&self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        self.inner
            .imp
            .write_at(gpa, src)
            .map_err(|err| self.wrap_err(gpa, src.len(), GuestMemoryOperation::Write, err))
    }

    /// Reads from guest memory address `gpa` into `dest`.
    pub fn read_at(&self, gpa: u64, dest: &mut [u8]) -> Result<(), GuestMemoryError> {
        self.inner
            .imp
            .read_at(gpa, dest)
            .map_err(|err| self.wrap_err(gpa, dest.len(), GuestMemoryOperation::Read, err))
    }

    /// Writes an object to guest memory at address `gpa`, as a single access.
    pub fn write_plain<T: IntoBytes + Immutable + KnownLayout>(
        &self,
        gpa: u64,
        b: &T,
    ) -> Result<(), GuestMemoryError> {
        self.write_at(gpa, b.as_bytes())
    }

    /// Reads an object from guest memory at address `gpa`, as a single access.
    pub fn read_plain<T: FromBytes + IntoBytes + KnownLayout>(
        &self,
        gpa: u64,
    ) -> Result<T, GuestMemoryError> {
        let mut obj = T::new_zeroed();
        self.read_at(gpa, obj.as_mut_bytes())?;
        Ok(obj)
    }
}
