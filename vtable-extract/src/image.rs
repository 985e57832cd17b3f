//! The narrow interface the walker needs from a loaded binary image.
//!
//! This is the "loader" collaborator described by the design: a thin adapter
//! that the walker consumes without knowing anything about the underlying
//! container format. [`crate::macho::MachOImage`] is the only implementation
//! today; a future ELF loader would implement the same trait.

use crate::error::Result;
use crate::model::{Address, FileFormat};

/// Read-only, format-agnostic access to a loaded image's bytes and its
/// precomputed symbol and binding indices.
pub trait ImageAccessor {
    /// `4` or `8`, depending on the image's CPU architecture.
    fn pointer_size(&self) -> u8;

    /// The physical container format of the underlying image.
    fn format(&self) -> FileFormat;

    /// Reads a little-endian `u32` at `va`.
    fn read_u32(&self, va: Address) -> Result<u32>;

    /// Reads a little-endian `i32` at `va`.
    fn read_i32(&self, va: Address) -> Result<i32>;

    /// Reads a little-endian `u64` at `va`.
    fn read_u64(&self, va: Address) -> Result<u64>;

    /// Reads a little-endian pointer-sized unsigned value at `va`, zero
    /// extended to `u64`. Dispatches on [`ImageAccessor::pointer_size`].
    fn read_ptr(&self, va: Address) -> Result<u64> {
        match self.pointer_size() {
            4 => self.read_u32(va).map(u64::from),
            8 => self.read_u64(va),
            _ => unreachable!("pointer_size is validated at construction time"),
        }
    }

    /// Reads a NUL-terminated byte string at `va` and returns it as an owned
    /// `String` (mangled C++ names are always ASCII).
    fn read_cstring(&self, va: Address) -> Result<String>;

    /// The fixed-up name of the symbol whose address is exactly `va`, if any.
    fn symbol_at(&self, va: Address) -> Option<&str>;

    /// The name bound (by the dynamic linker) to `va`, if any.
    fn binding_at(&self, va: Address) -> Option<&str>;

    /// All symbols in the image, in ascending address order.
    ///
    /// Used by the [result aggregator](crate::aggregate) to discover `_ZTV*`
    /// entry points without re-deriving the index.
    fn symbols_ascending(&self) -> Vec<(Address, &str)>;
}
