//! Walks Itanium C++ ABI vtables and typeinfo records out of compiled
//! object images.
//!
//! The entry point is [`aggregate::extract_all`], which walks every `_ZTV*`
//! symbol in a loaded image and returns one [`model::VtableRecord`] per
//! vtable. [`macho::MachOImage`] is the only concrete loader today; the
//! walker itself (`typeinfo`, `vftable`, `walker`) is written against the
//! [`image::ImageAccessor`] trait and knows nothing about Mach-O.

pub mod aggregate;
pub mod error;
pub mod image;
pub mod model;
pub mod typeinfo;
pub mod vftable;
pub mod walker;

#[cfg(feature = "macho")]
pub mod macho;

#[cfg(test)]
pub(crate) mod testutil;

pub use aggregate::extract_all;
pub use error::{ExtractError, Result};
pub use image::ImageAccessor;
pub use model::{FileFormat, Typeinfo, TypeinfoKind, Vftable, VftableMember, VmiBase, VtableRecord};
