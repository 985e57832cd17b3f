//! [`ImageAccessor`] implementation backed by a parsed Mach-O file.

use std::collections::BTreeMap;

use goblin::mach;
use scroll::{Pread, LE};

use crate::error::{ExtractError, Result};
use crate::image::ImageAccessor;
use crate::model::{Address, FileFormat};

/// Prefix Apple's bitcode stripping tool leaves on hidden Swift symbols;
/// these are never stripped of their leading underscore.
const HIDDEN_SYMBOL_PREFIX: &str = "__hidden#";

/// One loaded segment's worth of raw bytes, addressable by virtual address.
struct MappedSection {
    vmaddr: u64,
    data: Vec<u8>,
}

impl MappedSection {
    fn contains(&self, va: Address) -> bool {
        va >= self.vmaddr && va - self.vmaddr < self.data.len() as u64
    }

    fn slice_from(&self, va: Address) -> &[u8] {
        &self.data[(va - self.vmaddr) as usize..]
    }
}

/// An [`ImageAccessor`] over a parsed Mach-O image.
///
/// Unlike the rest of the Mach-O ecosystem this crate builds on, `MachOImage`
/// does not keep the borrowed `goblin::mach::MachO` around: every symbol,
/// binding and section byte range it needs is copied out once in
/// [`MachOImage::parse`], so the accessor owns everything it reads and has
/// no lifetime tied to the caller's buffer.
pub struct MachOImage {
    pointer_size: u8,
    symbols: BTreeMap<Address, String>,
    bindings: BTreeMap<Address, String>,
    sections: Vec<MappedSection>,
}

/// Strips the leading underscore C symbols are mangled with, except for
/// Apple's hidden-Swift-symbol marker which legitimately starts with one.
fn fixup_symbol_name(name: &str) -> String {
    if name.starts_with(HIDDEN_SYMBOL_PREFIX) {
        return name.to_owned();
    }
    name.strip_prefix('_').unwrap_or(name).to_owned()
}

impl MachOImage {
    /// Parses a Mach-O image out of `data`.
    ///
    /// Fat (universal) binaries are not unwrapped here; callers that need to
    /// inspect a specific slice should do so before calling this function.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let macho = mach::MachO::parse(data, 0).map_err(|_| ExtractError::UnsupportedFormat)?;

        let pointer_size = if macho.is_64 { 8 } else { 4 };
        if pointer_size != 4 && pointer_size != 8 {
            return Err(ExtractError::UnsupportedPointerWidth);
        }

        let mut symbols = BTreeMap::new();
        if let Some(iter) = macho.symbols {
            for entry in iter {
                let Ok((name, nlist)) = entry else { continue };
                if nlist.is_stab() {
                    continue;
                }
                if nlist.n_sect == usize::from(mach::symbols::NO_SECT) {
                    continue;
                }
                if name.is_empty() {
                    continue;
                }
                symbols.insert(nlist.n_value, fixup_symbol_name(name));
            }
        }

        let mut bindings = BTreeMap::new();
        if let Ok(imports) = macho.imports() {
            for import in imports {
                bindings.insert(import.address, fixup_symbol_name(import.name));
            }
        }

        let mut sections = Vec::new();
        for segment in &macho.segments {
            for result in segment.into_iter() {
                let Ok((header, data)) = result else { continue };
                if header.addr == 0 || data.is_empty() {
                    continue;
                }
                sections.push(MappedSection {
                    vmaddr: header.addr,
                    data: data.to_vec(),
                });
            }
        }

        Ok(MachOImage {
            pointer_size,
            symbols,
            bindings,
            sections,
        })
    }

    fn section_for(&self, va: Address) -> Option<&MappedSection> {
        self.sections.iter().find(|section| section.contains(va))
    }

    fn read_bytes(&self, va: Address, len: usize) -> Result<&[u8]> {
        let section = self
            .section_for(va)
            .ok_or(ExtractError::AddressNotMapped { address: va })?;
        let slice = section.slice_from(va);
        if slice.len() < len {
            return Err(ExtractError::AddressNotMapped { address: va });
        }
        Ok(&slice[..len])
    }
}

impl ImageAccessor for MachOImage {
    fn pointer_size(&self) -> u8 {
        self.pointer_size
    }

    fn format(&self) -> FileFormat {
        FileFormat::MachO
    }

    fn read_u32(&self, va: Address) -> Result<u32> {
        let bytes = self.read_bytes(va, 4)?;
        bytes
            .pread_with(0, LE)
            .map_err(|_| ExtractError::AddressNotMapped { address: va })
    }

    fn read_i32(&self, va: Address) -> Result<i32> {
        let bytes = self.read_bytes(va, 4)?;
        bytes
            .pread_with(0, LE)
            .map_err(|_| ExtractError::AddressNotMapped { address: va })
    }

    fn read_u64(&self, va: Address) -> Result<u64> {
        let bytes = self.read_bytes(va, 8)?;
        bytes
            .pread_with(0, LE)
            .map_err(|_| ExtractError::AddressNotMapped { address: va })
    }

    fn read_cstring(&self, va: Address) -> Result<String> {
        let section = self
            .section_for(va)
            .ok_or(ExtractError::AddressNotMapped { address: va })?;
        let bytes = section.slice_from(va);
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(ExtractError::AddressNotMapped { address: va })?;
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    fn symbol_at(&self, va: Address) -> Option<&str> {
        self.symbols.get(&va).map(String::as_str)
    }

    fn binding_at(&self, va: Address) -> Option<&str> {
        self.bindings.get(&va).map(String::as_str)
    }

    fn symbols_ascending(&self) -> Vec<(Address, &str)> {
        self.symbols.iter().map(|(&a, n)| (a, n.as_str())).collect()
    }
}
