//! Reconstructing one `_ZTV*` symbol into a full [`VtableRecord`].

use crate::error::{ExtractError, Result};
use crate::image::ImageAccessor;
use crate::model::{Address, Typeinfo, VtableRecord};
use crate::typeinfo::parse_typeinfo;
use crate::vftable::get_methods_of_vftable;

/// The Itanium mangled-name prefix for a typeinfo symbol.
const TYPEINFO_SYMBOL_PREFIX: &str = "_ZTI";

/// Scans forward from `va` one pointer-sized slot at a time until a slot's
/// value resolves to a `_ZTI*` symbol, then parses the typeinfo rooted
/// there.
///
/// Returns the parsed typeinfo together with the address immediately after
/// the scanned typeinfo pointer slot — the start of the vftable that
/// follows it.
///
/// Fails with [`ExtractError::VftableAlignmentAnomaly`] if the scan itself
/// walks onto an address that already carries an unrelated symbol; that
/// indicates the image is not laid out the way this heuristic assumes.
pub fn find_typeinfo(img: &impl ImageAccessor, va: Address) -> Result<(Typeinfo, Address)> {
    let p = u64::from(img.pointer_size());
    let mut addr = va;

    loop {
        if img.symbol_at(addr).is_some() {
            return Err(ExtractError::VftableAlignmentAnomaly { address: addr });
        }

        let candidate = img.read_ptr(addr)?;
        if let Some(name) = img.symbol_at(candidate) {
            if name.starts_with(TYPEINFO_SYMBOL_PREFIX) {
                let typeinfo = parse_typeinfo(img, candidate)?;
                return Ok((typeinfo, addr + p));
            }
        }

        addr += p;
    }
}

/// Reconstructs the full vtable rooted at `symbol_va`, including any
/// secondary vftables for virtual or multiple inheritance.
///
/// `symbol_va` is the address of the `_ZTV*` symbol itself (the
/// offset-to-top field); the typeinfo pointer that follows it is located
/// via [`find_typeinfo`].
pub fn get_vtable(img: &impl ImageAccessor, symbol_va: Address) -> Result<VtableRecord> {
    let p = u64::from(img.pointer_size());

    let (typeinfo, first_vftable_va) = find_typeinfo(img, symbol_va + p)?;
    let (primary, mut cont) = get_methods_of_vftable(img, first_vftable_va)?;
    let mut cursor = first_vftable_va + (primary.len() as u64) * p;
    let mut vftables = vec![primary];

    if typeinfo.contains_vmi() {
        while cont {
            let next = find_typeinfo(img, cursor).and_then(|(_, vftable_va)| {
                get_methods_of_vftable(img, vftable_va).map(|(vft, c)| (vftable_va, vft, c))
            });
            match next {
                Ok((vftable_va, vftable, next_cont)) => {
                    cursor = vftable_va + (vftable.len() as u64) * p;
                    cont = next_cont;
                    vftables.push(vftable);
                }
                Err(_) => break,
            }
        }
    }

    Ok(VtableRecord {
        addr: symbol_va,
        typeinfo,
        vftables,
        pointer_size: p as u8,
    })
}
