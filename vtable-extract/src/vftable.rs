//! Slicing a dense run of method pointers into a [`Vftable`].

use crate::image::ImageAccessor;
use crate::model::{Address, Vftable, VftableMember};

/// An idle entry placed at the head of the lazy-binding stubs region; never
/// a real vftable slot.
const DYLD_STUB_BINDER: &str = "dyld_stub_binder";

/// Consumes consecutive pointer-sized slots at `va` as method entries, per
/// the per-slot decision table in `§4.4`.
///
/// Returns the collected members together with a `continue` flag: `true`
/// means the caller may look for another vftable immediately following this
/// one (the region ended because no slot decoded, not because another
/// labeled structure began).
pub fn get_methods_of_vftable(
    img: &impl ImageAccessor,
    va: Address,
) -> crate::error::Result<(Vftable, bool)> {
    let p = u64::from(img.pointer_size());
    let mut members = Vec::new();
    let mut addr = va;

    loop {
        if img.symbol_at(addr).is_some() {
            return Ok((Vftable { members }, false));
        }

        let slot_value = img.read_ptr(addr)?;
        if let Some(name) = img.symbol_at(slot_value) {
            if name != DYLD_STUB_BINDER {
                members.push(VftableMember {
                    name: name.to_owned(),
                });
                addr += p;
                continue;
            }
        }

        if let Some(name) = img.binding_at(addr) {
            members.push(VftableMember {
                name: name.to_owned(),
            });
            addr += p;
            continue;
        }

        return Ok((Vftable { members }, true));
    }
}
