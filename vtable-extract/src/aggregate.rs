//! Driving the walker over every `_ZTV*` symbol in an image.

use tracing::warn;

use crate::error::Result;
use crate::image::ImageAccessor;
use crate::model::VtableRecord;
use crate::walker::get_vtable;

/// The Itanium mangled-name prefix for a vtable symbol.
const VTABLE_SYMBOL_PREFIX: &str = "_ZTV";

/// Walks every `_ZTV*` symbol in `img` and returns the reconstructed
/// records, in ascending address order.
///
/// When `best_effort` is `false`, the first failing symbol aborts the whole
/// walk. When `true`, a failing symbol is logged at `warn` level and
/// skipped, so a single malformed or partially-stripped vtable does not
/// prevent extracting the rest of the image.
pub fn extract_all(img: &impl ImageAccessor, best_effort: bool) -> Result<Vec<VtableRecord>> {
    let mut records = Vec::new();

    for (addr, name) in img.symbols_ascending() {
        if !name.starts_with(VTABLE_SYMBOL_PREFIX) {
            continue;
        }

        match get_vtable(img, addr) {
            Ok(record) => records.push(record),
            Err(err) if best_effort => {
                warn!("skipping vtable {name} at {addr:#x}: {err}");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(records)
}
