//! Recursive decoder for Itanium ABI typeinfo records.

use crate::error::{ExtractError, Result};
use crate::image::ImageAccessor;
use crate::model::{Address, Typeinfo, TypeinfoKind, VmiBase};

/// Which of the three Itanium typeinfo layouts a record at a given address
/// uses, as determined by the suffix of its binding name.
enum TypeinfoClass {
    Class,
    Si,
    Vmi,
}

fn classify(binding: &str, va: Address) -> Result<TypeinfoClass> {
    if binding.ends_with("__class_type_infoE") {
        Ok(TypeinfoClass::Class)
    } else if binding.ends_with("__si_class_type_infoE") {
        Ok(TypeinfoClass::Si)
    } else if binding.ends_with("__vmi_class_type_infoE") {
        Ok(TypeinfoClass::Vmi)
    } else {
        Err(ExtractError::UnknownTypeinfoClass {
            address: va,
            binding: binding.to_owned(),
        })
    }
}

/// Parses exactly one typeinfo record rooted at `va`, recursing into base
/// typeinfos when present.
///
/// A failure while descending into a base (most commonly because that base's
/// typeinfo lives in another image) is swallowed here: the base is recorded
/// as absent rather than failing this call. See `§7` of the design for the
/// rationale.
pub fn parse_typeinfo(img: &impl ImageAccessor, va: Address) -> Result<Typeinfo> {
    let p = u64::from(img.pointer_size());

    let binding = img
        .binding_at(va)
        .ok_or(ExtractError::MissingTypeinfoBinding { address: va })?;
    let class = classify(binding, va)?;

    let name_ptr = img.read_ptr(va + p)?;
    let name = if name_ptr == 0 {
        String::new()
    } else {
        img.read_cstring(name_ptr)?
    };

    let kind = match class {
        TypeinfoClass::Class => TypeinfoKind::Class,
        TypeinfoClass::Si => {
            let base_ptr = img.read_ptr(va + 2 * p)?;
            let base = if base_ptr == 0 {
                None
            } else {
                parse_typeinfo(img, base_ptr).ok().map(Box::new)
            };
            TypeinfoKind::Si { base }
        }
        TypeinfoClass::Vmi => {
            let flags = img.read_u32(va + 2 * p)?;
            let base_count = img.read_u32(va + 3 * p)?;

            let mut bases = Vec::with_capacity(base_count as usize);
            for i in 0..u64::from(base_count) {
                let base_ptr = img.read_ptr(va + (4 + 2 * i) * p)?;
                let base = parse_typeinfo(img, base_ptr).ok().map(Box::new);

                // §4.3: the ABI defines this field as `long`, which would be
                // 8 bytes wide on 64-bit images. We read 32 bits unconditionally
                // to match the reference implementation's behavior; a wide
                // mode should only be enabled once validated against 64-bit
                // fixtures (see `VmiOffsetWidth`).
                let packed = img.read_i32(va + (5 + 2 * i) * p)?;
                bases.push(VmiBase {
                    base,
                    flags: (packed & 0xFF) as u8,
                    offset: i64::from(packed >> 8),
                });
            }

            TypeinfoKind::Vmi {
                flags,
                base_count,
                bases,
            }
        }
    };

    Ok(Typeinfo { name, kind })
}
