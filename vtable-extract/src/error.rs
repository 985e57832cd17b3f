use thiserror::Error;

use crate::model::Address;

/// An error raised while walking an image for vtables and typeinfo.
///
/// Every variant that names an address reports it in hex, as required for
/// user-visible failure messages.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The image does not specify a 4- or 8-byte pointer width.
    #[error("unsupported pointer width")]
    UnsupportedPointerWidth,

    /// The loader does not expose the metadata this format needs (for
    /// example, dyld bindings on a non Mach-O image).
    #[error("unsupported binary format")]
    UnsupportedFormat,

    /// A read landed outside of any section covered by the image.
    #[error("address {address:#x} is not mapped in the image")]
    AddressNotMapped { address: Address },

    /// A typeinfo record's address had no binding, so its ABI class could
    /// not be determined.
    #[error("no typeinfo binding at address {address:#x}")]
    MissingTypeinfoBinding { address: Address },

    /// A typeinfo record's binding name did not match any of the three
    /// recognized Itanium ABI typeinfo classes.
    #[error("unrecognized typeinfo class `{binding}` at address {address:#x}")]
    UnknownTypeinfoClass { address: Address, binding: String },

    /// The scan for a secondary typeinfo pointer ran into a labeled symbol
    /// before finding a `_ZTI*` reference.
    #[error("vftable alignment anomaly while scanning from address {address:#x}")]
    VftableAlignmentAnomaly { address: Address },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
