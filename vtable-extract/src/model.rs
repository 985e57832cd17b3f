//! The data model produced by a vtable walk: typeinfo graphs, vftables, and
//! the aggregated per-symbol vtable record.

use std::fmt;

/// A virtual address inside the image being walked.
pub type Address = u64;

/// The physical object file format a loader can expose.
///
/// Only [`FileFormat::MachO`] is implemented; the design leaves room for
/// [`FileFormat::Elf`] without touching the walker itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileFormat {
    /// Mach Objects, used on macOS and iOS.
    MachO,
    /// Executable and Linkable Format, used on Linux. Not yet implemented.
    Elf,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::MachO => "macho",
            FileFormat::Elf => "elf",
        })
    }
}

/// One entry of the Itanium typeinfo tree.
///
/// `name` is the mangled class name with no `_ZTS` prefix synthesized; it is
/// empty only when the image stored a null name pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Typeinfo {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: TypeinfoKind,
}

impl Typeinfo {
    /// Whether this node, or any of its single-inheritance ancestors,
    /// is a virtual/multiple-inheritance node.
    ///
    /// Used by the walker to decide whether to look for secondary vftables;
    /// see the VMI gate in [`crate::walker::get_vtable`].
    pub fn contains_vmi(&self) -> bool {
        match &self.kind {
            TypeinfoKind::Class => false,
            TypeinfoKind::Si { base } => base.as_deref().is_some_and(Typeinfo::contains_vmi),
            TypeinfoKind::Vmi { .. } => true,
        }
    }
}

/// The three Itanium ABI typeinfo shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type"),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum TypeinfoKind {
    /// `__class_type_info`: no base classes.
    Class,
    /// `__si_class_type_info`: single non-virtual public base.
    Si {
        /// Absent when the base typeinfo lives in another image.
        #[cfg_attr(feature = "serde", serde(rename = "base_class"))]
        base: Option<Box<Typeinfo>>,
    },
    /// `__vmi_class_type_info`: virtual and/or multiple inheritance.
    Vmi {
        flags: u32,
        base_count: u32,
        #[cfg_attr(feature = "serde", serde(rename = "base_classes"))]
        bases: Vec<VmiBase>,
    },
}

/// One base class entry of a [`TypeinfoKind::Vmi`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VmiBase {
    /// Absent when the base typeinfo lives in another image.
    pub base: Option<Box<Typeinfo>>,
    /// Low byte of the packed offset-flags field.
    pub flags: u8,
    /// Offset from the subobject to this base, sign-extended.
    pub offset: i64,
}

/// One slot of a vftable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VftableMember {
    /// The method's mangled symbol name, or a binding name such as
    /// `__cxa_pure_virtual` for unresolved pure-virtual slots.
    pub name: String,
}

/// One contiguous run of method pointers within a vtable symbol.
///
/// The slot index within `members` is the method's vtable index; byte offset
/// is `index * pointer_size`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vftable {
    pub members: Vec<VftableMember>,
}

// Serializes as a bare array of method-name strings, per the JSON shape in
// `SPEC_FULL.md` §6, rather than as an array of `{"name": ...}` objects.
#[cfg(feature = "serde")]
impl serde::Serialize for Vftable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.members.iter().map(|member| &member.name))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Vftable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = <Vec<String> as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Vftable {
            members: names.into_iter().map(|name| VftableMember { name }).collect(),
        })
    }
}

impl Vftable {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::ops::Deref for Vftable {
    type Target = [VftableMember];

    fn deref(&self) -> &Self::Target {
        &self.members
    }
}

/// The fully reconstructed vtable for one `_ZTV*` symbol.
///
/// The first entry of `vftables` is the primary vftable; later entries exist
/// only when `typeinfo` contains a VMI node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VtableRecord {
    #[cfg_attr(feature = "serde", serde(rename = "address"))]
    pub addr: Address,
    pub typeinfo: Typeinfo,
    pub vftables: Vec<Vftable>,
    pub pointer_size: u8,
}
