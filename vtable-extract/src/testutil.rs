//! An in-memory [`ImageAccessor`] used only by unit tests.
//!
//! Real Mach-O fixtures are tedious to hand-assemble and brittle to keep in
//! sync with the walker; `FakeImage` instead lets a test describe a typeinfo
//! graph or vtable layout directly in terms of the Itanium ABI record shapes
//! the walker decodes.

use std::collections::BTreeMap;

use crate::error::{ExtractError, Result};
use crate::image::ImageAccessor;
use crate::model::{Address, FileFormat};

/// One slot of a vtable built with [`FakeImage::push_vtable`].
pub enum VtableSlot<'a> {
    /// A resolved method, given its mangled symbol name.
    Method(&'a str),
    /// A slot bound to `__cxa_pure_virtual` rather than a defined method.
    PureVirtual,
    /// A slot bound to the dyld stub binder stand-in, which must never be
    /// mistaken for a real method.
    DyldStubBinder,
}

pub struct FakeImage {
    pointer_size: u8,
    memory: Vec<u8>,
    symbols: BTreeMap<Address, String>,
    bindings: BTreeMap<Address, String>,
    next_fn_addr: Address,
}

impl FakeImage {
    pub fn new(pointer_size: u8) -> Self {
        assert!(pointer_size == 4 || pointer_size == 8);
        FakeImage {
            pointer_size,
            memory: Vec::new(),
            symbols: BTreeMap::new(),
            bindings: BTreeMap::new(),
            next_fn_addr: 0x9000_0000,
        }
    }

    fn p(&self) -> u64 {
        u64::from(self.pointer_size)
    }

    fn alloc(&mut self, bytes: usize) -> Address {
        let addr = self.memory.len() as Address;
        self.memory.resize(self.memory.len() + bytes, 0);
        addr
    }

    fn write_bytes(&mut self, at: Address, bytes: &[u8]) {
        let at = at as usize;
        self.memory[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn write_ptr(&mut self, at: Address, value: u64) {
        match self.pointer_size {
            4 => self.write_bytes(at, &(value as u32).to_le_bytes()),
            8 => self.write_bytes(at, &value.to_le_bytes()),
            _ => unreachable!(),
        }
    }

    fn write_u32(&mut self, at: Address, value: u32) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    fn write_i32(&mut self, at: Address, value: i32) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    fn write_cstring(&mut self, s: &str) -> Address {
        let addr = self.memory.len() as Address;
        self.memory.extend_from_slice(s.as_bytes());
        self.memory.push(0);
        addr
    }

    fn bind(&mut self, va: Address, suffix: &str) {
        self.bindings.insert(va, suffix.to_string());
    }

    /// Appends a `__class_type_info` record and returns its address.
    pub fn push_class_typeinfo(&mut self, name: &str) -> Address {
        let p = self.p();
        let va = self.alloc(2 * p as usize);
        self.bind(va, "__class_type_infoE");
        self.symbols.insert(va, format!("_ZTI{name}"));
        let name_addr = self.write_cstring(name);
        self.write_ptr(va + p, name_addr);
        va
    }

    /// Appends a `__class_type_info` record with a null name pointer, as an
    /// anonymous typeinfo would encode it.
    pub fn push_anonymous_class_typeinfo(&mut self) -> Address {
        let p = self.p();
        let va = self.alloc(2 * p as usize);
        self.bind(va, "__class_type_infoE");
        self.symbols.insert(va, "_ZTI".to_string());
        self.write_ptr(va + p, 0);
        va
    }

    /// Appends a `__si_class_type_info` record and returns its address.
    pub fn push_si_typeinfo(&mut self, name: &str, base: Option<Address>) -> Address {
        let p = self.p();
        let va = self.alloc(3 * p as usize);
        self.bind(va, "__si_class_type_infoE");
        self.symbols.insert(va, format!("_ZTI{name}"));
        let name_addr = self.write_cstring(name);
        self.write_ptr(va + p, name_addr);
        self.write_ptr(va + 2 * p, base.unwrap_or(0));
        va
    }

    /// Appends a `__vmi_class_type_info` record with the given `(base,
    /// flags, offset)` entries and returns its address.
    pub fn push_vmi_typeinfo(&mut self, name: &str, bases: &[(Option<Address>, u8, i64)]) -> Address {
        let p = self.p();
        let count = bases.len() as u64;
        let va = self.alloc(((4 + 2 * count) * p) as usize);
        self.bind(va, "__vmi_class_type_infoE");
        self.symbols.insert(va, format!("_ZTI{name}"));
        let name_addr = self.write_cstring(name);
        self.write_ptr(va + p, name_addr);
        self.write_u32(va + 2 * p, 0);
        self.write_u32(va + 3 * p, count as u32);
        for (i, (base, flags, offset)) in bases.iter().enumerate() {
            let i = i as u64;
            self.write_ptr(va + (4 + 2 * i) * p, base.unwrap_or(0));
            let packed = ((*offset as i32) << 8) | i32::from(*flags);
            self.write_i32(va + (5 + 2 * i) * p, packed);
        }
        va
    }

    /// Appends a record that is bound under `suffix` but whose name pointer
    /// is deliberately dangling, simulating a typeinfo whose class name and
    /// further fields live in another image.
    pub fn push_unmapped_typeinfo_binding(&mut self, suffix: &str) -> Address {
        let p = self.p();
        let va = self.alloc(2 * p as usize);
        self.bind(va, suffix);
        self.write_ptr(va + p, 0xFFFF_FFFF_0000);
        va
    }

    /// Registers a synthetic function address under `name`, without backing
    /// memory (the walker only ever needs its symbol name, never its bytes).
    pub fn push_method(&mut self, name: &str) -> Address {
        let addr = self.next_fn_addr;
        self.next_fn_addr += 0x10;
        self.symbols.insert(addr, name.to_string());
        addr
    }

    /// Appends a single vtable (offset-to-top, typeinfo pointer, then
    /// `slots`) labeled with `symbol_name`, and returns its base address.
    pub fn push_vtable(&mut self, symbol_name: &str, typeinfo_va: Address, slots: &[VtableSlot]) -> Address {
        self.push_multi_vtable(symbol_name, &[(typeinfo_va, slots)])
    }

    /// Appends several vtable parts back to back with no gap, as a VMI type
    /// lays out its primary vftable immediately followed by secondary
    /// vftables. Only the first part is labeled with `symbol_name`.
    pub fn push_multi_vtable(&mut self, symbol_name: &str, parts: &[(Address, &[VtableSlot])]) -> Address {
        let p = self.p();
        let mut base_of_whole = None;

        for (typeinfo_va, slots) in parts {
            let part_base = self.alloc(((2 + slots.len()) as u64 * p) as usize);
            self.write_ptr(part_base, 0);
            self.write_ptr(part_base + p, *typeinfo_va);

            let mut addr = part_base + 2 * p;
            for slot in *slots {
                match slot {
                    VtableSlot::Method(name) => {
                        let fn_addr = self.push_method(name);
                        self.write_ptr(addr, fn_addr);
                    }
                    VtableSlot::PureVirtual => {
                        self.bind(addr, "__cxa_pure_virtual");
                        self.write_ptr(addr, 0);
                    }
                    VtableSlot::DyldStubBinder => {
                        let fn_addr = self.push_method("dyld_stub_binder");
                        self.write_ptr(addr, fn_addr);
                    }
                }
                addr += p;
            }

            base_of_whole.get_or_insert(part_base);
        }

        let base = base_of_whole.expect("push_multi_vtable requires at least one part");
        self.symbols.insert(base, symbol_name.to_string());
        base
    }

    /// Labels `va` directly, without allocating or writing anything there.
    /// Used to construct alignment-anomaly fixtures.
    pub fn push_symbol_at(&mut self, va: Address, name: &str) {
        self.symbols.insert(va, name.to_string());
    }
}

impl ImageAccessor for FakeImage {
    fn pointer_size(&self) -> u8 {
        self.pointer_size
    }

    fn format(&self) -> FileFormat {
        FileFormat::MachO
    }

    fn read_u32(&self, va: Address) -> Result<u32> {
        let bytes = self.read_bytes(va, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_i32(&self, va: Address) -> Result<i32> {
        self.read_u32(va).map(|v| v as i32)
    }

    fn read_u64(&self, va: Address) -> Result<u64> {
        let bytes = self.read_bytes(va, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_cstring(&self, va: Address) -> Result<String> {
        let start = va as usize;
        let bytes = self
            .memory
            .get(start..)
            .ok_or(ExtractError::AddressNotMapped { address: va })?;
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

impl FakeImage {
    fn read_bytes(&self, va: Address, len: usize) -> Result<&[u8]> {
        let start = va as usize;
        self.memory
            .get(start..start + len)
            .ok_or(ExtractError::AddressNotMapped { address: va })
    }
}
