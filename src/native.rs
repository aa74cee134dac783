//! Rust declarations of the catalog structures with the representation each
//! one asks for. `#[repr(C, packed(N))]` caps field alignment at `N` exactly
//! like `#pragma pack(N)`, so the compiler's layout of these types is the
//! reference the computed layouts are checked against.
//!
//! C `char` is spelled `u8` and `bool` is Rust's one-byte `bool`.

use std::mem;
use std::ptr;

#[repr(C)]
#[derive(Default)]
pub struct DefaultAlignment {
    pub byte1: u8,
    pub integer: i32,
    pub floating: f64,
    pub byte2: u8,
}

#[repr(C)]
#[derive(Default)]
pub struct OptimizedAlignment {
    pub floating: f64,
    pub integer: i32,
    pub byte1: u8,
    pub byte2: u8,
}

#[repr(C, packed)]
#[derive(Default)]
pub struct PackedStruct {
    pub byte1: u8,
    pub integer: i32,
    pub floating: f64,
    pub byte2: u8,
    pub short_value: i16,
}

#[repr(C, packed(2))]
#[derive(Default)]
pub struct TwoByteAligned {
    pub byte1: u8,
    pub integer: i32,
    pub floating: f64,
    pub byte2: u8,
    pub short_value: i16,
}

#[repr(C, packed(4))]
#[derive(Default)]
pub struct FourByteAligned {
    pub byte1: u8,
    pub integer: i32,
    pub floating: f64,
    pub byte2: u8,
    pub short_value: i16,
}

#[repr(C, packed)]
#[derive(Default)]
pub struct NetworkHeader {
    pub version: u8,
    pub kind: u8,
    pub length: u16,
    pub sequence: u32,
    pub checksum: u32,
    pub payload: [u8; 16],
}

#[repr(C, packed)]
#[derive(Default)]
pub struct BitmapHeader {
    pub signature: u16,
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    pub data_offset: u32,
    pub header_size: u32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Default)]
pub struct MixedTypes {
    pub flag1: bool,
    pub value1: f64,
    pub flag2: u8,
    pub value2: i16,
    pub value3: i64,
    pub array: [u8; 3],
}

#[repr(C, packed)]
#[derive(Default)]
pub struct MixedTypesPacked {
    pub flag1: bool,
    pub value1: f64,
    pub flag2: u8,
    pub value2: i16,
    pub value3: i64,
    pub array: [u8; 3],
}

#[repr(C, packed(4))]
#[derive(Default)]
pub struct ARMOptimized {
    pub arm_register: u32,
    pub status_flags: u16,
    pub data_pointer: u32,
    pub buffer: [u8; 8],
}

#[repr(C)]
#[derive(Default)]
pub struct X86Optimized {
    pub register64: u64,
    pub register32: u32,
    pub flags: u16,
    pub buffer: [u8; 8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeField {
    pub name: &'static str,
    pub offset: usize,
    pub address: usize,
}

/// What the compiler did with one of the declarations above, observed on a
/// live instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub base: usize,
    pub fields: Vec<NativeField>,
}

impl NativeLayout {
    pub fn field(&self, name: &str) -> Option<&NativeField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// Field addresses go through `addr_of!` so no reference to a packed field is
// ever created.
macro_rules! native_layouts {
    ($($ty:ident { $($field:ident),* $(,)? })*) => {
        pub const NAMES: &[&str] = &[$(stringify!($ty)),*];

        /// Builds an instance of the named structure and records where its
        /// fields live. `None` for names without a native declaration.
        pub fn probe(name: &str) -> Option<NativeLayout> {
            match name {
                $(stringify!($ty) => {
                    let value = $ty::default();
                    let base = ptr::addr_of!(value) as usize;

                    Some(NativeLayout {
                        name: stringify!($ty),
                        size: mem::size_of::<$ty>(),
                        align: mem::align_of::<$ty>(),
                        base,
                        fields: vec![$(NativeField {
                            name: stringify!($field),
                            offset: mem::offset_of!($ty, $field),
                            address: ptr::addr_of!(value.$field) as usize,
                        }),*],
                    })
                })*
                _ => None,
            }
        }
    };
}

native_layouts! {
    DefaultAlignment { byte1, integer, floating, byte2 }
    OptimizedAlignment { floating, integer, byte1, byte2 }
    PackedStruct { byte1, integer, floating, byte2, short_value }
    TwoByteAligned { byte1, integer, floating, byte2, short_value }
    FourByteAligned { byte1, integer, floating, byte2, short_value }
    NetworkHeader { version, kind, length, sequence, checksum, payload }
    BitmapHeader {
        signature, file_size, reserved1, reserved2,
        data_offset, header_size, width, height,
    }
    MixedTypes { flag1, value1, flag2, value2, value3, array }
    MixedTypesPacked { flag1, value1, flag2, value2, value3, array }
    ARMOptimized { arm_register, status_flags, data_pointer, buffer }
    X86Optimized { register64, register32, flags, buffer }
}
