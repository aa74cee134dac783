use crate::target::Target;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// The semantic type of a structure field. Integer and float widths are in
/// bits, matching how `Display` spells them (`i32`, `f64`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    Bool,
    Char,
    Int { signedness: Signedness, width: u32 },
    Float { width: u32 },
    Pointer,
    Array { element: Box<FieldType>, len: u32 },
}

impl FieldType {
    pub fn int(width: u32) -> FieldType {
        FieldType::Int {
            signedness: Signedness::Signed,
            width,
        }
    }

    pub fn uint(width: u32) -> FieldType {
        FieldType::Int {
            signedness: Signedness::Unsigned,
            width,
        }
    }

    pub fn float(width: u32) -> FieldType {
        FieldType::Float { width }
    }

    pub fn array(element: FieldType, len: u32) -> FieldType {
        FieldType::Array {
            element: Box::new(element),
            len,
        }
    }

    pub fn byte_size(&self, target: &Target) -> u32 {
        match self {
            FieldType::Bool | FieldType::Char => 1,
            FieldType::Int { width, .. } | FieldType::Float { width } => width / 8,
            FieldType::Pointer => target.pointer_size,
            FieldType::Array { element, len } => element.byte_size(target) * len,
        }
    }

    /// Alignment the type gets when nothing caps it. Scalars align to their
    /// size up to the target's limit; arrays align like their element.
    pub fn natural_align(&self, target: &Target) -> u32 {
        match self {
            FieldType::Array { element, .. } => element.natural_align(target),
            scalar => scalar.byte_size(target).min(target.max_scalar_align).max(1),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Char => write!(f, "char"),
            FieldType::Int {
                signedness: Signedness::Signed,
                width,
            } => write!(f, "i{}", width),
            FieldType::Int {
                signedness: Signedness::Unsigned,
                width,
            } => write!(f, "u{}", width),
            FieldType::Float { width } => write!(f, "f{}", width),
            FieldType::Pointer => write!(f, "ptr"),
            FieldType::Array { element, len } => write!(f, "[{}; {}]", element, len),
        }
    }
}
