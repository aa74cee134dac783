use crate::error::LayoutError;
use crate::target::Target;
use crate::types::FieldType;
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A power-of-two byte alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Align(u32);

impl Align {
    pub const ONE: Align = Align(1);

    pub fn from_bytes(bytes: u64) -> Result<Align, LayoutError> {
        if !bytes.is_power_of_two() || bytes > u64::from(u32::MAX) {
            return Err(LayoutError::InvalidAlignment(bytes));
        }

        Ok(Align(bytes as u32))
    }

    fn of_natural(bytes: u32) -> Align {
        debug_assert!(bytes.is_power_of_two());
        Align(bytes)
    }

    pub fn bytes(self) -> u32 {
        self.0
    }

    /// Rounds `offset` up to the next multiple of this alignment.
    pub fn align_up(self, offset: u32) -> u32 {
        let mask = self.0 - 1;
        (offset + mask) & !mask
    }

    pub fn is_aligned(self, offset: u32) -> bool {
        offset & (self.0 - 1) == 0
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a structure's fields are aligned: each to its own natural alignment,
/// or capped at a pack value the way `#pragma pack(N)` does it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Packing {
    Natural,
    Pack(Align),
}

impl Packing {
    pub fn pack(value: u64) -> Result<Packing, LayoutError> {
        Ok(Packing::Pack(Align::from_bytes(value)?))
    }

    pub fn effective(self, natural: Align) -> Align {
        match self {
            Packing::Natural => natural,
            Packing::Pack(cap) => natural.min(cap),
        }
    }
}

impl fmt::Display for Packing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packing::Natural => write!(f, "natural"),
            Packing::Pack(cap) => write!(f, "pack({})", cap),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// An ordered list of named fields under one packing policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StructDef {
    name: String,
    packing: Packing,
    fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn new(
        name: &str,
        packing: Packing,
        fields: Vec<(&str, FieldType)>,
    ) -> Result<StructDef, LayoutError> {
        let mut seen = HashSet::new();
        // Upper bound on the cursor for any target: no field aligns past 8
        // bytes, so at most 7 bytes of padding precede it.
        let mut bound: u32 = 0;

        for (field, ty) in &fields {
            if !seen.insert(*field) {
                return Err(LayoutError::DuplicateField {
                    structure: name.to_string(),
                    field: field.to_string(),
                });
            }

            validate_type(name, field, ty)?;

            bound = worst_case_size(ty)
                .and_then(|size| bound.checked_add(MAX_PADDING)?.checked_add(size))
                .ok_or_else(|| LayoutError::TooLarge {
                    structure: name.to_string(),
                    field: field.to_string(),
                })?;
        }

        if let Some((field, _)) = fields.last() {
            if bound.checked_add(MAX_PADDING).is_none() {
                return Err(LayoutError::TooLarge {
                    structure: name.to_string(),
                    field: field.to_string(),
                });
            }
        }

        let fields = fields
            .into_iter()
            .map(|(field, ty)| FieldDef {
                name: field.to_string(),
                ty,
            })
            .collect();

        Ok(StructDef {
            name: name.to_string(),
            packing,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// The same fields under another packing policy.
    pub fn with_packing(&self, packing: Packing) -> StructDef {
        StructDef {
            packing,
            ..self.clone()
        }
    }

    pub fn layout(&self, target: &Target) -> StructLayout {
        compute_layout(self, target)
    }
}

fn validate_type(structure: &str, field: &str, ty: &FieldType) -> Result<(), LayoutError> {
    match ty {
        FieldType::Int { width, .. } if !matches!(width, 8 | 16 | 32 | 64) => {
            Err(LayoutError::UnsupportedWidth {
                structure: structure.to_string(),
                field: field.to_string(),
                width: *width,
            })
        }
        FieldType::Float { width } if !matches!(width, 32 | 64) => {
            Err(LayoutError::UnsupportedWidth {
                structure: structure.to_string(),
                field: field.to_string(),
                width: *width,
            })
        }
        FieldType::Array { len: 0, .. } => Err(LayoutError::ZeroSizedField {
            structure: structure.to_string(),
            field: field.to_string(),
        }),
        FieldType::Array { element, .. } => validate_type(structure, field, element),
        _ => Ok(()),
    }
}

const MAX_PADDING: u32 = 7;

/// Byte size of `ty` with pointers at their largest, `None` past `u32`.
fn worst_case_size(ty: &FieldType) -> Option<u32> {
    match ty {
        FieldType::Pointer => Some(Target::MAX_POINTER_SIZE),
        FieldType::Array { element, len } => worst_case_size(element)?.checked_mul(*len),
        scalar => Some(scalar.byte_size(&Target::X86_64)),
    }
}

/// Size and alignment of one field once the packing policy is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LayoutData {
    byte_size: u32,
    align: Align,
}

impl LayoutData {
    fn of(ty: &FieldType, target: &Target, packing: Packing) -> LayoutData {
        let natural = Align::of_natural(ty.natural_align(target));

        LayoutData {
            byte_size: ty.byte_size(target),
            align: packing.effective(natural),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub name: String,
    pub ty: FieldType,
    pub offset: u32,
    pub size: u32,
    pub align: Align,
    /// Bytes between the end of this field and the start of the next one, or
    /// the end of the structure for the last field.
    pub padding_after: u32,
}

impl FieldLayout {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StructLayout {
    pub name: String,
    pub packing: Packing,
    pub target: Target,
    pub size: u32,
    pub align: Align,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn data_size(&self) -> u32 {
        self.fields.iter().map(|f| f.size).sum()
    }

    pub fn total_padding(&self) -> u32 {
        self.size - self.data_size()
    }
}

/// Places every field of `def` in declaration order.
///
/// Each field starts at the next multiple of its effective alignment
/// (`min(natural, pack)` under a pack policy). The structure aligns to the
/// largest effective field alignment and its size is rounded up to that, so
/// consecutive array elements keep the same field alignment.
pub fn compute_layout(def: &StructDef, target: &Target) -> StructLayout {
    let mut cursor = 0;
    let mut struct_align = Align::ONE;
    let mut fields = Vec::with_capacity(def.fields.len());

    for field in &def.fields {
        let data = LayoutData::of(&field.ty, target, def.packing);
        let offset = data.align.align_up(cursor);

        trace!(
            "{}.{}: {} byte(s) at offset {} (align {}, {} byte(s) of padding before)",
            def.name,
            field.name,
            data.byte_size,
            offset,
            data.align,
            offset - cursor
        );

        fields.push(FieldLayout {
            name: field.name.clone(),
            ty: field.ty.clone(),
            offset,
            size: data.byte_size,
            align: data.align,
            padding_after: 0,
        });

        cursor = offset + data.byte_size;
        struct_align = struct_align.max(data.align);
    }

    let size = struct_align.align_up(cursor);

    for i in 0..fields.len() {
        let next = fields.get(i + 1).map_or(size, |f| f.offset);
        fields[i].padding_after = next - fields[i].end();
    }

    debug!(
        "{} ({}, {}): {} byte(s), align {}",
        def.name, def.packing, target, size, struct_align
    );

    StructLayout {
        name: def.name.clone(),
        packing: def.packing,
        target: *target,
        size,
        align: struct_align,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_fields() -> Vec<(&'static str, FieldType)> {
        vec![
            ("byte1", FieldType::Char),
            ("integer", FieldType::int(32)),
            ("floating", FieldType::float(64)),
            ("byte2", FieldType::Char),
        ]
    }

    fn offsets(layout: &StructLayout) -> Vec<u32> {
        layout.fields.iter().map(|f| f.offset).collect()
    }

    fn paddings(layout: &StructLayout) -> Vec<u32> {
        layout.fields.iter().map(|f| f.padding_after).collect()
    }

    fn check_invariants(layout: &StructLayout) {
        for field in &layout.fields {
            assert!(
                field.align.is_aligned(field.offset),
                "{}.{} is misaligned",
                layout.name,
                field.name
            );
        }

        for pair in layout.fields.windows(2) {
            let gap = pair[1].offset - pair[0].end();
            assert_eq!(gap, pair[0].padding_after);
        }

        assert!(layout.align.is_aligned(layout.size));
        assert_eq!(
            layout.align,
            layout
                .fields
                .iter()
                .map(|f| f.align)
                .max()
                .unwrap_or(Align::ONE)
        );
        assert_eq!(
            layout.size,
            layout.data_size() + layout.fields.iter().map(|f| f.padding_after).sum::<u32>()
                + layout.fields.first().map_or(0, |f| f.offset)
        );
    }

    #[test]
    fn natural_layout_inserts_padding() {
        let def = StructDef::new("DefaultAlignment", Packing::Natural, mixed_fields()).unwrap();
        let layout = def.layout(&Target::X86_64);

        assert_eq!(offsets(&layout), [0, 4, 8, 16]);
        assert_eq!(paddings(&layout), [3, 0, 0, 7]);
        assert_eq!(layout.size, 24);
        assert_eq!(layout.align.bytes(), 8);
        check_invariants(&layout);
    }

    #[test]
    fn pack_one_removes_all_padding() {
        let def = StructDef::new("Packed", Packing::pack(1).unwrap(), mixed_fields()).unwrap();
        let layout = def.layout(&Target::X86_64);

        assert_eq!(offsets(&layout), [0, 1, 5, 13]);
        assert_eq!(paddings(&layout), [0, 0, 0, 0]);
        assert_eq!(layout.size, 14);
        assert_eq!(layout.size, layout.data_size());
        assert_eq!(layout.align, Align::ONE);
        check_invariants(&layout);
    }

    #[test]
    fn largest_first_is_smaller_only_without_packing() {
        let reordered = vec![
            ("floating", FieldType::float(64)),
            ("integer", FieldType::int(32)),
            ("byte1", FieldType::Char),
            ("byte2", FieldType::Char),
        ];

        let unordered = StructDef::new("Unordered", Packing::Natural, mixed_fields()).unwrap();
        let ordered = StructDef::new("Ordered", Packing::Natural, reordered).unwrap();

        let target = Target::X86_64;
        let ordered_layout = ordered.layout(&target);
        assert_eq!(ordered_layout.size, 16);
        assert_eq!(offsets(&ordered_layout), [0, 8, 12, 13]);
        assert!(ordered_layout.size < unordered.layout(&target).size);

        let pack = Packing::pack(1).unwrap();
        assert_eq!(
            ordered.with_packing(pack).layout(&target).size,
            unordered.with_packing(pack).layout(&target).size
        );
    }

    #[test]
    fn pack_caps_field_alignment() {
        let fields = vec![
            ("byte1", FieldType::Char),
            ("integer", FieldType::int(32)),
            ("floating", FieldType::float(64)),
            ("byte2", FieldType::Char),
            ("short_value", FieldType::int(16)),
        ];
        let def = StructDef::new("Capped", Packing::Natural, fields).unwrap();
        let target = Target::X86_64;

        let two = def.with_packing(Packing::pack(2).unwrap()).layout(&target);
        assert_eq!(offsets(&two), [0, 2, 6, 14, 16]);
        assert_eq!(two.size, 18);
        check_invariants(&two);

        let four = def.with_packing(Packing::pack(4).unwrap()).layout(&target);
        assert_eq!(offsets(&four), [0, 4, 8, 16, 18]);
        assert_eq!(four.size, 20);
        check_invariants(&four);

        // A cap above every natural alignment changes nothing.
        let sixteen = def.with_packing(Packing::pack(16).unwrap()).layout(&target);
        let natural = def.layout(&target);
        assert_eq!(offsets(&sixteen), offsets(&natural));
        assert_eq!(sixteen.size, natural.size);
    }

    #[test]
    fn layout_depends_on_the_target() {
        let def = StructDef::new("DefaultAlignment", Packing::Natural, mixed_fields()).unwrap();

        let i686 = def.layout(&Target::I686);
        assert_eq!(offsets(&i686), [0, 4, 8, 16]);
        assert_eq!(i686.size, 20);

        let arm = def.layout(&Target::ARM);
        assert_eq!(arm.size, 24);

        let pointers = StructDef::new(
            "Node",
            Packing::Natural,
            vec![("tag", FieldType::Char), ("next", FieldType::Pointer)],
        )
        .unwrap();
        assert_eq!(pointers.layout(&Target::X86_64).size, 16);
        assert_eq!(pointers.layout(&Target::ARM).size, 8);
    }

    #[test]
    fn computing_twice_gives_the_same_layout() {
        let def = StructDef::new("Twice", Packing::Natural, mixed_fields()).unwrap();

        assert_eq!(def.layout(&Target::X86_64), def.layout(&Target::X86_64));
    }

    #[test]
    fn empty_structure_has_no_size() {
        let def = StructDef::new("Empty", Packing::Natural, vec![]).unwrap();
        let layout = def.layout(&Target::X86_64);

        assert_eq!(layout.size, 0);
        assert_eq!(layout.align, Align::ONE);
    }

    #[test]
    fn synthetic_definitions_keep_the_invariants() {
        let types = [
            FieldType::Bool,
            FieldType::int(16),
            FieldType::float(64),
            FieldType::array(FieldType::Char, 3),
            FieldType::uint(32),
            FieldType::Pointer,
            FieldType::int(8),
            FieldType::array(FieldType::int(16), 5),
        ];
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];

        for start in 0..types.len() {
            let fields = (0..types.len())
                .map(|i| (names[i], types[(start + i) % types.len()].clone()))
                .collect::<Vec<_>>();

            for packing in [
                Packing::Natural,
                Packing::pack(1).unwrap(),
                Packing::pack(2).unwrap(),
                Packing::pack(4).unwrap(),
                Packing::pack(8).unwrap(),
            ] {
                let def = StructDef::new("Synthetic", packing, fields.clone()).unwrap();

                for target in Target::ALL {
                    let layout = def.layout(&target);
                    check_invariants(&layout);

                    if packing == Packing::pack(1).unwrap() {
                        assert_eq!(layout.total_padding(), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn pack_value_must_be_a_power_of_two() {
        for value in [0, 3, 6, 12, 100] {
            assert!(matches!(
                Packing::pack(value),
                Err(LayoutError::InvalidAlignment(v)) if v == value
            ));
        }

        for value in [1, 2, 4, 8, 16] {
            assert!(Packing::pack(value).is_ok());
        }
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let duplicate = StructDef::new(
            "Twice",
            Packing::Natural,
            vec![("a", FieldType::Char), ("a", FieldType::int(32))],
        );
        assert!(matches!(duplicate, Err(LayoutError::DuplicateField { field, .. }) if field == "a"));

        let empty_array = StructDef::new(
            "Empty",
            Packing::Natural,
            vec![("payload", FieldType::array(FieldType::Char, 0))],
        );
        assert!(matches!(empty_array, Err(LayoutError::ZeroSizedField { .. })));

        let odd_int = StructDef::new("Odd", Packing::Natural, vec![("x", FieldType::int(24))]);
        assert!(matches!(
            odd_int,
            Err(LayoutError::UnsupportedWidth { width: 24, .. })
        ));

        let odd_float = StructDef::new(
            "Odd",
            Packing::Natural,
            vec![("x", FieldType::array(FieldType::float(16), 2))],
        );
        assert!(matches!(
            odd_float,
            Err(LayoutError::UnsupportedWidth { width: 16, .. })
        ));
    }

    #[test]
    fn oversized_definitions_are_rejected() {
        let huge_array = StructDef::new(
            "Big",
            Packing::Natural,
            vec![
                ("tag", FieldType::Char),
                ("data", FieldType::array(FieldType::uint(64), 1 << 30)),
            ],
        );
        assert!(matches!(
            huge_array,
            Err(LayoutError::TooLarge { field, .. }) if field == "data"
        ));

        let nested = StructDef::new(
            "Nested",
            Packing::pack(1).unwrap(),
            vec![(
                "grid",
                FieldType::array(FieldType::array(FieldType::Pointer, 1 << 16), 1 << 16),
            )],
        );
        assert!(matches!(nested, Err(LayoutError::TooLarge { .. })));

        // Each field fits, the running total does not.
        let halves = StructDef::new(
            "Halves",
            Packing::Natural,
            vec![
                ("a", FieldType::array(FieldType::Char, 1 << 31)),
                ("b", FieldType::array(FieldType::Char, 1 << 31)),
            ],
        );
        assert!(matches!(
            halves,
            Err(LayoutError::TooLarge { field, .. }) if field == "b"
        ));
    }

    #[test]
    fn largest_accepted_definition_lays_out() {
        let def = StructDef::new(
            "Large",
            Packing::Natural,
            vec![
                ("tag", FieldType::Char),
                ("data", FieldType::array(FieldType::uint(64), (1 << 28) - 2)),
            ],
        )
        .unwrap();

        for target in Target::ALL {
            let layout = def.layout(&target);
            check_invariants(&layout);
            assert_eq!(layout.field("data").unwrap().size, ((1 << 28) - 2) * 8);
        }
    }

    #[test]
    fn align_up_rounds_to_the_next_multiple() {
        let eight = Align::from_bytes(8).unwrap();

        assert_eq!(eight.align_up(0), 0);
        assert_eq!(eight.align_up(1), 8);
        assert_eq!(eight.align_up(8), 8);
        assert_eq!(eight.align_up(9), 16);
        assert_eq!(Align::ONE.align_up(13), 13);
    }
}
