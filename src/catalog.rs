use crate::error::LayoutError;
use crate::layout::{Packing, StructDef};
use crate::types::FieldType;

/// One summary line of the report: a label and the structure it measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub label: &'static str,
    pub structure: &'static str,
}

impl Entry {
    pub fn new(label: &'static str, structure: &'static str) -> Entry {
        Entry { label, structure }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub entries: Vec<Entry>,
}

pub struct Catalog {
    pub structs: Vec<StructDef>,
    pub sections: Vec<Section>,
}

impl Catalog {
    /// Structure whose live field addresses are printed.
    pub const ADDRESS_DEMO: &'static str = "NetworkHeader";

    /// Structure whose inter-field padding is broken down.
    pub const PADDING_DEMO: &'static str = "DefaultAlignment";

    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name() == name)
    }

    pub fn standard() -> Result<Catalog, LayoutError> {
        use FieldType::{Bool, Char};

        let int = FieldType::int(32);
        let short = FieldType::int(16);
        let long_long = FieldType::int(64);
        let double = FieldType::float(64);
        let u8_t = FieldType::uint(8);
        let u16_t = FieldType::uint(16);
        let u32_t = FieldType::uint(32);
        let u64_t = FieldType::uint(64);

        let pack1 = Packing::pack(1)?;
        let pack2 = Packing::pack(2)?;
        let pack4 = Packing::pack(4)?;

        let mixed = |short_value: &'static str| {
            vec![
                ("byte1", Char),
                ("integer", int.clone()),
                ("floating", double.clone()),
                ("byte2", Char),
                (short_value, short.clone()),
            ]
        };

        let mixed_types = vec![
            ("flag1", Bool),
            ("value1", double.clone()),
            ("flag2", Char),
            ("value2", short.clone()),
            ("value3", long_long),
            ("array", FieldType::array(Char, 3)),
        ];

        let structs = vec![
            StructDef::new(
                "DefaultAlignment",
                Packing::Natural,
                vec![
                    ("byte1", Char),
                    ("integer", int.clone()),
                    ("floating", double.clone()),
                    ("byte2", Char),
                ],
            )?,
            StructDef::new(
                "OptimizedAlignment",
                Packing::Natural,
                vec![
                    ("floating", double.clone()),
                    ("integer", int.clone()),
                    ("byte1", Char),
                    ("byte2", Char),
                ],
            )?,
            StructDef::new("PackedStruct", pack1, mixed("short_value"))?,
            StructDef::new("TwoByteAligned", pack2, mixed("short_value"))?,
            StructDef::new("FourByteAligned", pack4, mixed("short_value"))?,
            StructDef::new(
                "NetworkHeader",
                pack1,
                vec![
                    ("version", u8_t.clone()),
                    ("kind", u8_t),
                    ("length", u16_t.clone()),
                    ("sequence", u32_t.clone()),
                    ("checksum", u32_t.clone()),
                    ("payload", FieldType::array(Char, 16)),
                ],
            )?,
            StructDef::new(
                "BitmapHeader",
                pack1,
                vec![
                    ("signature", u16_t.clone()),
                    ("file_size", u32_t.clone()),
                    ("reserved1", u16_t.clone()),
                    ("reserved2", u16_t.clone()),
                    ("data_offset", u32_t.clone()),
                    ("header_size", u32_t.clone()),
                    ("width", u32_t.clone()),
                    ("height", u32_t.clone()),
                ],
            )?,
            StructDef::new("MixedTypes", Packing::Natural, mixed_types.clone())?,
            StructDef::new("MixedTypesPacked", pack1, mixed_types)?,
            StructDef::new(
                "ARMOptimized",
                pack4,
                vec![
                    ("arm_register", u32_t.clone()),
                    ("status_flags", u16_t.clone()),
                    ("data_pointer", u32_t.clone()),
                    ("buffer", FieldType::array(Char, 8)),
                ],
            )?,
            StructDef::new(
                "X86Optimized",
                Packing::Natural,
                vec![
                    ("register64", u64_t),
                    ("register32", u32_t),
                    ("flags", u16_t),
                    ("buffer", FieldType::array(Char, 8)),
                ],
            )?,
        ];

        let sections = vec![
            Section {
                title: "DEFAULT VS OPTIMIZED ALIGNMENT",
                entries: vec![
                    Entry::new("DefaultAlignment", "DefaultAlignment"),
                    Entry::new("OptimizedAlignment", "OptimizedAlignment"),
                ],
            },
            Section {
                title: "DIFFERENT PACK VALUES",
                entries: vec![
                    Entry::new("No pack (default)", "DefaultAlignment"),
                    Entry::new("pack(1)", "PackedStruct"),
                    Entry::new("pack(2)", "TwoByteAligned"),
                    Entry::new("pack(4)", "FourByteAligned"),
                ],
            },
            Section {
                title: "PRACTICAL EXAMPLES",
                entries: vec![
                    Entry::new("NetworkHeader pack(1)", "NetworkHeader"),
                    Entry::new("BitmapHeader pack(1)", "BitmapHeader"),
                ],
            },
            Section {
                title: "MIXED TYPES COMPARISON",
                entries: vec![
                    Entry::new("MixedTypes (default)", "MixedTypes"),
                    Entry::new("MixedTypesPacked", "MixedTypesPacked"),
                ],
            },
            Section {
                title: "ARCHITECTURE SPECIFIC",
                entries: vec![
                    Entry::new("ARMOptimized pack(4)", "ARMOptimized"),
                    Entry::new("X86Optimized (default)", "X86Optimized"),
                ],
            },
        ];

        Ok(Catalog { structs, sections })
    }
}
