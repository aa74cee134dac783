use crate::catalog::{Catalog, Section};
use crate::error::LayoutError;
use crate::layout::StructLayout;
use crate::native;
use crate::target::Target;
use log::{info, warn};
use std::fmt::Write;

pub struct Options {
    pub target: Target,
    /// Print the field table of every structure, not only the padding demo.
    pub all_fields: bool,
    /// Print live addresses of a real instance. Ignored when `target` is not
    /// the host, since there is no instance laid out that way to look at.
    pub show_addresses: bool,
    pub compare_targets: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            target: Target::host(),
            all_fields: false,
            show_addresses: true,
            compare_targets: false,
        }
    }
}

const NOTES: [(&str, &str); 4] = [
    ("Aligned access", "Faster on both ARM and x86"),
    ("Unaligned access", "Slower on ARM, acceptable on x86"),
    ("pack(1)", "Smallest size, potential performance cost"),
    ("Default packing", "Balance between size and performance"),
];

pub fn render(catalog: &Catalog, options: &Options) -> Result<String, LayoutError> {
    let mut out = String::new();

    writeln!(out, "MEMORY ALIGNMENT AND PRAGMA PACK EXAMPLES")?;
    writeln!(
        out,
        "Target: {} (pointer {} bytes, max scalar alignment {})",
        options.target, options.target.pointer_size, options.target.max_scalar_align
    )?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out)?;

    for section in &catalog.sections {
        write_section(&mut out, catalog, section, options)?;
    }

    if options.compare_targets {
        write_target_comparison(&mut out, catalog)?;
    }

    separator(&mut out, "MEMORY LAYOUT EXAMPLE")?;
    let demo = layout_of(catalog, Catalog::ADDRESS_DEMO, &options.target)?;
    let probed = if options.show_addresses && options.target.is_host() {
        native::probe(Catalog::ADDRESS_DEMO)
    } else {
        if options.show_addresses {
            info!(
                "not showing live addresses: target {} is not the host",
                options.target
            );
        }
        None
    };
    write_addresses(&mut out, &demo, probed.as_ref())?;

    separator(&mut out, "PADDING DEMONSTRATION")?;
    let demo = layout_of(catalog, Catalog::PADDING_DEMO, &options.target)?;
    write_field_table(&mut out, &demo)?;
    writeln!(out)?;
    write_padding(&mut out, &demo)?;

    separator(&mut out, "PERFORMANCE IMPLICATIONS")?;
    for (label, note) in NOTES {
        writeln!(out, "{:<17}: {}", label, note)?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(
        out,
        "Memory alignment affects both performance and memory usage!"
    )?;
    writeln!(
        out,
        "Choose alignment strategy based on your specific needs."
    )?;

    Ok(out)
}

/// Every catalog structure laid out for `target`, in catalog order.
pub fn layouts(catalog: &Catalog, target: &Target) -> Vec<StructLayout> {
    catalog.structs.iter().map(|s| s.layout(target)).collect()
}

pub fn render_ron(catalog: &Catalog, target: &Target) -> Result<String, LayoutError> {
    let layouts = layouts(catalog, target);
    let config = ron::ser::PrettyConfig::new().struct_names(true);

    Ok(ron::ser::to_string_pretty(&layouts, config)?)
}

fn layout_of(catalog: &Catalog, name: &str, target: &Target) -> Result<StructLayout, LayoutError> {
    catalog
        .get(name)
        .map(|def| def.layout(target))
        .ok_or_else(|| LayoutError::UnknownStructure(name.to_string()))
}

fn separator(out: &mut String, title: &str) -> Result<(), LayoutError> {
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(50))?;
    Ok(())
}

fn write_section(
    out: &mut String,
    catalog: &Catalog,
    section: &Section,
    options: &Options,
) -> Result<(), LayoutError> {
    separator(out, section.title)?;

    let layouts = section
        .entries
        .iter()
        .map(|entry| Ok((entry.label, layout_of(catalog, entry.structure, &options.target)?)))
        .collect::<Result<Vec<_>, LayoutError>>()?;

    for (label, layout) in &layouts {
        writeln!(out, "{:<25}: {:<3} bytes", label, layout.size)?;
    }

    if options.all_fields {
        for (_, layout) in &layouts {
            writeln!(out)?;
            write_field_table(out, layout)?;
        }
    }

    Ok(())
}

pub fn write_field_table(out: &mut String, layout: &StructLayout) -> Result<(), LayoutError> {
    let types = layout
        .fields
        .iter()
        .map(|f| f.ty.to_string())
        .collect::<Vec<_>>();

    let name_width = layout
        .fields
        .iter()
        .map(|f| f.name.len())
        .chain(Some("field".len()))
        .max()
        .unwrap_or(0);
    let type_width = types
        .iter()
        .map(|t| t.len())
        .chain(Some("type".len()))
        .max()
        .unwrap_or(0);

    writeln!(
        out,
        "{} field layout ({}, align {}, {} bytes):",
        layout.name, layout.packing, layout.align, layout.size
    )?;
    writeln!(
        out,
        "  {:<nw$}  {:<tw$}  {:>6}  {:>4}  {:>5}  {:>7}",
        "field",
        "type",
        "offset",
        "size",
        "align",
        "padding",
        nw = name_width,
        tw = type_width
    )?;

    for (field, ty) in layout.fields.iter().zip(&types) {
        writeln!(
            out,
            "  {:<nw$}  {:<tw$}  {:>6}  {:>4}  {:>5}  {:>7}",
            field.name,
            ty,
            field.offset,
            field.size,
            field.align,
            field.padding_after,
            nw = name_width,
            tw = type_width
        )?;
    }

    Ok(())
}

fn write_padding(out: &mut String, layout: &StructLayout) -> Result<(), LayoutError> {
    let width = layout
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);

    writeln!(out, "Padding bytes between fields:")?;

    for (i, field) in layout.fields.iter().enumerate() {
        let trailing = if i + 1 == layout.fields.len() {
            " (to end of structure)"
        } else {
            ""
        };

        writeln!(
            out,
            "After {:<w$}: {} bytes{}",
            field.name,
            field.padding_after,
            trailing,
            w = width
        )?;
    }

    writeln!(
        out,
        "Total padding : {} of {} bytes",
        layout.total_padding(),
        layout.size
    )?;

    Ok(())
}

fn write_addresses(
    out: &mut String,
    layout: &StructLayout,
    probed: Option<&native::NativeLayout>,
) -> Result<(), LayoutError> {
    let Some(instance) = probed else {
        writeln!(out, "{} field offsets:", layout.name)?;
        for field in &layout.fields {
            writeln!(out, "{:<10}: +{}", field.name, field.offset)?;
        }
        return Ok(());
    };

    writeln!(out, "{} field addresses:", layout.name)?;
    for field in &layout.fields {
        let Some(live) = instance.field(&field.name) else {
            warn!("{}.{} has no native counterpart", layout.name, field.name);
            continue;
        };

        if live.offset != field.offset as usize {
            warn!(
                "{}.{}: computed offset {} but the compiler placed it at {}",
                layout.name, field.name, field.offset, live.offset
            );
        }

        writeln!(
            out,
            "{:<10}: {:#x} (+{})",
            field.name,
            live.address,
            live.address - instance.base
        )?;
    }

    Ok(())
}

fn write_target_comparison(out: &mut String, catalog: &Catalog) -> Result<(), LayoutError> {
    separator(out, "TARGET COMPARISON")?;

    write!(out, "{:<20}", "structure")?;
    for target in Target::ALL {
        write!(out, "  {:>6}", target.name)?;
    }
    writeln!(out)?;

    for def in &catalog.structs {
        write!(out, "{:<20}", def.name())?;
        for target in Target::ALL {
            write!(out, "  {:>6}", def.layout(&target).size)?;
        }
        writeln!(out)?;
    }

    Ok(())
}
