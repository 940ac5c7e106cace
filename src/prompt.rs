//! Prompt composition: style text plus the material table, as one instruction.

use crate::materials::{non_empty, MaterialMapping, MaterialRecord};

/// Opening line describing the kind of render wanted.
pub const PROMPT_PREAMBLE: &str =
    "High Quality Architectural Photography, Interior Design Render.";

/// Header introducing the material mapping block.
pub const MAPPING_HEADER: &str = "MATERIAL MAPPING:";

/// Fixed closing instruction: keep geometry, render photorealistically.
pub const PROMPT_SUFFIX: &str =
    "Important: Keep the exact geometry of the input image. Realistic lighting, 8k resolution.";

/// Builds the instruction sent to the generation provider.
///
/// Pure and deterministic: records appear in the mapping's key order. An empty
/// mapping yields the header with no fragments; blank style text omits the
/// style line.
pub fn compose(style_text: &str, mapping: &MaterialMapping) -> String {
    let mut lines = vec![PROMPT_PREAMBLE.to_string()];

    let style = style_text.trim();
    if !style.is_empty() {
        lines.push(format!("Style: {}.", style.trim_end_matches('.')));
    }

    lines.push(mapping_block(mapping));
    lines.push(PROMPT_SUFFIX.to_string());

    lines.join("\n").trim().to_string()
}

/// Renders the material mapping block: the header followed by one fragment
/// per record.
pub fn mapping_block(mapping: &MaterialMapping) -> String {
    let mut block = String::from(MAPPING_HEADER);
    for record in mapping.records() {
        block.push('\n');
        block.push_str(&fragment(record));
    }
    block
}

fn fragment(record: &MaterialRecord) -> String {
    format!(
        "- ({} parts) = {}.",
        record.preview_color.trim(),
        descriptive_label(record)
    )
}

/// Best available description of a record.
///
/// Only two shapes are recognized: `material (finish)` and
/// `component (description)`. Other free-form fields such as `pattern` or
/// `door` are not included. When neither shape applies, the display label is
/// used so the color is still anchored to something.
pub fn descriptive_label(record: &MaterialRecord) -> String {
    if let Some(material) = non_empty(record.material.as_deref()) {
        return with_qualifier(material, non_empty(record.finish.as_deref()));
    }
    if let Some(component) = non_empty(record.component.as_deref()) {
        return with_qualifier(component, non_empty(record.description.as_deref()));
    }
    record.label().to_string()
}

fn with_qualifier(name: &str, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(q) => format!("{name} ({q})"),
        None => name.to_string(),
    }
}
