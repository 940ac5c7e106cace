//! Built-in material mapping used until the user saves their own.

use crate::materials::types::{MaterialMapping, MaterialRecord};

/// Returns the built-in mapping for flat-colored kitchen exports.
pub fn default_mapping() -> MaterialMapping {
    [
        MaterialRecord::new("yellow", "#FFD700")
            .with_name("Yellow Mapping")
            .with_material("Matte White Sprayed MDF")
            .with_finish("Matte")
            .with_color_code("#f8f8f8"),
        MaterialRecord::new("green", "#008000")
            .with_name("Green Mapping")
            .with_material("Light Walnut Veneer")
            .with_finish("Satin")
            .with_color_code("#a67c52"),
        MaterialRecord::new("orange", "#FFA500")
            .with_name("Orange Mapping")
            .with_material("Carrara Marble")
            .with_pattern("Light Veins")
            .with_finish("Polished"),
        MaterialRecord::new("purple", "#800080")
            .with_name("Purple Mapping")
            .with_component("Oven")
            .with_extra("style", "Black Glass + Stainless Steel"),
        MaterialRecord::new("lightblue", "#ADD8E6")
            .with_name("Light Blue Mapping")
            .with_component("Wine Fridge")
            .with_extra("door", "Glass")
            .with_extra("frame", "Black"),
        MaterialRecord::new("black", "#000000")
            .with_name("Black Mapping")
            .with_component("Induction Cooktop"),
        MaterialRecord::new("grey", "#808080")
            .with_name("Grey Mapping")
            .with_component("Sink + Black Tap"),
    ]
    .into_iter()
    .collect()
}
