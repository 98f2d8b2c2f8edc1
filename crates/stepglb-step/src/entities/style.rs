//! Presentation styles: resolve `STYLED_ITEM` assignments to RGB colours.
//!
//! A styled item points at a chain such as
//! `PRESENTATION_STYLE_ASSIGNMENT → SURFACE_STYLE_USAGE → SURFACE_SIDE_STYLE
//! → SURFACE_STYLE_FILL_AREA → FILL_AREA_STYLE → FILL_AREA_STYLE_COLOUR →
//! COLOUR_RGB`. Exporters vary the intermediate links, so the chain is walked
//! generically until the first colour is found.

use std::collections::{HashMap, HashSet};

use super::EntityArgs;
use crate::model::Rgb;
use crate::parser::{StepEntity, StepFile};

/// Deepest chain followed from a styled item to its colour.
const MAX_STYLE_DEPTH: usize = 16;

/// Colour assigned to each styled representation item, keyed by item id.
pub type ColourMap = HashMap<u64, Rgb>;

/// Collect the colour of every styled item in the file.
///
/// `OVER_RIDING_STYLED_ITEM` assignments take precedence over plain ones.
pub fn collect_colours(file: &StepFile) -> ColourMap {
    let mut colours = ColourMap::new();
    for type_name in ["STYLED_ITEM", "OVER_RIDING_STYLED_ITEM"] {
        for styled in file.entities_of_type(type_name) {
            // (name, styles, item)
            let Ok(item) = styled.entity_ref(2) else {
                continue;
            };
            if let Some(rgb) = find_colour(file, styled) {
                colours.insert(item, rgb);
            }
        }
    }
    tracing::debug!(styled_items = colours.len(), "resolved presentation colours");
    colours
}

fn find_colour(file: &StepFile, styled: &StepEntity) -> Option<Rgb> {
    let mut visited = HashSet::new();
    let mut stack: Vec<(u64, usize)> = Vec::new();
    if let Some(styles) = styled.args.get(1) {
        styles.for_each_ref(&mut |id| stack.push((id, 0)));
    }
    // Depth-first in argument order.
    stack.reverse();

    while let Some((id, depth)) = stack.pop() {
        if depth > MAX_STYLE_DEPTH || !visited.insert(id) {
            continue;
        }
        let Some(entity) = file.get(id) else {
            continue;
        };
        if let Some(rgb) = colour_of(entity) {
            return Some(rgb);
        }
        let mut children = Vec::new();
        for arg in &entity.args {
            arg.for_each_ref(&mut |child| children.push((child, depth + 1)));
        }
        stack.extend(children.into_iter().rev());
    }
    None
}

fn colour_of(entity: &StepEntity) -> Option<Rgb> {
    match entity.type_name.as_str() {
        // (name, red, green, blue)
        "COLOUR_RGB" => {
            let channel = |i| entity.real(i).ok().map(|v| v.clamp(0.0, 1.0) as f32);
            Some([channel(1)?, channel(2)?, channel(3)?])
        }
        "DRAUGHTING_PRE_DEFINED_COLOUR" => predefined_colour(entity.name()),
        _ => None,
    }
}

fn predefined_colour(name: &str) -> Option<Rgb> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "red" => [1.0, 0.0, 0.0],
        "green" => [0.0, 1.0, 0.0],
        "blue" => [0.0, 0.0, 1.0],
        "yellow" => [1.0, 1.0, 0.0],
        "magenta" => [1.0, 0.0, 1.0],
        "cyan" => [0.0, 1.0, 1.0],
        "black" => [0.0, 0.0, 0.0],
        "white" => [1.0, 1.0, 1.0],
        _ => return None,
    };
    Some(rgb)
}
