use colored::*;

use crate::{
    models::{area::Area, floor::Floor, registry::Registry},
    services::names::name_key,
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Print `left` with `right` pushed to the terminal's right edge, or just
/// `left` when the line would not fit.
fn print_aligned(left: &str, styled_left: ColoredString, right: &str) {
    if right.is_empty() {
        println!("{}", styled_left);
        return;
    }

    let terminal_width = get_terminal_width();
    let total_content = left.chars().count() + right.chars().count();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), right.dimmed());
    } else {
        println!("{}", styled_left);
    }
}

/// Context shown to the right of an area: labels, then aliases
fn get_area_context(area: &Area) -> String {
    let mut parts = vec![];
    if !area.labels.is_empty() {
        parts.push(
            area.labels
                .iter()
                .map(|l| format!("#{l}"))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    if !area.aliases.is_empty() {
        parts.push(format!(
            "aka {}",
            area.aliases.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    parts.join("  ·  ")
}

/// Render a single area line with icon, name and right-aligned context
pub fn render_area_line(area: &Area) {
    let icon = area.icon.as_deref().unwrap_or("·");
    let left = format!("    {}  {}", icon, area.name);
    let styled = left.bold();

    print_aligned(&left, styled, &get_area_context(area));
    println!("      {}", area.id.to_string().dimmed());
}

/// Render a floor heading with its level and the number of areas on it
pub fn render_floor_line(floor: &Floor, area_count: usize) {
    let level = floor
        .level
        .map(|l| format!("L{l}"))
        .unwrap_or_else(|| String::from("L?"));
    let left = format!("  {}  {}", level, floor.name);
    let styled = format!("  {}  {}", level.dimmed(), floor.name.cyan().bold()).normal();
    let area_word = if area_count == 1 { "area" } else { "areas" };

    print_aligned(&left, styled, &format!("{area_count} {area_word}"));
    println!("      {}", floor.floor_id.to_string().dimmed());
}

/// Floors sorted by level (unleveled last), then name
pub fn sorted_floors(registry: &Registry) -> Vec<&Floor> {
    let mut floors: Vec<_> = registry.get_floors().collect();
    floors.sort_by(|a, b| {
        (a.level.is_none(), a.level, name_key(&a.name)).cmp(&(
            b.level.is_none(),
            b.level,
            name_key(&b.name),
        ))
    });
    floors
}

fn sorted_by_name<'a>(areas: impl Iterator<Item = &'a Area>) -> Vec<&'a Area> {
    let mut areas: Vec<_> = areas.collect();
    areas.sort_by(|a, b| name_key(&a.name).cmp(&name_key(&b.name)));
    areas
}

/// Render every area grouped under its floor
pub fn render_areas_by_floor(registry: &Registry) {
    for floor in sorted_floors(registry) {
        let areas = sorted_by_name(registry.get_areas_on_floor(floor.floor_id));
        if areas.is_empty() {
            continue;
        }
        render_section_header(&floor.name);
        for area in areas {
            render_area_line(area);
        }
    }

    let unassigned = sorted_by_name(registry.get_areas().filter(|a| a.floor_id.is_none()));
    if !unassigned.is_empty() {
        render_section_header("No floor");
        for area in unassigned {
            render_area_line(area);
        }
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize, noun: &str) {
    let word = if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, word);
}

/// Render a section header (e.g. a floor name)
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(registry: &mut Registry, name: &str, level: Option<i32>) {
        let floor_id = registry.fresh_id();
        registry.add_floor(Floor {
            floor_id,
            name: name.to_string(),
            level,
            ..Floor::default()
        });
    }

    #[test]
    fn test_sorted_floors_orders_by_level_then_name() {
        let mut registry = Registry::default();
        floor(&mut registry, "Attic", None);
        floor(&mut registry, "Upstairs", Some(1));
        floor(&mut registry, "Basement", Some(-1));
        floor(&mut registry, "Ground", Some(0));

        let names: Vec<_> = sorted_floors(&registry)
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["Basement", "Ground", "Upstairs", "Attic"]);
    }

    #[test]
    fn test_area_context_lists_labels_and_aliases() {
        let area = Area {
            name: String::from("Den"),
            labels: ["cozy".to_string()].into(),
            aliases: ["Study".to_string(), "Office".to_string()].into(),
            ..Area::default()
        };
        assert_eq!(get_area_context(&area), "#cozy  ·  aka Office, Study");
        assert_eq!(get_area_context(&Area::default()), "");
    }
}
