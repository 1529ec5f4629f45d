//! Command: list options with their state.
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write as _;

use super::CommandSetup;
use crate::cli::{GlobalOpts, ListOpts};
use crate::logging::Logger;
use crate::registry::{Category, DeviceRevision, Registry};
use crate::state::ConfigState;

#[derive(Debug, Serialize)]
struct OptionRow<'a> {
    id: &'a str,
    category: &'static str,
    title: &'a str,
    enabled: bool,
    available: bool,
    requires: Vec<&'a str>,
    conflicts: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct UnknownRow {
    category: &'static str,
    tokens: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Listing<'a> {
    revision: String,
    options: Vec<OptionRow<'a>>,
    unknown: Vec<UnknownRow>,
}

/// Run the list command.
///
/// # Errors
///
/// Returns an error if setup fails or output cannot be written.
pub fn run(global: &GlobalOpts, opts: &ListOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let state = ConfigState::init(&setup.registry, &setup.file, setup.revision);
    let categories = selected(opts.category);

    let out = if opts.json {
        render_json(&state, setup.revision, &categories)?
    } else {
        render_text(&state, setup.revision, &categories)
    };
    write!(std::io::stdout().lock(), "{out}")?;
    Ok(())
}

fn selected(filter: Option<Category>) -> Vec<Category> {
    filter.map_or_else(|| Category::ALL.to_vec(), |c| vec![c])
}

const fn heading(category: Category) -> &'static str {
    match category {
        Category::Interface => "Interfaces",
        Category::Extension => "Extensions",
    }
}

/// Human-readable listing: one block per category, options in registry order.
#[must_use]
pub fn render_text(
    state: &ConfigState<'_>,
    revision: DeviceRevision,
    categories: &[Category],
) -> String {
    let registry = state.registry();
    let mut out = String::new();
    for &category in categories {
        let _ = writeln!(out, "{} ({}=)", heading(category), category.key());
        for (i, item) in registry.in_category(category) {
            let mark = if state.is_enabled(i) { 'x' } else { ' ' };
            let _ = write!(out, "  [{mark}] {}", item.title);
            if item.title != item.id {
                let _ = write!(out, " <{}>", item.id);
            }
            if !item.is_available(revision) {
                out.push_str(" (unavailable)");
            }
            out.push('\n');
        }
        let unknown = state.unknown_tokens(category);
        if !unknown.is_empty() {
            let words: Vec<String> = unknown.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "  preserved: {}", words.join(" "));
        }
    }
    out
}

/// JSON listing for scripting. Preserved tokens that are not UTF-8 are
/// shown with replacement characters.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(
    state: &ConfigState<'_>,
    revision: DeviceRevision,
    categories: &[Category],
) -> Result<String> {
    let registry = state.registry();
    let options = registry
        .items()
        .iter()
        .enumerate()
        .filter(|(_, it)| categories.contains(&it.category))
        .map(|(i, it)| OptionRow {
            id: &it.id,
            category: it.category.key(),
            title: &it.title,
            enabled: state.is_enabled(i),
            available: it.is_available(revision),
            requires: ids(registry, it.requires()),
            conflicts: ids(registry, &registry.conflicts_of(i)),
        })
        .collect();

    let unknown = categories
        .iter()
        .map(|&c| UnknownRow {
            category: c.key(),
            tokens: state
                .unknown_tokens(c)
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
        .collect();

    let listing = Listing {
        revision: revision.to_string(),
        options,
        unknown,
    };
    let mut json = serde_json::to_string_pretty(&listing)?;
    json.push('\n');
    Ok(json)
}

fn ids<'a>(registry: &'a Registry, indices: &[usize]) -> Vec<&'a str> {
    indices
        .iter()
        .filter_map(|&i| registry.get(i).map(|it| it.id.as_str()))
        .collect()
}
