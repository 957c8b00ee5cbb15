use std::fmt::Write;
use crate::model::Model;




/**
 * Format a count with a metric suffix, e.g. `1.5M` for 1,500,000. Counts
 * below one thousand are printed as is.
 */
pub fn pretty_number(n: u64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "G"), (1e6, "M"), (1e3, "K")];
    let x = n as f64;

    SUFFIXES
        .iter()
        .find(|(scale, _)| x >= *scale)
        .map(|(scale, suffix)| format!("{:.1}{}", x / scale, suffix))
        .unwrap_or_else(|| n.to_string())
}




/**
 * Return a human-readable multi-line summary of a model.
 */
pub fn summary(model: &Model) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "num grids   {}", pretty_number(model.grids().len() as u64));
    let _ = writeln!(s, "num cells   {}", pretty_number(model.num_cells_across_all_grids()));
    let _ = writeln!(s, "num scalars {}", pretty_number(model.scalars().len() as u64));
    let _ = writeln!(s, "num levels  {} {:?}", model.num_levels(), model.refinement_of_level());
    let _ = writeln!(s, "num fields  {}", model.field_metas().len());

    for meta in model.field_metas() {
        let _ = writeln!(s, " - {} at offset {}", meta.name, pretty_number(meta.offset));
    }
    if !model.user_meta().is_empty() {
        let _ = writeln!(s, "user meta   {}", model.user_meta());
    }
    s
}
