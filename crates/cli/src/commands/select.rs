use anyhow::Result;
use photobasket_core::domain::BasketState;
use photobasket_core::Library;

fn join(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn run(library: &mut Library, basket: i64, state: BasketState, images: &[i64]) -> Result<()> {
    let outcome = library.set_membership(basket, images, state)?;

    if !outcome.added.is_empty() {
        println!("Added:     {}", join(&outcome.added));
    }
    if !outcome.removed.is_empty() {
        println!("Removed:   {}", join(&outcome.removed));
    }
    if !outcome.unchanged.is_empty() {
        println!("Unchanged: {}", join(&outcome.unchanged));
    }
    if !outcome.missing.is_empty() {
        eprintln!("Unknown image ids (skipped): {}", join(&outcome.missing));
    }
    Ok(())
}
