use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photobasket_core::domain::{Basket, ThumbSize};
use photobasket_core::Library;

fn owner(basket: &Basket) -> String {
    basket
        .user_id
        .map(|u| u.to_string())
        .unwrap_or_else(|| "shared".to_string())
}

pub fn create(library: &Library, name: &str, user: Option<i64>) -> Result<()> {
    let basket = library.create_basket(name, user)?;
    println!("Created basket #{} \"{}\" ({})", basket.id, basket.name, owner(&basket));
    Ok(())
}

pub fn rm(library: &mut Library, id: i64) -> Result<()> {
    let removed = library.delete_basket(id)?;
    println!("Deleted basket #{id} ({removed} entries removed)");
    Ok(())
}

pub fn rename(library: &Library, id: i64, name: &str) -> Result<()> {
    let basket = library.rename_basket(id, name)?;
    println!("Basket #{} renamed to \"{}\"", basket.id, basket.name);
    Ok(())
}

pub fn clear(library: &mut Library, id: i64) -> Result<()> {
    let removed = library.clear_basket(id)?;
    println!("Cleared basket #{id} ({removed} entries removed)");
    Ok(())
}

pub fn default(library: &Library, user: i64) -> Result<()> {
    let basket = library.default_basket(user)?;
    println!("Default basket for user {user}: #{} \"{}\"", basket.id, basket.name);
    Ok(())
}

pub fn ls(library: &Library, user: Option<i64>) -> Result<()> {
    let baskets = library.user_baskets(user)?;
    if baskets.is_empty() {
        println!("No baskets. Use `pbasket basket create <name>` to make one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Owner"),
        Cell::new("Default"),
        Cell::new("Images"),
    ]);

    for basket in &baskets {
        table.add_row(vec![
            Cell::new(basket.id),
            Cell::new(&basket.name),
            Cell::new(owner(basket)),
            Cell::new(if basket.is_default { "yes" } else { "" }),
            Cell::new(library.entry_count(basket.id)?),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn show(library: &Library, id: i64) -> Result<()> {
    let basket = library.basket(id)?;
    let entries = library.basket_entries(id)?;

    let marker = if basket.is_default { " [DEFAULT]" } else { "" };
    println!("Basket #{} \"{}\" ({}){}", basket.id, basket.name, owner(&basket), marker);
    println!("{}", "-".repeat(60));

    if entries.is_empty() {
        println!("  (empty)");
    }
    for entry in entries {
        let image = library.image(entry.image_id)?;
        println!(
            "  {}  {}  {}",
            entry.date_added.format("%Y-%m-%d %H:%M"),
            image,
            image.thumb_url(ThumbSize::Small)
        );
    }
    Ok(())
}
