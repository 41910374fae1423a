use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photobasket_core::domain::{NewImage, ThumbSize};
use photobasket_core::Library;

pub fn add(library: &Library, folder: &Path, file: &str, size: u64) -> Result<()> {
    let folder = library.add_folder(folder)?;
    let image = library.add_image(&NewImage::new(folder.id, file, size, Utc::now()))?;
    println!("Registered image {image}");
    Ok(())
}

pub fn ls(library: &Library) -> Result<()> {
    let images = library.images()?;
    if images.is_empty() {
        println!("No images registered.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Path"),
        Cell::new("Size"),
        Cell::new("Baskets"),
        Cell::new("Thumb"),
    ]);

    for image in &images {
        let baskets = library.baskets_for_image(image.id)?;
        table.add_row(vec![
            Cell::new(image.id),
            Cell::new(library.image_full_path(image.id)?.display()),
            Cell::new(format!("{:.1} KB", image.file_size_bytes as f64 / 1024.0)),
            Cell::new(baskets.len()),
            Cell::new(image.thumb_url(ThumbSize::Medium)),
        ]);
    }

    println!("{table}");
    Ok(())
}
