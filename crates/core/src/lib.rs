pub mod baskets;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod membership;
pub mod notifier;

use std::path::{Path, PathBuf};

use catalog::{Catalog, CatalogOptions};
use domain::*;
use error::Result;
use notifier::ChangeNotifier;

/// The main entry point for the photobasket library.
///
/// Wraps one catalog connection. Share a catalog between threads or processes
/// by opening one `Library` per thread on the same path.
pub struct Library {
    catalog: Catalog,
    notifier: ChangeNotifier,
}

impl Library {
    /// Open or create a library at the given catalog path.
    pub fn open(catalog_path: &Path) -> Result<Self> {
        Self::open_with(catalog_path, &CatalogOptions::default())
    }

    pub fn open_with(catalog_path: &Path, options: &CatalogOptions) -> Result<Self> {
        let catalog = Catalog::open_with(catalog_path, options)?;
        Ok(Self::from_catalog(catalog))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_catalog(Catalog::open_in_memory()?))
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Replace the change notifier (e.g. to inject a clock).
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ── Baskets ──────────────────────────────────────────────────────

    pub fn create_basket(&self, name: &str, user_id: Option<UserId>) -> Result<Basket> {
        baskets::create(&self.catalog, name, user_id)
    }

    pub fn create_basket_from(&self, req: &BasketCreateRequest) -> Result<Basket> {
        self.create_basket(&req.name, req.user_id)
    }

    /// Delete a basket and its entries. Returns how many entries were removed.
    pub fn delete_basket(&mut self, basket_id: BasketId) -> Result<usize> {
        baskets::delete(&mut self.catalog, &self.notifier, basket_id)
    }

    pub fn basket(&self, basket_id: BasketId) -> Result<Basket> {
        baskets::get(&self.catalog, basket_id)
    }

    /// Baskets visible to `user_id` (their own plus unscoped ones), or all
    /// baskets when `user_id` is `None`.
    pub fn user_baskets(&self, user_id: Option<UserId>) -> Result<Vec<Basket>> {
        baskets::list(&self.catalog, user_id)
    }

    pub fn default_basket(&self, user_id: UserId) -> Result<Basket> {
        baskets::default_basket(&self.catalog, user_id)
    }

    pub fn rename_basket(&self, basket_id: BasketId, name: &str) -> Result<Basket> {
        baskets::rename(&self.catalog, basket_id, name)
    }

    pub fn clear_basket(&mut self, basket_id: BasketId) -> Result<usize> {
        baskets::clear(&mut self.catalog, &self.notifier, basket_id)
    }

    // ── Membership ───────────────────────────────────────────────────

    pub fn set_membership(
        &mut self,
        basket_id: BasketId,
        image_ids: &[ImageId],
        state: BasketState,
    ) -> Result<MembershipOutcome> {
        membership::set_membership(&mut self.catalog, &self.notifier, basket_id, image_ids, state)
    }

    pub fn set_basket_state(&mut self, req: &BasketStateRequest) -> Result<MembershipOutcome> {
        self.set_membership(req.basket_id, &req.image_ids, req.desired_state)
    }

    pub fn basket_images(&self, basket_id: BasketId) -> Result<Vec<ImageId>> {
        membership::basket_images(&self.catalog, basket_id)
    }

    pub fn basket_entries(&self, basket_id: BasketId) -> Result<Vec<BasketEntry>> {
        membership::basket_entries(&self.catalog, basket_id)
    }

    pub fn is_in_basket(&self, basket_id: BasketId, image_id: ImageId) -> Result<bool> {
        membership::is_in_basket(&self.catalog, basket_id, image_id)
    }

    pub fn entry_count(&self, basket_id: BasketId) -> Result<usize> {
        self.catalog.count_entries(basket_id)
    }

    pub fn baskets_for_image(&self, image_id: ImageId) -> Result<Vec<Basket>> {
        self.catalog.baskets_for_image(image_id)
    }

    // ── Images ───────────────────────────────────────────────────────

    pub fn add_folder(&self, path: &Path) -> Result<Folder> {
        self.catalog.add_folder(path)
    }

    pub fn add_image(&self, image: &NewImage) -> Result<Image> {
        self.catalog.add_image(image)
    }

    pub fn image(&self, image_id: ImageId) -> Result<Image> {
        self.catalog.get_image(image_id)
    }

    pub fn images(&self) -> Result<Vec<Image>> {
        self.catalog.list_images()
    }

    pub fn image_full_path(&self, image_id: ImageId) -> Result<PathBuf> {
        self.catalog.image_full_path(image_id)
    }

    pub fn thumb_url(&self, image_id: ImageId, size: ThumbSize) -> Result<String> {
        Ok(self.catalog.get_image(image_id)?.thumb_url(size))
    }

    /// Advance an image's dirty marker so cached derivatives are refetched.
    pub fn mark_dirty(&self, image_id: ImageId) -> Result<()> {
        self.notifier.mark_dirty(&self.catalog, image_id)
    }

    /// Apply a keyword to an image. Returns true if the tag was new for the image.
    pub fn tag_image(&self, image_id: ImageId, keyword: &str) -> Result<bool> {
        let tag = self.catalog.add_tag(keyword)?;
        let added = self.catalog.tag_image(image_id, tag.id)?;
        if added {
            self.mark_dirty(image_id)?;
        }
        Ok(added)
    }

    /// Remove a keyword from an image. Returns true if it was present.
    pub fn untag_image(&self, image_id: ImageId, keyword: &str) -> Result<bool> {
        let tag = self.catalog.add_tag(keyword)?;
        let removed = self.catalog.untag_image(image_id, tag.id)?;
        if removed {
            self.mark_dirty(image_id)?;
        }
        Ok(removed)
    }

    pub fn image_tags(&self, image_id: ImageId) -> Result<Vec<Tag>> {
        self.catalog.image_tags(image_id)
    }

    pub fn set_image_metadata(&self, image_id: ImageId, meta: &ImageMetaData) -> Result<()> {
        self.catalog.set_image_metadata(image_id, meta)?;
        self.mark_dirty(image_id)
    }

    pub fn set_classification(&self, image_id: ImageId, label: &str, score: f64) -> Result<()> {
        let class = self.catalog.add_classification(label)?;
        self.catalog.set_classification(image_id, Some(class.id), score)?;
        self.mark_dirty(image_id)
    }
}
