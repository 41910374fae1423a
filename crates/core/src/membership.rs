//! The image-basket relationship and its mutation protocol.

use std::collections::HashSet;

use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::catalog::{self, Catalog};
use crate::domain::*;
use crate::error::{Error, Result};
use crate::notifier::ChangeNotifier;

/// Apply `state` to every image in `image_ids` against one basket.
///
/// The batch runs in a single immediate transaction, so each (basket, image)
/// pair is read and written without interleaving from other writers. Ids that
/// do not resolve to an image are reported in `missing` and skipped; the rest
/// of the batch still applies. Repeated ids are applied once. Images whose
/// membership changed are marked dirty in the same transaction.
pub fn set_membership(
    catalog: &mut Catalog,
    notifier: &ChangeNotifier,
    basket_id: BasketId,
    image_ids: &[ImageId],
    state: BasketState,
) -> Result<MembershipOutcome> {
    if image_ids.is_empty() {
        return Err(Error::Validation("no image ids supplied".into()));
    }

    let tx = catalog
        .conn_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !catalog::basket_exists(&tx, basket_id)? {
        return Err(Error::BasketNotFound(basket_id));
    }

    let now = notifier.now();
    let mut seen = HashSet::with_capacity(image_ids.len());
    let mut outcome = MembershipOutcome::default();

    for &image_id in image_ids {
        if !seen.insert(image_id) {
            continue;
        }
        if !catalog::image_exists(&tx, image_id)? {
            outcome.missing.push(image_id);
            continue;
        }
        match state {
            BasketState::Add => {
                if catalog::insert_entry(&tx, basket_id, image_id, now)? {
                    outcome.added.push(image_id);
                } else {
                    outcome.unchanged.push(image_id);
                }
            }
            BasketState::Remove => {
                if catalog::delete_entry(&tx, basket_id, image_id)? {
                    outcome.removed.push(image_id);
                } else {
                    outcome.unchanged.push(image_id);
                }
            }
            BasketState::Toggle => {
                if catalog::delete_entry(&tx, basket_id, image_id)? {
                    outcome.removed.push(image_id);
                } else {
                    catalog::insert_entry(&tx, basket_id, image_id, now)?;
                    outcome.added.push(image_id);
                }
            }
        }
    }

    notifier.stamp(&tx, &outcome.changed())?;
    tx.commit()?;

    debug!(
        basket_id,
        %state,
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        unchanged = outcome.unchanged.len(),
        missing = outcome.missing.len(),
        "membership applied"
    );
    Ok(outcome)
}

/// Image ids in a basket, oldest entry first.
pub fn basket_images(catalog: &Catalog, basket_id: BasketId) -> Result<Vec<ImageId>> {
    if !catalog::basket_exists(catalog.conn(), basket_id)? {
        return Err(Error::BasketNotFound(basket_id));
    }
    catalog.basket_image_ids(basket_id)
}

/// Entries of a basket with the time each image was added, oldest first.
pub fn basket_entries(catalog: &Catalog, basket_id: BasketId) -> Result<Vec<BasketEntry>> {
    if !catalog::basket_exists(catalog.conn(), basket_id)? {
        return Err(Error::BasketNotFound(basket_id));
    }
    catalog.list_entries(basket_id)
}

pub fn is_in_basket(catalog: &Catalog, basket_id: BasketId, image_id: ImageId) -> Result<bool> {
    catalog.contains_entry(basket_id, image_id)
}
