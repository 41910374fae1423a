//! Basket lifecycle: create, delete, lookup, and per-user default baskets.

use rusqlite::{params, TransactionBehavior};
use tracing::{info, warn};

use crate::catalog::{self, Catalog};
use crate::domain::*;
use crate::error::{Error, Result};
use crate::notifier::ChangeNotifier;

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("basket name is empty".into()));
    }
    Ok(name)
}

/// Create a basket owned by `user_id`, or unscoped when `user_id` is `None`.
/// Duplicate names are allowed.
pub fn create(catalog: &Catalog, name: &str, user_id: Option<UserId>) -> Result<Basket> {
    let name = validate_name(name)?;
    let basket = catalog.insert_basket(name, user_id, false)?;
    info!(basket_id = basket.id, name, ?user_id, "basket created");
    Ok(basket)
}

/// Delete a basket and all of its entries. Images that were in the basket are
/// marked dirty. Returns the number of entries removed.
pub fn delete(catalog: &mut Catalog, notifier: &ChangeNotifier, basket_id: BasketId) -> Result<usize> {
    let tx = catalog
        .conn_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !catalog::basket_exists(&tx, basket_id)? {
        return Err(Error::BasketNotFound(basket_id));
    }
    let image_ids = catalog::entry_image_ids(&tx, basket_id)?;
    tx.execute("DELETE FROM baskets WHERE id = ?1", params![basket_id])?;
    notifier.stamp(&tx, &image_ids)?;
    tx.commit()?;

    info!(basket_id, entries = image_ids.len(), "basket deleted");
    Ok(image_ids.len())
}

/// Remove every entry from a basket, keeping the basket itself.
pub fn clear(catalog: &mut Catalog, notifier: &ChangeNotifier, basket_id: BasketId) -> Result<usize> {
    let tx = catalog
        .conn_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !catalog::basket_exists(&tx, basket_id)? {
        return Err(Error::BasketNotFound(basket_id));
    }
    let image_ids = catalog::entry_image_ids(&tx, basket_id)?;
    tx.execute(
        "DELETE FROM basket_entries WHERE basket_id = ?1",
        params![basket_id],
    )?;
    notifier.stamp(&tx, &image_ids)?;
    tx.commit()?;

    info!(basket_id, entries = image_ids.len(), "basket cleared");
    Ok(image_ids.len())
}

pub fn get(catalog: &Catalog, basket_id: BasketId) -> Result<Basket> {
    catalog.get_basket(basket_id)
}

pub fn list(catalog: &Catalog, user_id: Option<UserId>) -> Result<Vec<Basket>> {
    catalog.list_baskets(user_id)
}

pub fn rename(catalog: &Catalog, basket_id: BasketId, name: &str) -> Result<Basket> {
    let name = validate_name(name)?;
    catalog.rename_basket(basket_id, name)?;
    catalog.get_basket(basket_id)
}

/// Return the user's default basket, creating it on first access.
///
/// Concurrent first accesses race on the store's one-default-per-user index:
/// the loser of the insert re-fetches the winner's row. If that re-fetch finds
/// nothing the race is reported as a conflict instead of retrying further.
pub fn default_basket(catalog: &Catalog, user_id: UserId) -> Result<Basket> {
    if let Some(basket) = catalog.find_default_basket(user_id)? {
        return Ok(basket);
    }
    insert_default(catalog, user_id)
}

fn insert_default(catalog: &Catalog, user_id: UserId) -> Result<Basket> {
    match catalog.insert_basket(DEFAULT_BASKET_NAME, Some(user_id), true) {
        Ok(basket) => {
            info!(basket_id = basket.id, user_id, "default basket created");
            Ok(basket)
        }
        Err(err) if err.is_constraint_violation() => {
            warn!(user_id, "default basket insert lost race, re-fetching");
            catalog.find_default_basket(user_id)?.ok_or_else(|| {
                Error::Conflict(format!(
                    "default basket for user {user_id} could not be created or found"
                ))
            })
        }
        Err(err) => Err(err),
    }
}
