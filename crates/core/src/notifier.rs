//! Cache-invalidation signalling.
//!
//! Every state change that affects an externally cached representation of an
//! image (thumbnail, served metadata) advances the image's `last_updated`
//! marker. Consumers compare the marker embedded in their cached copy against
//! the current one and refetch on mismatch; nothing is regenerated here.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::catalog::{to_millis, Catalog};
use crate::domain::ImageId;
use crate::error::{Error, Result};

/// Source of "now" for dirty markers.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct ChangeNotifier {
    clock: Box<dyn Clock>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Advance an image's dirty marker to the current time.
    ///
    /// The marker never moves backwards: if the clock reads earlier than the
    /// stored value (clock skew between instances), the stored value is kept.
    pub fn mark_dirty(&self, catalog: &Catalog, image_id: ImageId) -> Result<()> {
        if self.stamp(catalog.conn(), &[image_id])? == 0 {
            return Err(Error::ImageNotFound(image_id));
        }
        Ok(())
    }

    /// Stamp several images on an existing connection or open transaction.
    /// Returns the number of images found.
    pub(crate) fn stamp(&self, conn: &Connection, image_ids: &[ImageId]) -> Result<usize> {
        if image_ids.is_empty() {
            return Ok(0);
        }
        let now = to_millis(self.clock.now());
        let mut stmt = conn.prepare_cached(
            "UPDATE images SET last_updated = MAX(last_updated, ?1) WHERE id = ?2",
        )?;
        let mut touched = 0;
        for &id in image_ids {
            touched += stmt.execute(params![now, id])?;
        }
        debug!(count = touched, "images marked dirty");
        Ok(touched)
    }
}
