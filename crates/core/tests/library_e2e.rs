use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use photobasket_core::domain::*;
use photobasket_core::error::Error;
use photobasket_core::notifier::{ChangeNotifier, Clock};
use photobasket_core::Library;

/// Clock pinned to a chosen second, advanced by hand.
#[derive(Clone)]
struct StepClock(Arc<AtomicI64>);

impl StepClock {
    /// Starts well after any wall-clock `last_updated` written at insert time.
    fn new() -> Self {
        Self(Arc::new(AtomicI64::new(Utc::now().timestamp() + 86_400)))
    }

    fn tick(&self) -> i64 {
        self.0.fetch_add(60, Ordering::SeqCst) + 60
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.0.load(Ordering::SeqCst), 0).unwrap()
    }
}

fn library_with_clock() -> (Library, StepClock) {
    let clock = StepClock::new();
    let library = Library::open_in_memory()
        .unwrap()
        .with_notifier(ChangeNotifier::with_clock(clock.clone()));
    (library, clock)
}

fn marker_secs(library: &Library, id: ImageId) -> i64 {
    library.image(id).unwrap().last_updated.timestamp()
}

/// Register `n` images in one folder and return their ids.
fn seed_images(library: &Library, n: usize) -> Vec<ImageId> {
    let folder = library.add_folder(Path::new("/photos/2024")).unwrap();
    (0..n)
        .map(|i| {
            library
                .add_image(&NewImage::new(folder.id, format!("IMG_{i:04}.jpg"), 2048, Utc::now()))
                .unwrap()
                .id
        })
        .collect()
}

// ── Library::open ────────────────────────────────────────────────

#[test]
fn test_library_open_creates_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("sub/dir/catalog.db");

    let _library = Library::open(&db_path).unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_library_reopen_persists_baskets_and_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("catalog.db");

    let (basket_id, ids) = {
        let mut library = Library::open(&db_path).unwrap();
        let ids = seed_images(&library, 2);
        let basket = library.create_basket("Keepers", Some(1)).unwrap();
        library.set_membership(basket.id, &ids, BasketState::Add).unwrap();
        (basket.id, ids)
    };

    let library = Library::open(&db_path).unwrap();
    assert_eq!(library.basket(basket_id).unwrap().name, "Keepers");
    assert_eq!(library.basket_images(basket_id).unwrap(), ids);
}

// ── Membership scenarios ─────────────────────────────────────────

#[test]
fn test_add_then_remove_scenario() {
    let (mut library, clock) = library_with_clock();
    let ids = seed_images(&library, 2);
    let (img1, img2) = (ids[0], ids[1]);
    let basket = library.create_basket("B1", Some(1)).unwrap();
    assert_eq!(library.entry_count(basket.id).unwrap(), 0);

    let added_at = clock.tick();
    library.set_membership(basket.id, &[img1, img2], BasketState::Add).unwrap();
    assert!(library.is_in_basket(basket.id, img1).unwrap());
    assert!(library.is_in_basket(basket.id, img2).unwrap());
    assert_eq!(marker_secs(&library, img1), added_at);
    assert_eq!(marker_secs(&library, img2), added_at);

    let removed_at = clock.tick();
    library.set_membership(basket.id, &[img1], BasketState::Remove).unwrap();
    assert_eq!(library.basket_images(basket.id).unwrap(), vec![img2]);
    assert_eq!(marker_secs(&library, img1), removed_at);
    assert_eq!(marker_secs(&library, img2), added_at);
}

#[test]
fn test_add_remove_repeated_is_idempotent() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 1);
    let basket = library.create_basket("b", None).unwrap();

    for _ in 0..3 {
        library.set_membership(basket.id, &ids, BasketState::Add).unwrap();
    }
    assert!(library.is_in_basket(basket.id, ids[0]).unwrap());
    assert_eq!(library.entry_count(basket.id).unwrap(), 1);

    for _ in 0..3 {
        library.set_membership(basket.id, &ids, BasketState::Remove).unwrap();
    }
    assert!(!library.is_in_basket(basket.id, ids[0]).unwrap());
}

#[test]
fn test_toggle_n_times_matches_parity() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 2);
    let basket = library.create_basket("b", None).unwrap();
    // Start with the second image already selected.
    library.set_membership(basket.id, &ids[1..], BasketState::Add).unwrap();

    for _ in 0..7 {
        library.set_membership(basket.id, &ids, BasketState::Toggle).unwrap();
    }
    assert!(library.is_in_basket(basket.id, ids[0]).unwrap());
    assert!(!library.is_in_basket(basket.id, ids[1]).unwrap());
}

#[test]
fn test_mixed_valid_and_invalid_ids() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 2);
    let basket = library.create_basket("b", None).unwrap();

    let req = BasketStateRequest {
        basket_id: basket.id,
        desired_state: BasketState::Add,
        image_ids: vec![ids[0], -1, ids[1]],
    };
    let outcome = library.set_basket_state(&req).unwrap();
    assert_eq!(outcome.added, ids);
    assert_eq!(outcome.missing, vec![-1]);
    assert_eq!(library.entry_count(basket.id).unwrap(), 2);
}

#[test]
fn test_membership_on_missing_basket() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 1);
    let err = library.set_membership(999, &ids, BasketState::Toggle).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_image_in_several_baskets() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 1);
    let a = library.create_basket("a", Some(1)).unwrap();
    let b = library.create_basket("b", Some(1)).unwrap();
    library.set_membership(a.id, &ids, BasketState::Add).unwrap();
    library.set_membership(b.id, &ids, BasketState::Add).unwrap();

    let in_baskets: Vec<BasketId> = library
        .baskets_for_image(ids[0])
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(in_baskets, vec![a.id, b.id]);
}

// ── Basket lifecycle ─────────────────────────────────────────────

#[test]
fn test_delete_basket_removes_entries_then_not_found() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 3);
    let basket = library.create_basket("doomed", Some(2)).unwrap();
    library.set_membership(basket.id, &ids, BasketState::Add).unwrap();

    assert_eq!(library.delete_basket(basket.id).unwrap(), 3);
    assert!(matches!(library.basket(basket.id).unwrap_err(), Error::BasketNotFound(_)));
    assert_eq!(library.entry_count(basket.id).unwrap(), 0);
    assert!(library.baskets_for_image(ids[0]).unwrap().is_empty());

    assert!(matches!(
        library.delete_basket(basket.id).unwrap_err(),
        Error::BasketNotFound(_)
    ));
}

#[test]
fn test_create_from_request() {
    let library = Library::open_in_memory().unwrap();
    let req = BasketCreateRequest {
        name: "From API".to_string(),
        user_id: Some(5),
    };
    let basket = library.create_basket_from(&req).unwrap();
    assert_eq!(basket.name, "From API");
    assert_eq!(basket.user_id, Some(5));

    let empty = BasketCreateRequest {
        name: String::new(),
        user_id: None,
    };
    assert!(matches!(library.create_basket_from(&empty).unwrap_err(), Error::Validation(_)));
}

#[test]
fn test_default_basket_scenario() {
    let library = Library::open_in_memory().unwrap();
    assert!(library.user_baskets(Some(1)).unwrap().is_empty());

    let d = library.default_basket(1).unwrap();
    let again = library.default_basket(1).unwrap();
    assert_eq!(d.id, again.id);
    assert_eq!(library.user_baskets(Some(1)).unwrap(), vec![d]);
}

#[test]
fn test_user_baskets_snapshot_is_stable() {
    let library = Library::open_in_memory().unwrap();
    for name in ["c", "a", "b"] {
        library.create_basket(name, Some(1)).unwrap();
    }
    let first = library.user_baskets(Some(1)).unwrap();
    let second = library.user_baskets(Some(1)).unwrap();
    assert_eq!(first, second);
}

// ── Dirty markers ────────────────────────────────────────────────

#[test]
fn test_tagging_and_metadata_mark_dirty() {
    let (library, clock) = library_with_clock();
    let id = seed_images(&library, 1)[0];

    let tagged_at = clock.tick();
    assert!(library.tag_image(id, "sunset").unwrap());
    assert_eq!(marker_secs(&library, id), tagged_at);

    // Re-applying an existing tag is not a change.
    clock.tick();
    assert!(!library.tag_image(id, "sunset").unwrap());
    assert_eq!(marker_secs(&library, id), tagged_at);

    let meta_at = clock.tick();
    library
        .set_image_metadata(id, &ImageMetaData {
            caption: Some("Evening".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(marker_secs(&library, id), meta_at);

    let classified_at = clock.tick();
    library.set_classification(id, "sky", 0.92).unwrap();
    assert_eq!(marker_secs(&library, id), classified_at);

    let untagged_at = clock.tick();
    assert!(library.untag_image(id, "sunset").unwrap());
    assert!(library.image_tags(id).unwrap().is_empty());
    assert_eq!(marker_secs(&library, id), untagged_at);
}

#[test]
fn test_toggle_delete_and_clear_mark_dirty() {
    let (mut library, clock) = library_with_clock();
    let ids = seed_images(&library, 3);
    let keep = library.create_basket("keep", Some(1)).unwrap();
    let gone = library.create_basket("gone", Some(1)).unwrap();

    let toggled_at = clock.tick();
    library.set_membership(keep.id, &ids[..2], BasketState::Toggle).unwrap();
    assert_eq!(marker_secs(&library, ids[0]), toggled_at);
    assert_ne!(marker_secs(&library, ids[2]), toggled_at);

    clock.tick();
    library.set_membership(gone.id, &ids[2..], BasketState::Add).unwrap();

    let deleted_at = clock.tick();
    assert_eq!(library.delete_basket(gone.id).unwrap(), 1);
    assert_eq!(marker_secs(&library, ids[2]), deleted_at);
    assert_eq!(marker_secs(&library, ids[0]), toggled_at);

    let cleared_at = clock.tick();
    assert_eq!(library.clear_basket(keep.id).unwrap(), 2);
    assert_eq!(marker_secs(&library, ids[0]), cleared_at);
    assert_eq!(marker_secs(&library, ids[1]), cleared_at);
    assert_eq!(marker_secs(&library, ids[2]), deleted_at);
}

#[test]
fn test_basket_entries_record_when_added() {
    let mut library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 2);
    let basket = library.create_basket("b", None).unwrap();
    library.set_membership(basket.id, &ids, BasketState::Add).unwrap();

    let entries = library.basket_entries(basket.id).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.basket_id == basket.id));
    assert_eq!(entries.iter().map(|e| e.image_id).collect::<Vec<_>>(), ids);
    assert!(entries[0].date_added <= entries[1].date_added);

    assert!(matches!(
        library.basket_entries(999).unwrap_err(),
        Error::BasketNotFound(999)
    ));
}

#[test]
fn test_thumb_url_tracks_marker() {
    let library = Library::open_in_memory().unwrap();
    let ids = seed_images(&library, 1);
    let image = library.image(ids[0]).unwrap();
    assert_eq!(
        library.thumb_url(ids[0], ThumbSize::Small).unwrap(),
        thumb_url(ids[0], ThumbSize::Small, image.last_updated)
    );
    assert_eq!(
        library.image_full_path(ids[0]).unwrap(),
        Path::new("/photos/2024/IMG_0000.jpg")
    );
}

// ── Concurrency across independent connections ──────────────────

#[test]
fn test_concurrent_first_default_basket_resolves_to_one() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("catalog.db");
    drop(Library::open(&db_path).unwrap());

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db_path = db_path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let library = Library::open(&db_path).unwrap();
                barrier.wait();
                library.default_basket(42).unwrap().id
            })
        })
        .collect();

    let ids: Vec<BasketId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|&id| id == ids[0]));

    let library = Library::open(&db_path).unwrap();
    let defaults: Vec<Basket> = library
        .user_baskets(Some(42))
        .unwrap()
        .into_iter()
        .filter(|b| b.is_default)
        .collect();
    assert_eq!(defaults.len(), 1);
}

#[test]
fn test_concurrent_toggles_preserve_parity() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("catalog.db");
    let (basket_id, image_id) = {
        let library = Library::open(&db_path).unwrap();
        let ids = seed_images(&library, 1);
        (library.create_basket("shared", None).unwrap().id, ids[0])
    };

    let threads = 4;
    let toggles_each = 5;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db_path = db_path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut library = Library::open(&db_path).unwrap();
                barrier.wait();
                for _ in 0..toggles_each {
                    library
                        .set_membership(basket_id, &[image_id], BasketState::Toggle)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // 20 toggles in total: back to the initial (absent) state.
    let library = Library::open(&db_path).unwrap();
    assert!(!library.is_in_basket(basket_id, image_id).unwrap());
}

#[test]
fn test_concurrent_adds_to_different_baskets() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("catalog.db");
    let (baskets, ids) = {
        let library = Library::open(&db_path).unwrap();
        let ids = seed_images(&library, 10);
        let baskets: Vec<BasketId> = (0..4)
            .map(|u| library.create_basket("mine", Some(u)).unwrap().id)
            .collect();
        (baskets, ids)
    };

    let handles: Vec<_> = baskets
        .iter()
        .map(|&basket_id| {
            let db_path = db_path.clone();
            let ids = ids.clone();
            thread::spawn(move || {
                let mut library = Library::open(&db_path).unwrap();
                library.set_membership(basket_id, &ids, BasketState::Add).unwrap()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap().added.len(), 10);
    }

    let library = Library::open(&db_path).unwrap();
    for basket_id in baskets {
        assert_eq!(library.entry_count(basket_id).unwrap(), 10);
    }
}
