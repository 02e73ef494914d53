use crate::store::keys;
use crate::store::operations::courses::Lesson;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_lesson_module_index", m002_lesson_module_index),
    ]
}

/// Run all unapplied migrations.
///
/// Each migration must be idempotent: a crash between a migration completing
/// and its version checkpoint being written means the migration re-runs on
/// the next startup. Versions are persisted after each step and never move
/// backwards.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("refusing to downgrade from version {current}"),
        });
    }
    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    // Trees are created on open; nothing to backfill for a fresh store.
    Ok(())
}

/// Rebuild the (module, lesson) index from the lessons tree. Safe to re-run:
/// inserts are keyed and the values are empty.
fn m002_lesson_module_index(store: &Store) -> Result<(), StoreError> {
    for item in store.lessons.iter() {
        let (_, raw) = item?;
        let lesson: Lesson = Store::deserialize(&raw)?;
        let index_key = keys::lesson_module_index_key(&lesson.module_id, &lesson.id);
        store
            .lesson_module_index
            .insert(index_key.as_bytes(), &[])?;
    }
    Ok(())
}
