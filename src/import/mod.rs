// Copyright 2023 Remi Bernotavicius

//! Seeding the ingredient and tag catalogs from CSV files.

use crate::database;
use crate::query::catalog::{self, TagRequest};
use crate::Result;
use diesel::dsl::exists;
use diesel::prelude::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use serde::de::DeserializeOwned;
use std::path::Path;

mod records;

pub use records::{IngredientRecord, TagRecord};

/// A row that can be written into the catalog. Storing a row that is already
/// present is not an error.
pub trait CatalogRecord: DeserializeOwned {
    const KIND: &'static str;

    fn store(&self, conn: &mut database::Connection) -> Result<()>;
}

impl CatalogRecord for IngredientRecord {
    const KIND: &'static str = "ingredients";

    fn store(&self, conn: &mut database::Connection) -> Result<()> {
        catalog::get_or_create_ingredient(conn, &self.name, &self.measurement_unit)?;
        Ok(())
    }
}

impl CatalogRecord for TagRecord {
    const KIND: &'static str = "tags";

    fn store(&self, conn: &mut database::Connection) -> Result<()> {
        use database::schema::tags::dsl::*;

        let present: bool =
            diesel::select(exists(tags.filter(slug.eq(&self.slug)))).get_result(conn)?;
        if present {
            log::info!("tag {:?} already present, skipping", self.slug);
            return Ok(());
        }
        catalog::create_tag(
            conn,
            &TagRequest {
                name: self.name.clone(),
                color: self.color.clone(),
                slug: self.slug.clone(),
            },
        )?;
        Ok(())
    }
}

pub struct CatalogImporter<T> {
    // Kept in reverse file order so batches come off the end.
    pending: Vec<T>,
    num_imported: usize,
    total: usize,
}

impl<T: CatalogRecord> CatalogImporter<T> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut pending: Vec<T> = records::decode_records_from_path(path)?;
        pending.reverse();
        let total = pending.len();

        Ok(Self {
            pending,
            num_imported: 0,
            total,
        })
    }

    pub fn done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn num_imported(&self) -> usize {
        self.num_imported
    }

    pub fn percent_done(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.num_imported as f32 / self.total as f32
    }

    /// Stores the next batch in one transaction.
    pub fn import_one(&mut self, conn: &mut database::Connection) -> Result<()> {
        assert!(!self.done());

        const BATCH_SIZE: usize = 50;
        let split_point = self.pending.len().saturating_sub(BATCH_SIZE);
        let batch = self.pending.split_off(split_point);

        conn.transaction(|conn| {
            for record in batch.iter().rev() {
                record.store(conn)?;
            }
            Result::Ok(())
        })?;
        self.num_imported += batch.len();

        Ok(())
    }
}

pub fn import_catalog<T: CatalogRecord>(
    mut conn: database::Connection,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut importer = CatalogImporter::<T>::new(path)?;

    while !importer.done() {
        importer.import_one(&mut conn)?;
        log::info!("imported {:.0}% of {}", importer.percent_done() * 100.0, T::KIND);
    }
    log::info!("processed {} {}", importer.num_imported(), T::KIND);

    Ok(())
}

#[cfg(test)]
fn write_csv(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("foodgram-{name}-{}.csv", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn importing_ingredients_in_batches() {
    let mut rows = String::new();
    for n in 0..120 {
        rows.push_str(&format!("ingredient {n},g\n"));
    }
    // Repeats collapse onto the existing row.
    rows.push_str("ingredient 7,g\n");
    let path = write_csv("ingredients", &rows);

    let mut conn = database::in_memory();
    let mut importer = CatalogImporter::<IngredientRecord>::new(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(importer.percent_done(), 0.0);

    let mut batches = 0;
    while !importer.done() {
        importer.import_one(&mut conn).unwrap();
        batches += 1;
    }
    assert_eq!(batches, 3);
    assert_eq!(importer.num_imported(), 121);
    assert_eq!(importer.percent_done(), 1.0);

    let all = catalog::search_ingredients(&mut conn, None).unwrap();
    assert_eq!(all.len(), 120);
}

#[test]
fn importing_tags_twice_is_harmless() {
    let path = write_csv(
        "tags",
        "Breakfast,#E26C2D,breakfast\nLunch,49b64e,lunch\nDinner,#8775D2,dinner\n",
    );

    let mut conn = database::in_memory();
    for _ in 0..2 {
        let mut importer = CatalogImporter::<TagRecord>::new(&path).unwrap();
        while !importer.done() {
            importer.import_one(&mut conn).unwrap();
        }
    }
    std::fs::remove_file(&path).unwrap();

    let colors: Vec<(String, String)> = catalog::list_tags(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| (t.slug, t.color))
        .collect();
    assert_eq!(
        colors,
        [
            ("breakfast".to_owned(), "#E26C2D".to_owned()),
            ("dinner".to_owned(), "#8775D2".to_owned()),
            ("lunch".to_owned(), "#49B64E".to_owned()),
        ]
    );
}

#[test]
fn a_bad_row_rolls_back_its_batch() {
    let path = write_csv("bad-tags", "Breakfast,#E26C2D,breakfast\nBrunch,not-a-color,brunch\n");

    let mut conn = database::in_memory();
    let mut importer = CatalogImporter::<TagRecord>::new(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(importer.import_one(&mut conn).is_err());
    assert!(catalog::list_tags(&mut conn).unwrap().is_empty());
}
