// Copyright 2023 Remi Bernotavicius

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// `name,measurement_unit`
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

/// `name,color,slug`
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Reads every row of a header-less CSV file. Fields are trimmed.
pub fn decode_records_from_path<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> crate::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(records)
}

#[test]
fn decoding_rows() {
    let path = std::env::temp_dir().join(format!("foodgram-records-{}.csv", std::process::id()));
    std::fs::write(&path, "Salt, g\n\"Flour, wholemeal\",g\n").unwrap();

    let records: Vec<IngredientRecord> = decode_records_from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(
        records,
        vec![
            IngredientRecord {
                name: "Salt".into(),
                measurement_unit: "g".into(),
            },
            IngredientRecord {
                name: "Flour, wholemeal".into(),
                measurement_unit: "g".into(),
            },
        ]
    );
}

#[test]
fn short_rows_are_errors() {
    let path = std::env::temp_dir().join(format!("foodgram-short-{}.csv", std::process::id()));
    std::fs::write(&path, "Breakfast,#E26C2D\n").unwrap();

    let result = decode_records_from_path::<TagRecord>(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
}
