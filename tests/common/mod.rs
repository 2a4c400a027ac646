use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

pub struct Sale<'a> {
    pub art: &'a str,
    pub width: Option<i64>,
    pub thickness: [Option<&'a str>; 3],
    pub recipe: Option<&'a str>,
    pub quantity: Option<f64>,
    pub unit: Option<&'a str>,
    pub date: &'a str,
}

impl<'a> Sale<'a> {
    pub fn new(art: &'a str, date: &'a str) -> Self {
        Self {
            art,
            width: None,
            thickness: [None, None, None],
            recipe: None,
            quantity: None,
            unit: None,
            date,
        }
    }

    pub fn film(
        art: &'a str,
        recipe: &'a str,
        thickness: [Option<&'a str>; 3],
        quantity: f64,
        date: &'a str,
    ) -> Self {
        Self {
            art,
            width: Some(420),
            thickness,
            recipe: Some(recipe),
            quantity: Some(quantity),
            unit: Some("KG"),
            date,
        }
    }
}

/// Creates `sales.db` with a `ZO` table in `dir`.
pub fn create_sales_db(dir: &Path, sales: &[Sale<'_>]) -> PathBuf {
    let path = dir.join("sales.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE ZO (
            ART TEXT NOT NULL,
            SZEROKOSC_1 INTEGER,
            GRUBOSC_11 TEXT,
            GRUBOSC_21 TEXT,
            GRUBOSC_31 TEXT,
            RECEPTURA_1 TEXT,
            TECH REAL,
            JM2 TEXT,
            TERMIN_ZAK TEXT
        );
        "#,
    )
    .unwrap();

    for sale in sales {
        conn.execute(
            "INSERT INTO ZO VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                sale.art,
                sale.width,
                sale.thickness[0],
                sale.thickness[1],
                sale.thickness[2],
                sale.recipe,
                sale.quantity,
                sale.unit,
                sale.date,
            ],
        )
        .unwrap();
    }
    path
}

#[allow(dead_code)]
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
