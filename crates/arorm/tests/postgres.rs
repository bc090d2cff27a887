//! Runs against a live server when `DATABASE_URL` is set (directly or in `.env`).

#![cfg(feature = "postgres")]

use arorm::{
    Connect, ConnectionConfig, Database, DatabaseConfig, Entity, Model, PgDriver, RelationDef, RelationDefs,
    Row, Value,
};
use std::env;

struct Author;

impl Model for Author {
    const NAME: &'static str = "author";
    const CASCADE_DELETE: bool = true;

    fn relations() -> RelationDefs {
        RelationDefs::new().has_many("books", RelationDef::new())
    }
}

fn connect() -> Option<Database<PgDriver>> {
    dotenvy::dotenv().ok();
    let url = env::var("DATABASE_URL").ok()?;
    let driver = PgDriver::connect(&ConnectionConfig::new(url)).unwrap();
    let db = Database::with_config(driver, DatabaseConfig::new().with_logging());
    db.exec(
        "CREATE TEMP TABLE author (id SERIAL PRIMARY KEY, name TEXT NOT NULL);
         CREATE TEMP TABLE book (id SERIAL PRIMARY KEY, author_id INT NOT NULL, title TEXT);",
    )
    .unwrap();
    db.clear_queries();
    Some(db)
}

#[test]
fn entity_lifecycle_on_postgres() {
    let Some(db) = connect() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let mut author = Entity::<Author, _>::new(&db);
    author.set("name", "Le Guin");
    assert!(author.save().unwrap());
    let id = author.pk().clone();
    assert!(!id.is_empty_key());

    db.insert("book", &Row::new().with("author_id", &id).with("title", "The Dispossessed"))
        .unwrap();
    db.insert("book", &Row::new().with("author_id", &id).with("title", "Lathe of Heaven"))
        .unwrap();

    let mut books = author.many_query("books").unwrap();
    assert_eq!(books.count().unwrap(), 2);

    let sql = &db.queries()[0].sql;
    assert!(sql.contains("$1"), "placeholders are numbered: {sql}");

    let mut found = Entity::<Author, _>::with_id(&db, id.clone());
    assert_eq!(found.get("name").unwrap(), Value::from("Le Guin"));
    assert_eq!(found.delete().unwrap(), 3);
}

#[test]
fn schema_introspection_on_postgres() {
    let Some(db) = connect() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let tables = db.list_tables(Some("boo")).unwrap();
    assert!(tables.contains(&"book".to_string()), "{tables:?}");
    assert_eq!(db.list_columns("author", None).unwrap(), vec!["id", "name"]);
    assert_eq!(db.list_columns("book", Some("title")).unwrap(), vec!["title"]);
}
