#![allow(dead_code)]

use arorm::{Database, DatabaseConfig, Model, RelationDef, RelationDefs, SqliteDriver};

pub struct Student;

impl Model for Student {
    const NAME: &'static str = "student";
    const CASCADE_DELETE: bool = true;

    fn relations() -> RelationDefs {
        RelationDefs::new()
            .has_many("clubs", RelationDef::new().through("memberships"))
            .has_one("car", RelationDef::new())
            .belongs_to("dorm", RelationDef::new())
    }
}

pub struct Club;

impl Model for Club {
    const NAME: &'static str = "club";

    fn relations() -> RelationDefs {
        RelationDefs::new().has_many(
            "members",
            RelationDef::new()
                .model("student")
                .through("memberships")
                .far_key("student_id"),
        )
    }
}

pub struct Dorm;

impl Model for Dorm {
    const NAME: &'static str = "dorm";

    fn relations() -> RelationDefs {
        RelationDefs::new().has_many("students", RelationDef::new())
    }
}

pub struct Car;

impl Model for Car {
    const NAME: &'static str = "car";

    fn relations() -> RelationDefs {
        RelationDefs::new().belongs_to(
            "owner",
            RelationDef::new().model("student").foreign_key("student_id"),
        )
    }
}

pub const SCHEMA: &str = "
    CREATE TABLE dorm (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE student (id INTEGER PRIMARY KEY, name TEXT NOT NULL, dorm_id INTEGER);
    CREATE TABLE club (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE memberships (
        id INTEGER PRIMARY KEY,
        student_id INTEGER NOT NULL,
        club_id INTEGER NOT NULL
    );
    CREATE TABLE car (id INTEGER PRIMARY KEY, student_id INTEGER, name TEXT);
";

pub fn database(config: DatabaseConfig) -> Database<SqliteDriver> {
    let db = Database::with_config(SqliteDriver::open_in_memory().unwrap(), config);
    db.exec(SCHEMA).unwrap();
    db.clear_queries();
    db
}

pub fn seeded(config: DatabaseConfig) -> Database<SqliteDriver> {
    let db = database(config);
    db.exec(
        "INSERT INTO dorm (name) VALUES ('North'), ('South');
         INSERT INTO student (name, dorm_id) VALUES ('Mary', 1), ('John', 1), ('Sam', 2);
         INSERT INTO club (name) VALUES ('Chess'), ('Drama');
         INSERT INTO memberships (student_id, club_id) VALUES (1, 1), (1, 2), (2, 1);
         INSERT INTO car (student_id, name) VALUES (1, 'Civic');",
    )
    .unwrap();
    db.clear_queries();
    db
}
