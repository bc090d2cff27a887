#![cfg(feature = "sqlite")]

mod common;

use arorm::{DatabaseConfig, Entity, FromRow, OrmError, OrmResult, Property, Row, Value};
use std::time::Duration;
use common::{Car, Club, Dorm, Student, database, seeded};

#[derive(Debug, PartialEq)]
struct StudentRecord {
    id: i64,
    name: String,
    dorm_id: Option<i64>,
}

impl FromRow for StudentRecord {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            dorm_id: row.try_get("dorm_id")?,
        })
    }
}

#[test]
fn insert_then_find_round_trip() {
    let db = database(DatabaseConfig::new());
    let id = db
        .insert("student", &Row::new().with("name", "Ada").with("dorm_id", Value::Null))
        .unwrap();

    let mut ada = Entity::<Student, _>::find(&db, id.clone()).unwrap().unwrap();
    let row = ada.to_array().unwrap();
    assert_eq!(row.get("name"), Some(&Value::from("Ada")));
    assert_eq!(row.get("dorm_id"), Some(&Value::Null));
    assert_eq!(
        ada.hydrate::<StudentRecord>().unwrap(),
        StudentRecord {
            id: id.as_i64().unwrap(),
            name: "Ada".into(),
            dorm_id: None,
        }
    );
}

#[test]
fn second_save_issues_nothing() {
    let db = database(DatabaseConfig::new().with_logging());
    let mut ada = Entity::<Student, _>::new(&db);
    ada.set("name", "Ada");

    assert!(ada.save().unwrap());
    assert_eq!(db.queries().len(), 1);
    assert!(!ada.save().unwrap());
    assert_eq!(db.queries().len(), 1);

    ada.set("dorm_id", 2);
    assert!(ada.save().unwrap());
    let log = db.queries();
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[1].sql,
        "UPDATE \"student\" SET \"dorm_id\" = ? WHERE ( \"id\" = ? )"
    );
}

#[test]
fn entities_read_their_own_writes_with_result_cache_on() {
    let db = seeded(DatabaseConfig::new().cache_results(Duration::from_secs(60)));

    let mut mary = Entity::<Student, _>::with_id(&db, 1);
    assert_eq!(mary.get_as::<String>("name").unwrap(), "Mary");
    mary.set("name", "Maria");
    assert!(mary.save().unwrap());

    assert!(mary.reload().unwrap());
    assert_eq!(mary.get_as::<String>("name").unwrap(), "Maria");
    let mut again = Entity::<Student, _>::find(&db, 1).unwrap().unwrap();
    assert_eq!(again.get("name").unwrap(), Value::from("Maria"));

    let sam = Entity::<Student, _>::with_id(&db, 3);
    let chess = Entity::<Club, _>::with_id(&db, 1);
    assert!(!sam.has("clubs", &chess).unwrap());
    sam.add("clubs", &chess).unwrap();
    assert!(sam.has("clubs", &chess).unwrap());

    assert_eq!(db.stats().cache_hits, 0);
}

#[test]
fn cascade_delete_counts_every_removed_row() {
    let db = seeded(DatabaseConfig::new().with_logging());
    let mary = Entity::<Student, _>::with_id(&db, 1);
    assert_eq!(mary.delete().unwrap(), 4);

    let statements: Vec<String> = db.queries().into_iter().map(|entry| entry.sql).collect();
    assert_eq!(statements.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));
    assert!(statements.contains(&"DELETE FROM \"car\" WHERE ( \"student_id\" = ? )".to_string()));
    assert!(
        statements.contains(&"DELETE FROM \"memberships\" WHERE ( \"student_id\" = ? )".to_string())
    );

    assert!(Entity::<Student, _>::find(&db, 1).unwrap().is_none());
    assert_eq!(Entity::<Club, _>::count_where(&db, &Row::new()).unwrap(), 2);
}

#[test]
fn failed_cascade_rolls_back() {
    let db = seeded(DatabaseConfig::new());
    db.exec(
        "CREATE TRIGGER keep_memberships BEFORE DELETE ON memberships
         BEGIN SELECT RAISE(ABORT, 'memberships are locked'); END;",
    )
    .unwrap();

    let mary = Entity::<Student, _>::with_id(&db, 1);
    let err = mary.delete().unwrap_err();
    assert!(err.is_driver(), "{err}");
    assert!(err.to_string().contains("cascade delete of student 1"), "{err}");

    assert_eq!(db.count("SELECT COUNT(*) FROM car", &[]).unwrap(), 1);
    assert!(Entity::<Student, _>::find(&db, 1).unwrap().is_some());
}

#[test]
fn many_to_many_links_from_both_sides() {
    let db = seeded(DatabaseConfig::new());
    let sam = Entity::<Student, _>::with_id(&db, 3);
    let chess = Entity::<Club, _>::with_id(&db, 1);

    assert!(!sam.has("clubs", &chess).unwrap());
    sam.add("clubs", &chess).unwrap();
    assert!(sam.has("clubs", &chess).unwrap());
    assert!(chess.has("members", &sam).unwrap());

    let mut members = chess.has_many::<Student>("members").unwrap();
    assert_eq!(members.count().unwrap(), 3);

    assert!(chess.remove("members", &sam).unwrap());
    assert!(!sam.has("clubs", &chess).unwrap());
}

#[test]
fn many_to_many_find_uses_the_target_key() {
    let db = seeded(DatabaseConfig::new().with_logging());
    let mary = Entity::<Student, _>::with_id(&db, 1);

    // memberships has its own `id`; the key column must name the club's.
    let mut drama = mary.has_many::<Club>("clubs").unwrap().find(2).unwrap().unwrap();
    assert_eq!(drama.pk(), &Value::Int(2));
    assert_eq!(drama.get_as::<String>("name").unwrap(), "Drama");

    let sql = db.queries().last().map(|entry| entry.sql.clone()).unwrap();
    assert!(sql.ends_with("AND ( \"t1\".\"id\" = ? )\nLIMIT 1"), "{sql}");

    let mut clubs = mary.many_query("clubs").unwrap();
    let chess = clubs.find(1).unwrap().unwrap();
    assert_eq!(chess.get("name"), Some(&Value::from("Chess")));

    let sam = Entity::<Student, _>::with_id(&db, 3);
    assert!(sam.has_many::<Club>("clubs").unwrap().find(1).unwrap().is_none());
}

#[test]
fn unknown_link_alias() {
    let db = seeded(DatabaseConfig::new());
    let mary = Entity::<Student, _>::with_id(&db, 1);
    let chess = Entity::<Club, _>::with_id(&db, 1);
    assert!(matches!(
        mary.has("hobbies", &chess),
        Err(OrmError::UnknownRelation { .. })
    ));
    assert!(matches!(
        mary.add("dorm", &chess),
        Err(OrmError::UnknownRelation { .. })
    ));
}

#[test]
fn relationship_properties() {
    let db = seeded(DatabaseConfig::new());

    let mut civic = Entity::<Car, _>::with_id(&db, 1);
    let mut owner = civic.belongs_to::<Student>("owner").unwrap().unwrap();
    assert_eq!(owner.get_as::<String>("name").unwrap(), "Mary");

    let mut dorm = owner.belongs_to::<Dorm>("dorm").unwrap().unwrap();
    let Property::Many(mut residents) = dorm.property("students").unwrap() else {
        panic!("students is a has_many");
    };
    assert_eq!(residents.count().unwrap(), 2);

    let mut car = owner.has_one::<Car>("car").unwrap().unwrap();
    assert_eq!(car.get_as::<String>("name").unwrap(), "Civic");

    let mut sam = Entity::<Student, _>::with_id(&db, 3);
    assert!(sam.has_one::<Car>("car").unwrap().is_none());
    assert!(matches!(
        sam.property("nickname"),
        Err(OrmError::MissingProperty { .. })
    ));
}

#[test]
fn typed_queries_over_a_model() {
    let db = seeded(DatabaseConfig::new());

    let mut query = db.model::<Student>();
    let mut first = query.and_eq("dorm_id", 2).first().unwrap().unwrap();
    assert_eq!(first.get_as::<String>("name").unwrap(), "Sam");

    assert_eq!(query.count().unwrap(), 3);
    assert!(query.find(7).unwrap().is_none());

    let moved = query.and_eq("dorm_id", 1).update(&Row::new().with("dorm_id", 2)).unwrap();
    assert_eq!(moved, 2);
    let south = Entity::<Student, _>::fetch_where(&db, &Row::new().with("dorm_id", 2), None, None)
        .unwrap();
    assert_eq!(south.len(), 3);
}
