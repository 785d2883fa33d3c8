//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise create/update/relation resolution end to end on an in-memory
//!   database.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Pass an absolute directory as the first argument to also write log files.

use log::info;
use recordmap_core::db::open_db_in_memory;
use recordmap_core::{
    default_log_level, init_logging, Clause, Entity, FieldDescriptor, FieldType, Manager,
    ManagerRegistry, MapResult, Record, RelationshipDeclaration, Relationships, SqliteStorage,
    Storage, Value,
};
use std::sync::Arc;

const SCHEMA_SQL: &str = "
    CREATE TABLE authors (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
    CREATE TABLE books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES authors(id),
        title TEXT NOT NULL
    );
";

struct Author {
    record: Record,
}

impl Entity for Author {
    const TABLE: &'static str = "authors";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Integer),
            FieldDescriptor::new("name", FieldType::Text),
        ]
    }

    fn relationships() -> Relationships {
        Relationships::new().with(
            "books",
            RelationshipDeclaration::many("books", Clause::owner_field("t.author_id", "id")),
        )
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

struct Book {
    record: Record,
}

impl Entity for Book {
    const TABLE: &'static str = "books";

    fn fields() -> Vec<FieldDescriptor> {
        vec!["id".into(), "author_id".into(), "title".into()]
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

fn main() {
    if let Some(log_dir) = std::env::args().nth(1) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("recordmap_core version={}", recordmap_core::core_version());
    if let Err(err) = run() {
        eprintln!("recordmap_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> MapResult<()> {
    let sqlite = SqliteStorage::new(open_db_in_memory()?);
    sqlite.with_connection(|conn| conn.execute_batch(SCHEMA_SQL))?;
    let storage: Arc<dyn Storage> = Arc::new(sqlite);

    let mut registry = ManagerRegistry::new(Arc::clone(&storage));
    registry.register_entity::<Author>("authors")?;
    registry.register_entity::<Book>("books")?;

    let authors: Manager<Author> = Manager::new(Arc::clone(&storage))?;
    let books: Manager<Book> = Manager::new(Arc::clone(&storage))?;

    let mut author = authors.fresh([("name", Value::from("Ursula"))], true);
    println!("create author={:?}", authors.create(&mut author)?);
    let author_id = author.record().primary_key_value().clone();

    for title in ["The Dispossessed", "The Lathe of Heaven"] {
        let mut book = books.fresh(
            [("author_id", author_id.clone()), ("title", Value::from(title))],
            true,
        );
        books.create(&mut book)?;
    }

    author.record_mut().set("name", "Ursula K. Le Guin");
    println!("update author={:?}", authors.update(&mut author)?);
    println!("update again={:?}", authors.update(&mut author)?);
    authors.refresh(&mut author)?;
    println!("author name={}", author.record().get("name"));

    let mut relations = authors.relations(&author, &registry)?;
    for book in relations.get("books")?.records() {
        println!("book title={}", book.get("title"));
    }

    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}
