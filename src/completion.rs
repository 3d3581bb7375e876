//! Field-name completion driven by example data.
//!
//! The completer fetches the most recently updated document of a bucket once
//! and offers the keys found at the dotted path under the cursor. The
//! document is cached until the bucket changes or the cache is cleared.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{objects::Document, Client};

/// Provides the example document of a bucket.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// The most recently updated document of `bucket`, or an empty object.
    async fn latest_document(&self, bucket: &str) -> Document;
}

#[async_trait]
impl DocumentSource for Client {
    async fn latest_document(&self, bucket: &str) -> Document {
        self.objects.latest(bucket).await
    }
}

/// A cursor position in the editor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    /// Offset in characters from the start of the row.
    pub column: usize,
}

/// A completion entry as the editor expects it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub caption: String,
    pub value: String,
    pub meta: String,
}

impl Completion {
    fn field(name: String) -> Self {
        Self {
            caption: name.clone(),
            value: name,
            meta: "field name".to_string(),
        }
    }
}

/// Completes field paths of one bucket.
#[derive(Debug)]
pub struct FieldCompleter<S = Client> {
    source: S,
    bucket: Option<String>,
    cache: Option<Document>,
}

impl<S: DocumentSource> FieldCompleter<S> {
    /// Creates a completer for `bucket`. An empty name disables completion.
    pub fn new(source: S, bucket: impl Into<String>) -> Self {
        let mut completer = Self {
            source,
            bucket: None,
            cache: None,
        };
        completer.set_bucket(bucket);
        completer
    }

    /// Switches to another bucket and drops the cached document.
    pub fn set_bucket(&mut self, bucket: impl Into<String>) {
        let bucket = bucket.into();
        self.bucket = if bucket.is_empty() { None } else { Some(bucket) };
        self.clear_cache();
    }

    /// Drops the cached document, the next completion fetches it again.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// The completions for the path segment under the cursor.
    ///
    /// Only the first row of the input is completed.
    #[instrument(skip(self))]
    pub async fn completions(&mut self, input: &str, position: Position) -> Vec<Completion> {
        let bucket = match &self.bucket {
            Some(bucket) if position.row == 0 => bucket,
            _ => return Vec::new(),
        };

        if self.cache.is_none() {
            debug!(bucket = %bucket, "fetching example document");
            self.cache = Some(self.source.latest_document(bucket).await);
        }
        match &self.cache {
            Some(doc) => build_completions(doc, input, position.column),
            None => Vec::new(),
        }
    }
}

fn build_completions(doc: &Document, input: &str, cursor: usize) -> Vec<Completion> {
    let depth = input.chars().take(cursor).filter(|c| *c == '.').count();

    let mut current = Some(doc);
    for segment in input.split('.').take(depth) {
        current = match current {
            Some(Value::Object(map)) => map.get(segment),
            Some(Value::Array(items)) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => break,
        };
    }

    match current {
        Some(Value::Object(map)) => map.keys().cloned().map(Completion::field).collect(),
        Some(Value::Array(items)) => (0..items.len())
            .map(|i| Completion::field(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use serde_json::json;

    use super::*;

    #[derive(Clone)]
    struct Stub {
        doc: Document,
        calls: Arc<AtomicUsize>,
    }

    impl Stub {
        fn new(doc: Document) -> Self {
            Self {
                doc,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSource for Stub {
        async fn latest_document(&self, _bucket: &str) -> Document {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.doc.clone()
        }
    }

    fn example() -> Document {
        json!({
            "_id": "123456789012345678901234",
            "payload": {
                "field1": 111.1,
                "field2": 222.2,
                "field3": { "field31": 31.1, "field32": 32.1, "field33": 33.1 }
            },
            "array": [{ "array1": 1, "array2": 2 }, "array2", 1234],
            "nul": null,
            "updatedAt": "2018-01-01T00:00:00.011Z"
        })
    }

    fn names(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.value.as_str()).collect()
    }

    fn at(column: usize) -> Position {
        Position { row: 0, column }
    }

    #[tokio::test]
    async fn test_top_level_and_cache() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");

        let completions = completer.completions("a", at(1)).await;
        assert_eq!(
            names(&completions),
            vec!["_id", "payload", "array", "nul", "updatedAt"]
        );
        assert_eq!(
            completions[0],
            Completion {
                caption: "_id".to_string(),
                value: "_id".to_string(),
                meta: "field name".to_string(),
            }
        );

        completer.completions("a", at(1)).await;
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_array_indices_and_clear_cache() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");

        let completions = completer.completions("array.0", at(6)).await;
        assert_eq!(names(&completions), vec!["0", "1", "2"]);
        assert_eq!(stub.calls(), 1);

        completer.clear_cache();
        let completions = completer.completions("array.0", at(6)).await;
        assert_eq!(names(&completions), vec!["0", "1", "2"]);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_nested_follows_cursor() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");

        let completions = completer.completions("payload.field3.f", at(15)).await;
        assert_eq!(names(&completions), vec!["field31", "field32", "field33"]);

        let completions = completer.completions("payload.field3.f", at(10)).await;
        assert_eq!(names(&completions), vec!["field1", "field2", "field3"]);

        let completions = completer.completions("array.0.a", at(8)).await;
        assert_eq!(names(&completions), vec!["array1", "array2"]);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_dead_ends_are_empty() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");

        for (input, column) in [
            ("updatedAt.a", 10),
            ("unknown.field.a", 14),
            ("nul.field", 8),
            ("array.3.a", 8),
            ("array.x.a", 8),
        ] {
            assert!(
                completer.completions(input, at(column)).await.is_empty(),
                "{input} at {column}"
            );
        }
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_document() {
        let stub = Stub::new(json!({}));
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");
        assert!(completer.completions("a", at(1)).await.is_empty());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_fetch_without_bucket_or_off_first_row() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "");
        assert!(completer.completions("a", at(1)).await.is_empty());

        completer.set_bucket("bucket1");
        let position = Position { row: 1, column: 1 };
        assert!(completer.completions("a", position).await.is_empty());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_set_bucket_clears_cache() {
        let stub = Stub::new(example());
        let mut completer = FieldCompleter::new(stub.clone(), "bucket1");
        completer.completions("a", at(1)).await;
        completer.set_bucket("bucket2");
        completer.completions("a", at(1)).await;
        assert_eq!(stub.calls(), 2);
    }

    #[test]
    fn test_cursor_past_end() {
        let completions = build_completions(&example(), "payload.", 100);
        assert_eq!(names(&completions), vec!["field1", "field2", "field3"]);
    }
}
