// In-memory tantivy index.
// Indexes name, description, topics and README of each item under its full name.

use std::sync::{Mutex, MutexGuard};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, RegexQuery};
use tantivy::schema::{Field, STORED, STRING, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use crate::error::{Result, StarError};
use crate::model::{Item, SearchHit};

use super::TextIndex;

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Each substring clause scores a constant; this keeps a single partial match below the
/// default minimum score so that partial words need to hit more than one field.
pub const WILDCARD_BOOST: f32 = 0.25;

struct Fields {
    key: Field,
    name: Field,
    description: Field,
    topics: Field,
    readme: Field,
}

impl Fields {
    fn text(&self) -> Vec<Field> {
        vec![self.name, self.description, self.topics, self.readme]
    }
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let fields = Fields {
        key: builder.add_text_field("key", STRING | STORED),
        name: builder.add_text_field("name", TEXT),
        description: builder.add_text_field("description", TEXT),
        topics: builder.add_text_field("topics", TEXT),
        readme: builder.add_text_field("readme", TEXT),
    };
    (builder.build(), fields)
}

/// Tantivy index held entirely in RAM, rebuilt every process start.
pub struct MemoryIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
}

impl MemoryIndex {
    pub fn new() -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let writer = index.writer(WRITER_MEMORY_BUDGET)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    fn writer(&self) -> Result<MutexGuard<'_, IndexWriter>> {
        self.writer
            .lock()
            .map_err(|_| StarError::Other("index writer lock poisoned".to_string()))
    }

    fn document(&self, key: &str, item: &Item) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.key, key);
        doc.add_text(self.fields.name, &item.full_name);
        doc.add_text(self.fields.description, &item.description);
        for topic in &item.topics {
            doc.add_text(self.fields.topics, topic);
        }
        doc.add_text(self.fields.readme, &item.readme);
        doc
    }

    fn collect(&self, query: &dyn Query, max_hits: usize) -> Result<Vec<SearchHit>> {
        if max_hits == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(max_hits))
            .map_err(query_error)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address).map_err(query_error)?;
            if let Some(key) = doc.get_first(self.fields.key).and_then(|v| v.as_str()) {
                hits.push(SearchHit::new(key, score));
            }
        }
        Ok(hits)
    }
}

fn query_error(err: tantivy::TantivyError) -> StarError {
    StarError::IndexQuery(err.to_string())
}

/// Lowercased alphanumeric fragments of `text`, deduplicated.
fn fragments(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for fragment in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|f| !f.is_empty())
    {
        let fragment = fragment.to_lowercase();
        if !out.contains(&fragment) {
            out.push(fragment);
        }
    }
    out
}

impl TextIndex for MemoryIndex {
    fn upsert(&self, key: &str, item: &Item) -> Result<()> {
        let writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.key, key));
        writer.add_document(self.document(key, item))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.key, key));
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut writer = self.writer()?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn match_query(&self, text: &str, max_hits: usize) -> Result<Vec<SearchHit>> {
        let parser = QueryParser::for_index(&self.index, self.fields.text());
        let (query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            debug!(text, errors = errors.len(), "ignored unparsable parts of query");
        }
        self.collect(query.as_ref(), max_hits)
    }

    fn wildcard_query(&self, text: &str, max_hits: usize) -> Result<Vec<SearchHit>> {
        let fragments = fragments(text);
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for fragment in &fragments {
            let pattern = format!(".*{}.*", fragment);
            for field in self.fields.text() {
                let regex: Box<dyn Query> =
                    Box::new(RegexQuery::from_pattern(&pattern, field).map_err(query_error)?);
                clauses.push((Occur::Should, regex));
            }
        }

        let query = BoostQuery::new(Box::new(BooleanQuery::new(clauses)), WILDCARD_BOOST);
        self.collect(&query, max_hits)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.reader.searcher().num_docs())
    }
}
