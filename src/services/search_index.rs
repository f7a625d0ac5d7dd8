//! Persistent full-text search index.
//!
//! One `content` text field per document. Documents are stored in
//! `<dir>/index.json`; positional postings and the BM25 engine are rebuilt in
//! memory on open. Appends take the write lock and are persisted before
//! returning; searches share the read lock.
//!
//! Query grammar:
//! - `a b` and `a AND b` match documents containing both
//! - `a OR b` matches either
//! - `NOT a` and `-a` exclude
//! - `"a b"` matches the exact phrase
//! - parentheses group
//!
//! The grammar selects the matching documents; `bm25` ranks them by the
//! query's positive terms.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bm25::{Document, Language, SearchEngineBuilder};
use serde::{Deserialize, Serialize};

use super::text::tokenize::terms;
use super::text::SearchHit;
use crate::error::{ServiceError, ServiceResult};

const INDEX_FILE: &str = "index.json";
const FIELD_NAME: &str = "content";

/// Default number of hits returned by `search`.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
struct StoredIndex {
    /// Field name -> field type.
    schema: HashMap<String, String>,
    documents: Vec<String>,
}

struct IndexState {
    documents: Vec<String>,
    /// term -> doc -> positions
    postings: HashMap<String, HashMap<usize, Vec<usize>>>,
    ranker: bm25::SearchEngine<u64>,
}

impl IndexState {
    fn from_documents(documents: Vec<String>) -> Self {
        let corpus: Vec<Document<u64>> = documents
            .iter()
            .enumerate()
            .map(|(id, text)| Document {
                id: id as u64,
                contents: text.clone(),
            })
            .collect();
        let mut state = Self {
            documents: Vec::with_capacity(documents.len()),
            postings: HashMap::new(),
            ranker: SearchEngineBuilder::<u64>::with_documents(Language::English, corpus).build(),
        };
        for text in documents {
            state.add_postings(text);
        }
        state
    }

    fn add_postings(&mut self, text: String) -> usize {
        let doc = self.documents.len();
        for (pos, term) in terms(&text).into_iter().enumerate() {
            self.postings
                .entry(term)
                .or_default()
                .entry(doc)
                .or_default()
                .push(pos);
        }
        self.documents.push(text);
        doc
    }

    fn add(&mut self, text: String) -> usize {
        self.ranker.upsert(Document {
            id: self.documents.len() as u64,
            contents: text.clone(),
        });
        self.add_postings(text)
    }

    /// BM25 score of every document sharing a term with `query_terms`.
    fn scores(&self, query_terms: &[String]) -> HashMap<usize, f64> {
        if query_terms.is_empty() {
            return HashMap::new();
        }
        self.ranker
            .search(&query_terms.join(" "), self.documents.len())
            .into_iter()
            .map(|result| (result.document.id as usize, f64::from(result.score)))
            .collect()
    }

    fn all_docs(&self) -> BTreeSet<usize> {
        (0..self.documents.len()).collect()
    }

    fn docs_with(&self, term: &str) -> BTreeSet<usize> {
        self.postings
            .get(term)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    fn docs_with_phrase(&self, phrase: &[String]) -> BTreeSet<usize> {
        let Some(first) = phrase.first() else {
            return BTreeSet::new();
        };
        let Some(first_postings) = self.postings.get(first) else {
            return BTreeSet::new();
        };
        first_postings
            .iter()
            .filter(|(doc, starts)| {
                starts.iter().any(|start| {
                    phrase.iter().enumerate().skip(1).all(|(offset, term)| {
                        self.postings
                            .get(term)
                            .and_then(|p| p.get(doc))
                            .is_some_and(|positions| positions.contains(&(start + offset)))
                    })
                })
            })
            .map(|(doc, _)| *doc)
            .collect()
    }

    fn evaluate(&self, query: &Query) -> Option<BTreeSet<usize>> {
        match query {
            Query::Term(term) => Some(self.docs_with(term)),
            Query::Phrase(phrase) => Some(self.docs_with_phrase(phrase)),
            Query::Not(inner) => {
                let excluded = self.evaluate(inner)?;
                Some(self.all_docs().difference(&excluded).copied().collect())
            }
            Query::And(children) => children
                .iter()
                .filter_map(|c| self.evaluate(c))
                .reduce(|a, b| a.intersection(&b).copied().collect()),
            Query::Or(children) => children
                .iter()
                .filter_map(|c| self.evaluate(c))
                .reduce(|a, b| a.union(&b).copied().collect()),
            Query::Empty => None,
        }
    }
}

/// Parsed query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(String),
    Phrase(Vec<String>),
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
    /// Nothing searchable, e.g. only stop words.
    Empty,
}

impl Query {
    /// Terms that contribute to ranking (those not under a negation).
    fn positive_terms(&self, out: &mut Vec<String>) {
        match self {
            Query::Term(t) => out.push(t.clone()),
            Query::Phrase(p) => out.extend(p.iter().cloned()),
            Query::And(c) | Query::Or(c) => c.iter().for_each(|q| q.positive_terms(out)),
            Query::Not(_) | Query::Empty => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Word(String),
    Phrase(String),
}

fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let phrase: String = chars.by_ref().take_while(|c| *c != '"').collect();
                tokens.push(Token::Phrase(phrase));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                match word.as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    w if w.len() > 1 && w.starts_with('-') => {
                        tokens.push(Token::Not);
                        tokens.push(Token::Word(w[1..].to_string()));
                    }
                    _ => tokens.push(Token::Word(word)),
                }
            }
        }
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Query {
        let mut children = vec![self.parse_and()];
        while self.peek() == Some(&Token::Or) {
            self.next();
            children.push(self.parse_and());
        }
        collapse(children, Query::Or)
    }

    fn parse_and(&mut self) -> Query {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => break,
                Some(Token::And) => {
                    self.next();
                }
                _ => children.push(self.parse_unary()),
            }
        }
        collapse(children, Query::And)
    }

    fn parse_unary(&mut self) -> Query {
        if self.peek() == Some(&Token::Not) {
            self.next();
            return match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => Query::Empty,
                _ => match self.parse_unary() {
                    Query::Empty => Query::Empty,
                    inner => Query::Not(Box::new(inner)),
                },
            };
        }
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or();
                if self.peek() == Some(&Token::RParen) {
                    self.next();
                }
                inner
            }
            Some(Token::Word(w)) => analyze(&w),
            Some(Token::Phrase(p)) => analyze(&p),
            _ => Query::Empty,
        }
    }
}

/// Analyse free text into a term or phrase query.
fn analyze(text: &str) -> Query {
    let mut t = terms(text);
    match t.len() {
        0 => Query::Empty,
        1 => Query::Term(t.remove(0)),
        _ => Query::Phrase(t),
    }
}

fn collapse(children: Vec<Query>, wrap: fn(Vec<Query>) -> Query) -> Query {
    let mut children: Vec<Query> = children
        .into_iter()
        .filter(|q| *q != Query::Empty)
        .collect();
    match children.len() {
        0 => Query::Empty,
        1 => children.remove(0),
        _ => wrap(children),
    }
}

/// Parse a query string. Parsing never fails; unmatched parentheses and
/// dangling operators are ignored.
pub fn parse_query(input: &str) -> Query {
    let mut parser = Parser {
        tokens: lex(input),
        pos: 0,
    };
    let mut clauses = Vec::new();
    while parser.pos < parser.tokens.len() {
        clauses.push(parser.parse_or());
        // Skip a stray closing parenthesis
        if parser.peek() == Some(&Token::RParen) {
            parser.next();
        }
    }
    collapse(clauses, Query::And)
}

/// Process-wide document index, opened at startup and shut down explicitly.
pub struct SearchIndex {
    path: PathBuf,
    state: RwLock<IndexState>,
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SearchIndex {
    /// Open the index in `dir`, creating the directory and an empty index
    /// when absent.
    pub fn open(dir: &Path) -> ServiceResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);

        if !path.exists() {
            let index = Self {
                path,
                state: RwLock::new(IndexState::from_documents(Vec::new())),
            };
            index.persist(&index.read())?;
            tracing::info!("Created search index at {}", dir.display());
            return Ok(index);
        }

        let raw = std::fs::read(&path)?;
        let stored: StoredIndex = serde_json::from_slice(&raw).map_err(|e| {
            ServiceError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        if !stored.schema.contains_key(FIELD_NAME) {
            return Err(ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("index schema has no '{}' field", FIELD_NAME),
            )));
        }
        let state = IndexState::from_documents(stored.documents);
        tracing::info!(
            "Opened search index at {} ({} documents)",
            dir.display(),
            state.documents.len()
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &IndexState) -> ServiceResult<()> {
        let stored = StoredIndex {
            schema: HashMap::from([(FIELD_NAME.to_string(), "TEXT".to_string())]),
            documents: state.documents.clone(),
        };
        let bytes = serde_json::to_vec(&stored)
            .map_err(|e| ServiceError::Io(std::io::Error::other(e)))?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Append a document and persist. Returns its position in the index.
    pub fn index_document(&self, text: &str) -> ServiceResult<usize> {
        let total = self.index_documents(&[text.to_string()])?;
        Ok(total - 1)
    }

    /// Append every document, then persist once. Either all of them are
    /// indexed or none are. Returns the new document count.
    pub fn index_documents(&self, texts: &[String]) -> ServiceResult<usize> {
        if texts.is_empty() || texts.iter().any(|t| t.trim().is_empty()) {
            return Err(ServiceError::validation("Text is required"));
        }
        let mut state = self.write();
        let before = state.documents.len();
        for text in texts {
            state.add(text.clone());
        }
        if let Err(e) = self.persist(&state) {
            // Keep memory consistent with disk
            let kept = state.documents[..before].to_vec();
            *state = IndexState::from_documents(kept);
            return Err(e);
        }
        tracing::debug!("Indexed documents {}..{}", before, state.documents.len());
        Ok(state.documents.len())
    }

    /// Run a query and return up to `limit` hits, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let parsed = parse_query(query);
        let state = self.read();
        let Some(matches) = state.evaluate(&parsed) else {
            return Vec::new();
        };

        let mut query_terms = Vec::new();
        parsed.positive_terms(&mut query_terms);
        let scores = state.scores(&query_terms);

        let mut hits: Vec<(usize, f64)> = matches
            .into_iter()
            .map(|doc| (doc, scores.get(&doc).copied().unwrap_or(0.0)))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(limit);

        hits.into_iter()
            .map(|(doc, score)| SearchHit {
                text: state.documents[doc].clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush the index to disk. Call once before process exit.
    pub fn shutdown(&self) -> ServiceResult<()> {
        let state = self.write();
        self.persist(&state)?;
        tracing::info!("Search index flushed ({} documents)", state.documents.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn populated() -> (tempfile::TempDir, SearchIndex) {
        let dir = tempdir().unwrap();
        let index = SearchIndex::open(&dir.path().join("indexdir")).unwrap();
        for doc in [
            "Rust is a systems programming language",
            "Python is a popular programming language",
            "The quick brown fox jumps over the lazy dog",
            "Systems programming with rust and rust tooling",
        ] {
            index.index_document(doc).unwrap();
        }
        (dir, index)
    }

    fn texts(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.text.as_str()).collect()
    }

    #[test]
    fn test_parse_query_shapes() {
        assert_eq!(parse_query("rust"), Query::Term("rust".into()));
        assert_eq!(
            parse_query("rust python"),
            Query::And(vec![Query::Term("rust".into()), Query::Term("python".into())])
        );
        assert_eq!(
            parse_query("rust OR python"),
            Query::Or(vec![Query::Term("rust".into()), Query::Term("python".into())])
        );
        assert_eq!(
            parse_query("-python"),
            Query::Not(Box::new(Query::Term("python".into())))
        );
        assert_eq!(
            parse_query("\"systems programming\""),
            Query::Phrase(vec!["systems".into(), "programming".into()])
        );
        assert_eq!(parse_query("the AND of"), Query::Empty);
        assert_eq!(parse_query("((rust"), Query::Term("rust".into()));
    }

    #[test]
    fn test_implicit_and() {
        let (_dir, index) = populated();
        let hits = index.search("programming language", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_or_and_not() {
        let (_dir, index) = populated();
        assert_eq!(index.search("fox OR python", DEFAULT_LIMIT).len(), 2);
        let hits = index.search("programming NOT python", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 2);
        assert!(texts(&hits).iter().all(|t| !t.contains("Python")));
        assert_eq!(index.search("programming -rust", DEFAULT_LIMIT).len(), 1);
    }

    #[test]
    fn test_phrase_and_grouping() {
        let (_dir, index) = populated();
        let hits = index.search("\"programming language\"", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 2);
        assert!(index.search("\"language programming\"", DEFAULT_LIMIT).is_empty());
        let hits = index.search("(python OR fox) AND lazy", DEFAULT_LIMIT);
        assert_eq!(texts(&hits), ["The quick brown fox jumps over the lazy dog"]);
    }

    #[test]
    fn test_bm25_prefers_higher_term_frequency() {
        let (_dir, index) = populated();
        let hits = index.search("rust", DEFAULT_LIMIT);
        assert_eq!(hits[0].text, "Systems programming with rust and rust tooling");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_limit_and_empty_queries() {
        let (_dir, index) = populated();
        assert_eq!(index.search("programming", 1).len(), 1);
        assert!(index.search("", DEFAULT_LIMIT).is_empty());
        assert!(index.search("the", DEFAULT_LIMIT).is_empty());
        assert!(index.index_document("  ").is_err());
    }

    #[test]
    fn test_batch_append_is_all_or_nothing() {
        let (dir, index) = populated();
        let batch = vec!["first new entry".to_string(), "  ".to_string()];
        assert!(matches!(
            index.index_documents(&batch),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(index.len(), 4);

        let batch = vec!["apples and pears".to_string(), "pears only".to_string()];
        assert_eq!(index.index_documents(&batch).unwrap(), 6);
        assert_eq!(index.search("pears", DEFAULT_LIMIT).len(), 2);

        let reopened = SearchIndex::open(&dir.path().join("indexdir")).unwrap();
        assert_eq!(reopened.len(), 6);
        assert_eq!(reopened.search("apples", DEFAULT_LIMIT).len(), 1);
    }

    #[test]
    fn test_negation_only_matches_rank_after_scored_hits() {
        let (_dir, index) = populated();
        let hits = index.search("NOT fox", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_reopen_restores_documents() {
        let (dir, index) = populated();
        index.shutdown().unwrap();
        drop(index);

        let reopened = SearchIndex::open(&dir.path().join("indexdir")).unwrap();
        assert_eq!(reopened.len(), 4);
        assert_eq!(reopened.search("fox", DEFAULT_LIMIT).len(), 1);
    }

    #[test]
    fn test_concurrent_appends_and_searches() {
        let dir = tempdir().unwrap();
        let index = Arc::new(SearchIndex::open(dir.path()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    index.index_document(&format!("document number{} shared", i)).unwrap();
                    index.search("shared", DEFAULT_LIMIT);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(index.len(), 8);
        assert_eq!(index.search("shared", 100).len(), 8);
    }
}
