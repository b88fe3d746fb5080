//! Text tokenization and the in-process relevance index over store
//! `name` and `description`.
//!
//! Scoring per matched (term, field) pair is
//! `weight * (0.5 + 0.5 * tf / field_token_count)`, summed over the query's
//! distinct terms. Name matches weigh 1.0 and description matches 0.4, the
//! same A/B split the PostgreSQL `tsvector` uses. Equal scores are ordered by
//! insertion sequence.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::slug::transliterate;

/// Weight of a match in the store name.
pub const NAME_WEIGHT: f32 = 1.0;

/// Weight of a match in the store description.
pub const DESCRIPTION_WEIGHT: f32 = 0.4;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "in", "into", "is", "it", "its", "of", "on", "or", "our", "so", "that", "the", "their",
        "then", "there", "these", "this", "to", "was", "we", "were", "will", "with", "you",
        "your",
    ]
    .into_iter()
    .collect()
});

/// Split text into lowercase, diacritic-folded terms with stop-words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    transliterate(text)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Build an OR-of-terms query string for PostgreSQL `to_tsquery`.
///
/// Returns `None` when the query has no searchable terms.
pub fn or_tsquery(query: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" | "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Name,
    Description,
}

impl Field {
    const ALL: [Field; 2] = [Field::Name, Field::Description];

    fn slot(self) -> usize {
        self as usize
    }

    fn weight(self) -> f32 {
        match self {
            Field::Name => NAME_WEIGHT,
            Field::Description => DESCRIPTION_WEIGHT,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    seq: u64,
    name_len: usize,
    description_len: usize,
    terms: HashSet<String>,
}

impl IndexedDoc {
    fn field_len(&self, field: Field) -> usize {
        match field {
            Field::Name => self.name_len,
            Field::Description => self.description_len,
        }
    }
}

/// Inverted index over store name and description.
#[derive(Debug, Default, Clone)]
pub struct TextIndex {
    /// term -> doc -> term frequency per field, indexed by `Field::slot`
    postings: HashMap<String, HashMap<Uuid, [usize; 2]>>,
    docs: HashMap<Uuid, IndexedDoc>,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Index (or re-index) a document. `seq` is its insertion sequence and
    /// is kept across re-indexing by the caller.
    pub fn upsert(&mut self, id: Uuid, seq: u64, name: &str, description: Option<&str>) {
        self.remove(id);

        let name_terms = tokenize(name);
        let description_terms = description.map(tokenize).unwrap_or_default();

        let mut terms = HashSet::new();
        for (field, field_terms) in [
            (Field::Name, &name_terms),
            (Field::Description, &description_terms),
        ] {
            for term in field_terms {
                self
                    .postings
                    .entry(term.clone())
                    .or_default()
                    .entry(id)
                    .or_default()[field.slot()] += 1;
                terms.insert(term.clone());
            }
        }

        self.docs.insert(
            id,
            IndexedDoc {
                seq,
                name_len: name_terms.len(),
                description_len: description_terms.len(),
                terms,
            },
        );
    }

    /// Drop a document from the index.
    pub fn remove(&mut self, id: Uuid) {
        let Some(doc) = self.docs.remove(&id) else {
            return;
        };
        for term in doc.terms {
            if let Some(entry) = self.postings.get_mut(&term) {
                entry.remove(&id);
                if entry.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    /// Rank documents matching any query term, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(Uuid, f32)> {
        if limit == 0 {
            return Vec::new();
        }

        // Terms are visited in a fixed order so equal documents accumulate
        // identical float sums.
        let query_terms: BTreeSet<String> = tokenize(query).into_iter().collect();
        let mut scores: HashMap<Uuid, f32> = HashMap::new();

        for term in &query_terms {
            let Some(docs) = self.postings.get(term) else {
                continue;
            };
            for (id, tfs) in docs {
                let Some(doc) = self.docs.get(id) else {
                    continue;
                };
                let score = scores.entry(*id).or_insert(0.0);
                for field in Field::ALL {
                    let tf = tfs[field.slot()];
                    if tf == 0 {
                        continue;
                    }
                    let len = doc.field_len(field).max(1) as f32;
                    *score += field.weight() * (0.5 + 0.5 * tf as f32 / len);
                }
            }
        }

        let mut ranked: Vec<(Uuid, f32, u64)> = scores
            .into_iter()
            .filter_map(|(id, score)| self.docs.get(&id).map(|d| (id, score, d.seq)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(limit);
        ranked.into_iter().map(|(id, score, _)| (id, score)).collect()
    }
}
