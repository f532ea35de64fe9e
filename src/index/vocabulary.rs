use std::collections::HashMap;

use serde::{Deserialize, Serialize};


/// Token → column mapping. Columns are assigned in first-seen order and the
/// mapping never changes once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl Vocabulary {
    
    pub fn build<I, T>(token_lists: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[String]>,
    {
        let mut vocabulary = Self::default();
        for tokens in token_lists {
            for token in tokens.as_ref() {
                if !vocabulary.lookup.contains_key(token) {
                    vocabulary.lookup.insert(token.clone(), vocabulary.terms.len());
                    vocabulary.terms.push(token.clone());
                }
            }
        }
        vocabulary
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.lookup.get(term).copied()
    }

    pub fn term(&self, column: usize) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        Self::build([terms])
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}
