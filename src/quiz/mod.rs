pub mod answer;
pub mod distributor;
pub mod library;
pub mod parser;
pub mod store;

use std::collections::HashMap;

pub type Result<T> = std::result::Result<T, QuizError>;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("could not extract quiz pairs: {questions} questions, {answers} answers found")]
    Parse { questions: usize, answers: usize },

    #[error("no quiz files found in {0}")]
    NoCorpusFiles(String),

    #[error("failed to read quiz file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to unpack quiz archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("question store unavailable: {0}")]
    Store(#[from] redis::RedisError),
}

/// Question text to answer text, in the order the questions appear in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair. A repeated question keeps its first position and takes the new answer.
    pub fn insert(&mut self, question: String, answer: String) {
        match self.positions.get(&question) {
            Some(&idx) => self.entries[idx].1 = answer,
            None => {
                self.positions.insert(question.clone(), self.entries.len());
                self.entries.push((question, answer));
            }
        }
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.positions
            .get(question)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }

    pub fn into_entries(self) -> Vec<(String, String)> {
        self.entries
    }
}

impl FromIterator<(String, String)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for (question, answer) in iter {
            corpus.insert(question, answer);
        }
        corpus
    }
}

/// A question handed out to a user together with its reference answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedQuestion {
    pub question: String,
    pub answer: String,
}

impl IssuedQuestion {
    pub fn new(question: String, answer: String) -> Self {
        Self { question, answer }
    }
}
