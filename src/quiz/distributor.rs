use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use encoding_rs::Encoding;
use rand::seq::SliceRandom;

use crate::quiz::library::QuizLibrary;
use crate::quiz::store::{
    session_key, used_generation_key, used_key, QuestionStore, GENERATION_KEY, QUESTIONS_KEY,
};
use crate::quiz::{answer, parser, IssuedQuestion, Result};

/// Builds the user identity sessions are stored under, e.g. `tg-12345`.
pub fn user_id(platform: &str, platform_user_id: impl std::fmt::Display) -> String {
    format!("{}-{}", platform, platform_user_id)
}

/// What the store currently holds for the shared corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusState {
    Ready(HashMap<String, String>),
    NeedsReload,
}

/// Outcome of giving up on the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reveal {
    NoActiveQuestion,
    /// The question is gone from the corpus since it was issued.
    Stale { question: String },
    Answer { question: String, answer: String },
}

/// Outcome of checking a free-text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NoActiveQuestion,
    Stale,
    Correct { answer: String },
    Incorrect,
}

/// Hands out questions from the shared corpus and tracks each user's current one.
///
/// Holds no locks of its own. Concurrent users only rely on the store executing each
/// command atomically, so two users may reload the corpus back to back.
pub struct Distributor {
    store: Arc<dyn QuestionStore>,
    library: QuizLibrary,
    encoding: &'static Encoding,
}

impl Distributor {
    pub fn new(store: Arc<dyn QuestionStore>, library: QuizLibrary) -> Self {
        Self {
            store,
            library,
            encoding: parser::DEFAULT_ENCODING,
        }
    }

    pub fn library(&self) -> &QuizLibrary {
        &self.library
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Parses a random quiz file and replaces the shared corpus with it.
    pub async fn load_corpus(&self) -> Result<usize> {
        let path = self.library.random_quiz_file()?;
        let corpus = parser::read_quiz_file(&path, self.encoding).await?;
        let loaded = corpus.len();

        let generation = format!("{:016x}", rand::random::<u64>());
        self.store
            .replace_hash(
                QUESTIONS_KEY,
                &corpus.into_entries(),
                (GENERATION_KEY, generation.as_str()),
            )
            .await?;

        log::info!("Loaded {} questions from {}", loaded, path.display());
        Ok(loaded)
    }

    pub async fn corpus_state(&self) -> Result<CorpusState> {
        let questions = self.store.hget_all(QUESTIONS_KEY).await?;
        if questions.is_empty() {
            return Ok(CorpusState::NeedsReload);
        }
        Ok(CorpusState::Ready(questions))
    }

    /// Issues a question the user has not seen since the corpus was loaded.
    ///
    /// Once the user has seen every question a new corpus is loaded. `Ok(None)` means a
    /// freshly loaded corpus was still found empty.
    pub async fn get_random_question(&self, user_id: &str) -> Result<Option<IssuedQuestion>> {
        let mut questions = match self.corpus_state().await? {
            CorpusState::Ready(questions) => questions,
            CorpusState::NeedsReload => {
                log::warn!("No questions in store, loading a new quiz file");
                match self.reload().await? {
                    Some(questions) => questions,
                    None => return Ok(None),
                }
            }
        };

        let mut used = self.used_questions(user_id).await?;
        let mut fresh = unused_questions(&questions, &used);
        if fresh.is_empty() {
            log::info!("User {} has seen every question, loading a new quiz file", user_id);
            questions = match self.reload().await? {
                Some(questions) => questions,
                None => return Ok(None),
            };
            used = self.used_questions(user_id).await?;
            fresh = unused_questions(&questions, &used);
            if fresh.is_empty() {
                // Another user reloaded the same file in between; start over on it.
                self.store.delete(&used_key(user_id)).await?;
                fresh = questions.keys().cloned().collect();
            }
        }

        let Some(question) = fresh.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };
        let Some(answer) = questions.remove(&question) else {
            return Ok(None);
        };

        self.store.set(&session_key(user_id), &question).await?;
        self.store.sadd(&used_key(user_id), &question).await?;

        log::debug!("Issued question to {}", user_id);
        Ok(Some(IssuedQuestion::new(question, answer)))
    }

    /// Reference answer for the user's current question.
    pub async fn give_up(&self, user_id: &str) -> Result<Reveal> {
        let Some(question) = self.store.get(&session_key(user_id)).await? else {
            return Ok(Reveal::NoActiveQuestion);
        };
        match self.store.hget(QUESTIONS_KEY, &question).await? {
            Some(answer) => Ok(Reveal::Answer { question, answer }),
            None => Ok(Reveal::Stale { question }),
        }
    }

    pub async fn check_user_answer(&self, user_id: &str, user_answer: &str) -> Result<Verdict> {
        let (question, correct_answer) = match self.give_up(user_id).await? {
            Reveal::NoActiveQuestion => return Ok(Verdict::NoActiveQuestion),
            Reveal::Stale { .. } => return Ok(Verdict::Stale),
            Reveal::Answer { question, answer } => (question, answer),
        };

        if answer::check_answer(user_answer, &correct_answer) {
            log::debug!("User {} answered {:?} correctly", user_id, question);
            return Ok(Verdict::Correct {
                answer: correct_answer,
            });
        }
        Ok(Verdict::Incorrect)
    }

    async fn reload(&self) -> Result<Option<HashMap<String, String>>> {
        self.load_corpus().await?;
        match self.corpus_state().await? {
            CorpusState::Ready(questions) => Ok(Some(questions)),
            CorpusState::NeedsReload => Ok(None),
        }
    }

    // Questions already served to the user from the current corpus generation.
    async fn used_questions(&self, user_id: &str) -> Result<HashSet<String>> {
        let generation = self.store.get(GENERATION_KEY).await?.unwrap_or_default();
        let generation_key = used_generation_key(user_id);

        if self.store.get(&generation_key).await?.as_deref() != Some(generation.as_str()) {
            self.store.delete(&used_key(user_id)).await?;
            self.store.set(&generation_key, &generation).await?;
            return Ok(Default::default());
        }
        self.store.smembers(&used_key(user_id)).await
    }
}

fn unused_questions(
    questions: &HashMap<String, String>,
    used: &HashSet<String>,
) -> Vec<String> {
    let mut fresh: Vec<String> = questions
        .keys()
        .filter(|question| !used.contains(*question))
        .cloned()
        .collect();
    fresh.sort();
    fresh
}
