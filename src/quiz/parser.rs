use std::path::Path;
use std::sync::OnceLock;

use encoding_rs::Encoding;
use regex::Regex;

use crate::quiz::{Corpus, QuizError, Result};

/// Quiz archives are distributed in KOI8-R.
pub const DEFAULT_ENCODING: &Encoding = encoding_rs::KOI8_R;

fn question_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)Вопрос\s\d+:\s*(.*?)\nОтвет:").expect("question pattern is valid")
    })
}

fn answer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)Ответ:\s*(.*?)(?:\n\n|\n?\z)").expect("answer pattern is valid")
    })
}

/// Reads a whole quiz file, decodes it and parses it into a corpus.
pub async fn read_quiz_file(path: &Path, encoding: &'static Encoding) -> Result<Corpus> {
    let bytes = tokio::fs::read(path).await?;
    let text = decode(&bytes, encoding);
    parse(&text)
}

pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        log::warn!(
            "Quiz file contains bytes that are not valid {}",
            encoding.name()
        );
    }
    text.into_owned()
}

/// Extracts question/answer pairs from the text of one quiz file.
///
/// Questions and answers are collected separately and paired by position,
/// so surplus questions or answers at the end are dropped.
pub fn parse(raw: &str) -> Result<Corpus> {
    let content = raw.replace("\r\n", "\n");

    let questions: Vec<String> = question_pattern()
        .captures_iter(&content)
        .map(|c| format_text(c[1].trim()))
        .collect();
    let answers: Vec<String> = answer_pattern()
        .captures_iter(&content)
        .map(|c| format_text(c[1].trim()))
        .collect();

    if questions.is_empty() || answers.is_empty() {
        return Err(QuizError::Parse {
            questions: questions.len(),
            answers: answers.len(),
        });
    }

    if questions.len() != answers.len() {
        log::warn!(
            "Quiz file has {} questions but {} answers, {} unpaired entries dropped",
            questions.len(),
            answers.len(),
            questions.len().abs_diff(answers.len())
        );
    }

    Ok(questions.into_iter().zip(answers).collect())
}

/// Keeps line breaks of upper-case passages (verse), joins everything else into one line.
pub fn format_text(text: &str) -> String {
    let is_verse = text
        .lines()
        .all(|line| line.trim().is_empty() || is_upper(line));
    if is_verse {
        return text.to_string();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// At least one cased letter and no lower-case ones.
fn is_upper(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "Чемпионат. Тур 1\n\n\
        Вопрос 1:\nСтолица\nРоссии?\n\n\
        Ответ:\nМосква.\n\n\
        Автор:\nИван Петров\n\n\
        Вопрос 2:\nСколько будет\nдва плюс два?\n\n\
        Ответ:\nЧетыре.\n";

    #[test]
    fn parses_two_blocks_without_labels() {
        let corpus = parse(TWO_BLOCKS).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get("Столица России?"), Some("Москва."));
        assert_eq!(corpus.get("Сколько будет два плюс два?"), Some("Четыре."));
        for (question, answer) in corpus.iter() {
            assert!(!question.contains('\n'));
            assert!(!answer.contains('\n'));
            assert!(!question.starts_with("Вопрос"));
            assert!(!answer.starts_with("Ответ"));
        }
    }

    #[test]
    fn keeps_line_breaks_in_upper_case_verse() {
        let text = "Вопрос 1:\nБУРЯ МГЛОЮ\nНЕБО КРОЕТ\nОтвет:\nПушкин\n";
        let corpus = parse(text).unwrap();

        assert_eq!(corpus.get("БУРЯ МГЛОЮ\nНЕБО КРОЕТ"), Some("Пушкин"));
    }

    #[test]
    fn missing_answers_is_a_parse_error() {
        let text = "Вопрос 1:\nСтолица России?\n\nКомментарий:\nнет ответа\n";

        assert!(matches!(
            parse(text),
            Err(QuizError::Parse {
                questions: 0,
                answers: 0
            })
        ));
    }

    #[test]
    fn answers_without_questions_is_a_parse_error() {
        let text = "Ответ:\nМосква\n";

        assert!(matches!(
            parse(text),
            Err(QuizError::Parse {
                questions: 0,
                answers: 1
            })
        ));
    }

    #[test]
    fn surplus_answers_are_dropped() {
        let text = "Вопрос 1: Первый?\nОтвет: один\n\nОтвет: лишний\n";
        let corpus = parse(text).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("Первый?"), Some("один"));
    }

    #[test]
    fn surplus_questions_are_dropped() {
        // Without a blank line the first answer runs on into the second block.
        let text = "Вопрос 1: Первый?\nОтвет: один\nВопрос 2: Второй?\nОтвет: два\n";
        let corpus = parse(text).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(
            corpus.get("Первый?"),
            Some("один Вопрос 2: Второй? Ответ: два")
        );
        assert_eq!(corpus.get("Второй?"), None);
    }

    #[test]
    fn duplicate_questions_collapse_to_last_answer() {
        let text = "Вопрос 1: Кто?\nОтвет: он\n\nВопрос 2: Кто?\nОтвет: она\n";
        let corpus = parse(text).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("Кто?"), Some("она"));
    }

    #[test]
    fn windows_line_endings_are_accepted() {
        let text = "Вопрос 1:\r\nГде?\r\nОтвет:\r\nТам\r\n\r\nВопрос 2:\r\nКогда?\r\nОтвет:\r\nСейчас\r\n";
        let corpus = parse(text).unwrap();

        assert_eq!(corpus.get("Где?"), Some("Там"));
        assert_eq!(corpus.get("Когда?"), Some("Сейчас"));
    }

    #[test]
    fn prose_with_numbers_is_joined() {
        assert_eq!(format_text("В 1812 году\nкто?"), "В 1812 году кто?");
        assert_eq!(format_text("1812\n\n1813"), "1812 1813");
    }

    #[test]
    fn decodes_koi8r() {
        let (bytes, _, _) = DEFAULT_ENCODING.encode("Вопрос 1: Да?\nОтвет: Нет\n");
        let text = decode(&bytes, DEFAULT_ENCODING);

        assert_eq!(parse(&text).unwrap().get("Да?"), Some("Нет"));
    }
}
