//! Runtime answer values and the rules that compare and count them.
//!
//! Two notions of "answered" exist and are not interchangeable:
//! [`is_answered`] drives the palette and progress counters, while
//! [`is_fully_answered`] drives the submit-readiness warning.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{Question, QuestionType};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchPair {
    pub from: String,
    pub to: String,
}

/// The value stored per question id. The JSON shape matches what the backend stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single { value: String },
    Multi { values: Vec<String> },
    Keyed { values: BTreeMap<String, String> },
    Labels { labels: BTreeMap<String, String> },
    Matches { matches: Vec<MatchPair> },
    Essay { text: String },
}

impl Default for Answer {
    fn default() -> Self {
        Answer::Single {
            value: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFamily {
    Single,
    Multi,
    Keyed,
    Labels,
    Matching,
    Essay,
}

impl AnswerFamily {
    pub fn of(question: &Question) -> Self {
        match question.question_type {
            QuestionType::McqSingle | QuestionType::Tfng | QuestionType::ShortAnswer => {
                if question.is_grouped() {
                    AnswerFamily::Keyed
                } else {
                    AnswerFamily::Single
                }
            }
            QuestionType::McqMultiple => AnswerFamily::Multi,
            QuestionType::SummaryFillBlanks
            | QuestionType::SummaryDragDrop
            | QuestionType::TableCompletion
            | QuestionType::FlowchartCompletion => AnswerFamily::Keyed,
            QuestionType::MapLabelling => AnswerFamily::Labels,
            QuestionType::MatchingDragDrop | QuestionType::MatchingTableClick => {
                AnswerFamily::Matching
            }
            QuestionType::Essay => AnswerFamily::Essay,
        }
    }
}

/// Grouped single-value questions key their answer by sub-question number.
pub fn keyed_by_number(question: &Question) -> bool {
    question.is_grouped()
        && matches!(
            question.question_type,
            QuestionType::McqSingle | QuestionType::Tfng | QuestionType::ShortAnswer
        )
}

impl Answer {
    pub fn empty(family: AnswerFamily) -> Self {
        match family {
            AnswerFamily::Single => Answer::Single {
                value: String::new(),
            },
            AnswerFamily::Multi => Answer::Multi { values: Vec::new() },
            AnswerFamily::Keyed => Answer::Keyed {
                values: BTreeMap::new(),
            },
            AnswerFamily::Labels => Answer::Labels {
                labels: BTreeMap::new(),
            },
            AnswerFamily::Matching => Answer::Matches {
                matches: Vec::new(),
            },
            AnswerFamily::Essay => Answer::Essay {
                text: String::new(),
            },
        }
    }

    pub fn empty_for(question: &Question) -> Self {
        Answer::empty(AnswerFamily::of(question))
    }

    pub fn family(&self) -> AnswerFamily {
        match self {
            Answer::Single { .. } => AnswerFamily::Single,
            Answer::Multi { .. } => AnswerFamily::Multi,
            Answer::Keyed { .. } => AnswerFamily::Keyed,
            Answer::Labels { .. } => AnswerFamily::Labels,
            Answer::Matches { .. } => AnswerFamily::Matching,
            Answer::Essay { .. } => AnswerFamily::Essay,
        }
    }

    pub fn fits(&self, question: &Question) -> bool {
        self.family() == AnswerFamily::of(question)
    }

    /// Semantic equality: choice sets and match lists ignore order, blank map
    /// entries count as absent.
    pub fn same_as(&self, other: &Answer) -> bool {
        match (self, other) {
            (Answer::Single { value: a }, Answer::Single { value: b }) => a == b,
            (Answer::Multi { values: a }, Answer::Multi { values: b }) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            (Answer::Keyed { values: a }, Answer::Keyed { values: b })
            | (Answer::Labels { labels: a }, Answer::Labels { labels: b }) => {
                filled_entries(a) == filled_entries(b)
            }
            (Answer::Matches { matches: a }, Answer::Matches { matches: b }) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            (Answer::Essay { text: a }, Answer::Essay { text: b }) => a == b,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Single { value } => value.trim().is_empty(),
            Answer::Multi { values } => values.is_empty(),
            Answer::Keyed { values } => filled_entries(values).is_empty(),
            Answer::Labels { labels } => filled_entries(labels).is_empty(),
            Answer::Matches { matches } => !matches.iter().any(|m| !m.to.is_empty()),
            Answer::Essay { text } => text.trim().is_empty(),
        }
    }

    /// Value of one slot: the whole value for single answers, a map entry for
    /// keyed/label answers, the matched option for a matching row.
    pub fn slot(&self, key: Option<&str>) -> &str {
        match (self, key) {
            (Answer::Single { value }, _) => value.as_str(),
            (Answer::Essay { text }, _) => text.as_str(),
            (Answer::Keyed { values: map }, Some(k)) | (Answer::Labels { labels: map }, Some(k)) => {
                map.get(k).map(String::as_str).unwrap_or("")
            }
            (Answer::Matches { matches }, Some(k)) => matches
                .iter()
                .find(|m| m.from == k)
                .map(|m| m.to.as_str())
                .unwrap_or(""),
            _ => "",
        }
    }

    /// Returns a copy with one slot replaced. Blank values remove the entry.
    pub fn with_slot(&self, key: Option<&str>, value: &str) -> Answer {
        let mut next = self.clone();
        match (&mut next, key) {
            (Answer::Single { value: v }, _) => *v = value.to_string(),
            (Answer::Essay { text }, _) => *text = value.to_string(),
            (Answer::Keyed { values: map }, Some(k)) | (Answer::Labels { labels: map }, Some(k)) => {
                if value.trim().is_empty() {
                    map.remove(k);
                } else {
                    map.insert(k.to_string(), value.to_string());
                }
            }
            (Answer::Matches { matches }, Some(k)) => {
                matches.retain(|m| m.from != k);
                if !value.is_empty() {
                    matches.push(MatchPair {
                        from: k.to_string(),
                        to: value.to_string(),
                    });
                    matches.sort();
                }
            }
            _ => {}
        }
        next
    }

    pub fn toggle_choice(&self, key: &str) -> Answer {
        match self {
            Answer::Multi { values } => {
                let mut values = values.clone();
                if let Some(pos) = values.iter().position(|v| v == key) {
                    values.remove(pos);
                } else {
                    values.push(key.to_string());
                }
                Answer::Multi { values }
            }
            other => other.clone(),
        }
    }

    pub fn has_choice(&self, key: &str) -> bool {
        match self {
            Answer::Multi { values } => values.iter().any(|v| v == key),
            Answer::Single { value } => value == key,
            _ => false,
        }
    }
}

fn filled_entries(map: &BTreeMap<String, String>) -> BTreeMap<&str, &str> {
    map.iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// Slots a fully answered question must fill.
pub fn required_slots(question: &Question) -> Vec<String> {
    match AnswerFamily::of(question) {
        AnswerFamily::Keyed if keyed_by_number(question) => question.sub_keys(),
        AnswerFamily::Keyed => question.blanks().into_iter().map(|b| b.id).collect(),
        AnswerFamily::Labels => question.regions().into_iter().map(|r| r.id).collect(),
        AnswerFamily::Matching => question.rows().into_iter().map(|r| r.id).collect(),
        _ => Vec::new(),
    }
}

/// "Any answer present", used by the palette and progress counters.
///
/// Grouped numbered questions are the exception: each sub-number is its own
/// line on the answer sheet, so the group only counts once every one is filled.
pub fn is_answered(question: &Question, answer: &Answer) -> bool {
    if !answer.fits(question) {
        return false;
    }
    match answer {
        Answer::Keyed { values } if keyed_by_number(question) => question
            .sub_keys()
            .iter()
            .all(|k| values.get(k).is_some_and(|v| !v.trim().is_empty())),
        _ => !answer.is_empty(),
    }
}

/// Every slot filled, used to warn before a voluntary submit.
pub fn is_fully_answered(question: &Question, answer: &Answer) -> bool {
    if !answer.fits(question) {
        return false;
    }
    match answer {
        Answer::Single { value } => !value.trim().is_empty(),
        Answer::Multi { values } => {
            let distinct: BTreeSet<&String> = values.iter().collect();
            distinct.len() >= question.select_count()
        }
        Answer::Keyed { .. } | Answer::Labels { .. } | Answer::Matches { .. } => {
            let required = required_slots(question);
            if required.is_empty() {
                return !answer.is_empty();
            }
            required
                .iter()
                .all(|k| !answer.slot(Some(k)).trim().is_empty())
        }
        Answer::Essay { text } => {
            let words = word_count(text);
            words > 0 && question.min_words().map_or(true, |min| words >= min)
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
