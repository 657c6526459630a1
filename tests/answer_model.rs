mod common;

use std::collections::BTreeMap;

use serde_json::json;

use ieltsroom::answer::{
    is_answered, is_fully_answered, required_slots, word_count, Answer, AnswerFamily, MatchPair,
};

fn keyed(pairs: &[(&str, &str)]) -> Answer {
    Answer::Keyed {
        values: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[test]
fn test_families_follow_question_type() {
    let task = common::task_data();
    let mock = common::mock_data();

    let family = |data: &ieltsroom::normalize::NormalizedData, id: &str| {
        AnswerFamily::of(data.find(id).unwrap().2)
    };
    assert_eq!(family(&task, "101"), AnswerFamily::Single);
    assert_eq!(family(&task, "201"), AnswerFamily::Keyed);
    assert_eq!(family(&mock, "301"), AnswerFamily::Single);
    assert_eq!(family(&mock, "302"), AnswerFamily::Multi);
    assert_eq!(family(&mock, "303"), AnswerFamily::Keyed);
    assert_eq!(family(&mock, "304"), AnswerFamily::Matching);
    assert_eq!(family(&mock, "305"), AnswerFamily::Labels);
    assert_eq!(family(&mock, "306"), AnswerFamily::Essay);
}

#[test]
fn test_grouped_short_answer_needs_every_number() {
    let data = common::task_data();
    let (_, _, q) = data.find("201").unwrap();

    assert!(!is_answered(q, &keyed(&[("5", "cat")])));
    assert!(!is_answered(q, &keyed(&[("4", "Tuesday"), ("5", "cat"), ("6", " ")])));
    assert!(is_answered(
        q,
        &keyed(&[("4", "Tuesday"), ("5", "cat"), ("6", "garden")])
    ));
}

#[test]
fn test_answered_and_fully_answered_differ_for_matching() {
    let data = common::mock_data();
    let (_, _, q) = data.find("304").unwrap();
    let partial = Answer::Matches {
        matches: vec![MatchPair {
            from: "r1".to_string(),
            to: "A".to_string(),
        }],
    };

    assert_eq!(required_slots(q), vec!["r1", "r2"]);
    assert!(is_answered(q, &partial));
    assert!(!is_fully_answered(q, &partial));

    let full = partial.with_slot(Some("r2"), "B");
    assert!(is_fully_answered(q, &full));
}

#[test]
fn test_multi_select_needs_select_count() {
    let data = common::mock_data();
    let (_, _, q) = data.find("302").unwrap();
    let one = Answer::empty_for(q).toggle_choice("A");
    assert!(is_answered(q, &one));
    assert!(!is_fully_answered(q, &one));

    let two = one.toggle_choice("C");
    assert!(is_fully_answered(q, &two));
    assert!(two.has_choice("C"));

    let back = two.toggle_choice("C");
    assert!(!back.has_choice("C"));
}

#[test]
fn test_essay_respects_min_words() {
    let data = common::mock_data();
    let (_, _, q) = data.find("306").unwrap();
    let short = Answer::Essay {
        text: "Remote work is fine".to_string(),
    };
    let long = Answer::Essay {
        text: "Remote work is fine for most teams".to_string(),
    };
    assert_eq!(word_count("  two\nwords "), 2);
    assert!(is_answered(q, &short));
    assert!(!is_fully_answered(q, &short));
    assert!(is_fully_answered(q, &long));
}

#[test]
fn test_wrong_shape_is_never_answered() {
    let data = common::task_data();
    let (_, _, q) = data.find("101").unwrap();
    let wrong = Answer::Essay {
        text: "B".to_string(),
    };
    assert!(!wrong.fits(q));
    assert!(!is_answered(q, &wrong));
}

#[test]
fn test_same_as_ignores_order_and_blanks() {
    let a = Answer::Multi {
        values: vec!["A".to_string(), "C".to_string()],
    };
    let b = Answer::Multi {
        values: vec!["C".to_string(), "A".to_string()],
    };
    assert!(a.same_as(&b));
    assert_ne!(a, b);

    assert!(keyed(&[("b1", "uniform"), ("b2", "")]).same_as(&keyed(&[("b1", "uniform")])));
    assert!(!keyed(&[("b1", "uniform")]).same_as(&keyed(&[("b1", "locker")])));
}

#[test]
fn test_with_slot_blank_removes_entry() {
    let answer = keyed(&[("4", "Tuesday")]).with_slot(Some("5"), "cat");
    assert_eq!(answer.slot(Some("5")), "cat");
    let cleared = answer.with_slot(Some("5"), "  ");
    assert_eq!(cleared, keyed(&[("4", "Tuesday")]));
    assert_eq!(cleared.slot(Some("5")), "");
}

#[test]
fn test_wire_shapes() {
    let single: Answer = serde_json::from_value(json!({ "value": "A" })).unwrap();
    assert_eq!(single.family(), AnswerFamily::Single);

    let multi: Answer = serde_json::from_value(json!({ "values": ["A", "B"] })).unwrap();
    assert_eq!(multi.family(), AnswerFamily::Multi);

    let keyed_answer: Answer = serde_json::from_value(json!({ "values": { "4": "x" } })).unwrap();
    assert_eq!(keyed_answer.family(), AnswerFamily::Keyed);

    let labels: Answer = serde_json::from_value(json!({ "labels": { "m1": "A" } })).unwrap();
    assert_eq!(labels.family(), AnswerFamily::Labels);

    let matches: Answer =
        serde_json::from_value(json!({ "matches": [{ "from": "r1", "to": "B" }] })).unwrap();
    assert_eq!(matches.slot(Some("r1")), "B");

    assert_eq!(
        serde_json::to_value(Answer::Essay {
            text: "hi".to_string()
        })
        .unwrap(),
        json!({ "text": "hi" })
    );
    let empty: BTreeMap<String, String> = BTreeMap::new();
    assert!(Answer::Labels { labels: empty }.is_empty());
}
