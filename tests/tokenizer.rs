use quill_html5::errors::ParseErrorList;
use quill_html5::node::Namespace;
use quill_html5::tokenizer::state::State as TokenState;
use quill_html5::tokenizer::token::Token;
use quill_html5::tokenizer::{Options, ParserData, Tokenizer};
use quill_shared::character_reader::CharacterReader;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use test_case::test_case;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    pub tests: Vec<Test>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub description: String,
    pub input: String,
    pub output: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<Error>,
    #[serde(default)]
    pub initial_states: Vec<String>,
    pub last_start_tag: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    pub code: String,
    pub line: i64,
    pub col: i64,
}

fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data/tokenizer")
        .join(filename)
}

/// Converts a token into the html5lib output format
fn token_to_value(token: &Token) -> Option<Value> {
    let value = match token {
        Token::DocType {
            name,
            force_quirks,
            pub_identifier,
            sys_identifier,
            ..
        } => {
            let correctness = !*force_quirks;
            json!(["DOCTYPE", name, pub_identifier, sys_identifier, correctness])
        }
        Token::StartTag {
            name,
            is_self_closing,
            attributes,
            ..
        } => {
            let attributes = attributes
                .iter()
                .map(|attr| (attr.name.clone(), Value::String(attr.value.clone())))
                .collect::<Map<String, Value>>();

            if *is_self_closing {
                json!(["StartTag", name, attributes, true])
            } else {
                json!(["StartTag", name, attributes])
            }
        }
        Token::EndTag { name, .. } => json!(["EndTag", name]),
        Token::Comment { comment, .. } => json!(["Comment", comment]),
        Token::Text { text, .. } => json!(["Character", text]),
        Token::Eof { .. } => return None,
    };

    Some(value)
}

/// Tokenizes the input and returns the tokens in html5lib format, with adjacent character tokens
/// merged, together with the reported error codes.
fn tokenize(test: &Test, state: TokenState) -> (Vec<Value>, Vec<String>) {
    let mut stream = CharacterReader::new(&test.input);
    let error_logger = Rc::new(RefCell::new(ParseErrorList::new(100)));
    let options = Options {
        initial_state: state,
        last_start_tag: test.last_start_tag.clone().unwrap_or_default(),
        ..Options::default()
    };
    let mut tokenizer = Tokenizer::new(&mut stream, Some(options), error_logger.clone());

    let mut output: Vec<Value> = vec![];
    loop {
        let token = tokenizer.next_token(ParserData {
            adjusted_node_namespace: Namespace::Html,
        });
        let Some(value) = token_to_value(&token) else {
            break;
        };

        if let (Token::Text { text, .. }, Some(Value::Array(last))) = (&token, output.last_mut()) {
            if last.first() == Some(&json!("Character")) {
                if let Some(Value::String(data)) = last.get_mut(1) {
                    data.push_str(text);
                    continue;
                }
            }
        }

        output.push(value);
    }

    let errors = error_logger
        .borrow()
        .errors()
        .iter()
        .map(|err| err.message.clone())
        .collect();

    (output, errors)
}

fn assert_tokenization(test: &Test) {
    // If no initial state is given, assume Data state
    let mut states = test.initial_states.clone();
    if states.is_empty() {
        states.push(String::from("Data state"));
    }

    for state in states.iter() {
        let state = match state.as_str() {
            "PLAINTEXT state" => TokenState::PLAINTEXT,
            "RAWTEXT state" => TokenState::RAWTEXT,
            "RCDATA state" => TokenState::RCDATA,
            "Script data state" => TokenState::ScriptData,
            "CDATA section state" => TokenState::CDATASection,
            _ => TokenState::Data,
        };

        let (output, errors) = tokenize(test, state);
        assert_eq!(output, test.output, "tokens of '{}'", test.description);

        let expected_errors = test.errors.iter().map(|err| err.code.clone()).collect::<Vec<_>>();
        assert_eq!(errors, expected_errors, "errors of '{}'", test.description);
    }
}

#[test_case("basic.test")]
fn tokenization(filename: &str) {
    let contents = fs::read_to_string(fixture_path(filename)).unwrap_or_default();
    let root: Root = serde_json::from_str(&contents).unwrap_or_default();
    assert!(!root.tests.is_empty(), "no tests found in {filename}");

    for test in root.tests.iter() {
        assert_tokenization(test);
    }
}
