// See https://github.com/html5lib/html5lib-tests/tree/master/tree-construction
use anyhow::anyhow;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    combinator::{all_consuming, map, opt, rest, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, terminated, tuple},
    Finish, IResult,
};
use nom_locate::{position, LocatedSpan};
use quill_shared::types::Result;

type Span<'a> = LocatedSpan<&'a str>;

/// Separator between two tests in a fixture file
const TEST_SEPARATOR: &str = "\n\n#data\n";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScriptMode {
    ScriptOn,
    ScriptOff,
    #[default]
    Both,
}

#[derive(Debug, PartialEq, Default, Clone)]
pub struct TestSpec {
    /// #data section
    pub data: String,
    /// #errors section, one message per line
    pub errors: Vec<String>,
    /// #new-errors section
    pub new_errors: Vec<String>,
    /// #document-fragment section
    pub document_fragment: Option<String>,
    /// #script-on, #script-off
    pub script_mode: ScriptMode,
    /// #document section
    pub document: String,
    /// Line of the #data header in the fixture file
    pub line: usize,
}

/// A single line that is not a section header
fn text_line(i: Span) -> IResult<Span, String> {
    map(
        terminated(
            verify(take_until("\n"), |line: &Span| !line.fragment().starts_with('#')),
            tag("\n"),
        ),
        |line: Span| line.fragment().trim().to_string(),
    )(i)
}

fn data(i: Span) -> IResult<Span, String> {
    map(preceded(tag("#data\n"), take_until("#errors\n")), |data: Span| {
        trim_last_newline(data.fragment())
    })(i)
}

fn errors(i: Span) -> IResult<Span, Vec<String>> {
    preceded(tag("#errors\n"), many0(text_line))(i)
}

fn new_errors(i: Span) -> IResult<Span, Vec<String>> {
    preceded(tag("#new-errors\n"), many0(text_line))(i)
}

fn document_fragment(i: Span) -> IResult<Span, String> {
    map(
        delimited(tag("#document-fragment\n"), take_until("\n"), tag("\n")),
        |context: Span| context.fragment().trim().to_string(),
    )(i)
}

fn script_mode(i: Span) -> IResult<Span, ScriptMode> {
    alt((
        map(tag("#script-on\n"), |_| ScriptMode::ScriptOn),
        map(tag("#script-off\n"), |_| ScriptMode::ScriptOff),
    ))(i)
}

/// The document runs up to the next test, or to the end of the file
fn document(i: Span) -> IResult<Span, String> {
    map(
        preceded(tag("#document\n"), alt((take_until(TEST_SEPARATOR), rest))),
        |document: Span| document.fragment().trim_end_matches('\n').to_string(),
    )(i)
}

fn test(i: Span) -> IResult<Span, TestSpec> {
    let (i, start) = position(i)?;
    let line = start.location_line() as usize;

    map(
        tuple((
            data,
            errors,
            opt(new_errors),
            opt(script_mode),
            opt(document_fragment),
            opt(script_mode),
            document,
        )),
        move |(data, errors, new_errors, mode_before, document_fragment, mode_after, document)| TestSpec {
            data,
            errors,
            new_errors: new_errors.unwrap_or_default(),
            document_fragment,
            script_mode: mode_before.or(mode_after).unwrap_or_default(),
            document,
            line,
        },
    )(i)
}

/// Trims only a single newline from the string, even if there are multiple newlines present.
fn trim_last_newline(s: &str) -> String {
    s.strip_suffix('\n').unwrap_or(s).to_string()
}

/// Parses all tests of a fixture file
pub fn parse_fixture(i: &str) -> Result<Vec<TestSpec>> {
    let input = i.trim_start_matches('\n');

    let (_, tests) = all_consuming(separated_list1(tag("\n\n"), test))(Span::new(input))
        .finish()
        .map_err(|err| anyhow!("cannot parse fixture at line {}: {:?}", err.input.location_line(), err.code))?;

    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data() {
        let result = data("#data\nTest \n#errors\n".into());
        assert!(matches!(result, Ok((_, ref data)) if data == "Test "));

        let result = data("#data\n#errors\n".into());
        assert!(matches!(result, Ok((_, ref data)) if data.is_empty()));

        let result = data("#data\n<p>\n\n#errors\n".into());
        assert!(matches!(result, Ok((_, ref data)) if data == "<p>\n"));
    }

    #[test]
    fn parse_single_test() {
        let tests = parse_fixture(
            r#"#data
Test
#errors
(1,0): expected-doctype-but-got-chars
#document
| <html>
|   <head>
|   <body>
|     "Test"
"#,
        );

        let tests = tests.unwrap_or_default();
        assert_eq!(tests.len(), 1);

        let test = &tests[0];
        assert_eq!(test.data, "Test");
        assert_eq!(test.errors, vec!["(1,0): expected-doctype-but-got-chars".to_string()]);
        assert_eq!(test.script_mode, ScriptMode::Both);
        assert_eq!(test.document, "| <html>\n|   <head>\n|   <body>\n|     \"Test\"");
        assert_eq!(test.line, 1);
    }

    #[test]
    fn parse_multiple_tests() {
        let tests = parse_fixture(
            r#"#data
<td>x
#errors
#document-fragment
tr
#document
| <td>
|   "x"

#data
<noscript><p>
#errors
1: error
#new-errors
(1:1) other
#script-off
#document
| <html>
|   <head>
|     <noscript>
|   <body>
|     <p>

#data
<pre>
multi

line</pre>
#errors
#document
| <html>
|   <head>
|   <body>
|     <pre>
|       "multi

line"
"#,
        )
        .unwrap_or_default();

        assert_eq!(tests.len(), 3);

        assert_eq!(tests[0].document_fragment.as_deref(), Some("tr"));
        assert_eq!(tests[0].document, "| <td>\n|   \"x\"");

        assert_eq!(tests[1].script_mode, ScriptMode::ScriptOff);
        assert_eq!(tests[1].errors.len(), 1);
        assert_eq!(tests[1].new_errors.len(), 1);
        assert_eq!(tests[1].line, 10);

        assert_eq!(tests[2].data, "<pre>\nmulti\n\nline</pre>");
        assert!(tests[2].document.ends_with("\"multi\n\nline\""));
    }

    #[test]
    fn invalid_fixture() {
        assert!(parse_fixture("#data\nno errors section\n").is_err());
    }
}
