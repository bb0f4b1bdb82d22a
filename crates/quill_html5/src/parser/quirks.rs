use serde::Serialize;

/// Rendering mode of a document, as derived from its doctype
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    #[default]
    NoQuirks,
}

/// Returns the quirks mode for the given doctype. Identifiers are compared ASCII case-insensitively.
pub fn identify_quirks_mode(
    name: Option<&str>,
    pub_identifier: Option<&str>,
    sys_identifier: Option<&str>,
    force_quirks: bool,
) -> QuirksMode {
    if force_quirks || name != Some("html") {
        return QuirksMode::Quirks;
    }

    if let Some(value) = sys_identifier {
        let sys_id = value.to_ascii_lowercase();
        if QUIRKS_SYS_IDENTIFIER_EQ.contains(&sys_id.as_str()) {
            return QuirksMode::Quirks;
        }
    }

    let Some(value) = pub_identifier else {
        return QuirksMode::NoQuirks;
    };

    let pub_id = value.to_ascii_lowercase();
    if QUIRKS_PUB_IDENTIFIER_EQ.contains(&pub_id.as_str()) {
        return QuirksMode::Quirks;
    }

    if QUIRKS_PUB_IDENTIFIER_PREFIX
        .iter()
        .any(|&prefix| pub_id.starts_with(prefix))
    {
        return QuirksMode::Quirks;
    }

    if sys_identifier.is_none()
        && QUIRKS_PUB_IDENTIFIER_PREFIX_MISSING_SYS
            .iter()
            .any(|&prefix| pub_id.starts_with(prefix))
    {
        return QuirksMode::Quirks;
    }

    if LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX
        .iter()
        .any(|&prefix| pub_id.starts_with(prefix))
    {
        return QuirksMode::LimitedQuirks;
    }

    if sys_identifier.is_some()
        && LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX_NOT_MISSING_SYS
            .iter()
            .any(|&prefix| pub_id.starts_with(prefix))
    {
        return QuirksMode::LimitedQuirks;
    }

    QuirksMode::NoQuirks
}

static QUIRKS_PUB_IDENTIFIER_EQ: &[&str] = &[
    "-//w3o//dtd w3 html strict 3.0//en//",
    "-/w3c/dtd html 4.0 transitional/en",
    "html",
];

static QUIRKS_PUB_IDENTIFIER_PREFIX: &[&str] = &[
    "+//silmaril//dtd html pro v0r11 19970101//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

static QUIRKS_PUB_IDENTIFIER_PREFIX_MISSING_SYS: &[&str] = &[
    "-//w3c//dtd html 4.01 frameset//",
    "-//w3c//dtd html 4.01 transitional//",
];

static QUIRKS_SYS_IDENTIFIER_EQ: &[&str] = &["http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"];

static LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX: &[&str] = &[
    "-//w3c//dtd xhtml 1.0 frameset//",
    "-//w3c//dtd xhtml 1.0 transitional//",
];

static LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX_NOT_MISSING_SYS: &[&str] = &[
    "-//w3c//dtd html 4.01 frameset//",
    "-//w3c//dtd html 4.01 transitional//",
];


#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, None, None, false, QuirksMode::Quirks; "missing name")]
    #[test_case(Some("html"), None, None, false, QuirksMode::NoQuirks; "html5 doctype")]
    #[test_case(Some("html"), None, None, true, QuirksMode::Quirks; "forced")]
    #[test_case(Some("svg"), None, None, false, QuirksMode::Quirks; "other name")]
    #[test_case(
        Some("html"),
        Some("-//W3O//DTD W3 HTML Strict 3.0//EN//"),
        None,
        false,
        QuirksMode::Quirks;
        "exact public id"
    )]
    #[test_case(
        Some("html"),
        Some("-//W3C//DTD HTML 4.0 Transitional//EN"),
        None,
        false,
        QuirksMode::Quirks;
        "public prefix"
    )]
    #[test_case(
        Some("html"),
        Some("-//W3C//DTD HTML 4.01 Frameset//"),
        None,
        false,
        QuirksMode::Quirks;
        "frameset without system id"
    )]
    #[test_case(
        Some("html"),
        Some("-//W3C//DTD HTML 4.01 Frameset//"),
        Some("http://www.w3.org/TR/html4/frameset.dtd"),
        false,
        QuirksMode::LimitedQuirks;
        "frameset with system id"
    )]
    #[test_case(
        Some("html"),
        Some("-//W3C//DTD XHTML 1.0 Transitional//EN"),
        None,
        false,
        QuirksMode::LimitedQuirks;
        "xhtml transitional"
    )]
    #[test_case(Some("html"), Some("-//W3C//DTD HTML 4.01//EN"), None, false, QuirksMode::NoQuirks; "strict")]
    #[test_case(
        Some("html"),
        None,
        Some("http://www.IBM.com/data/dtd/v11/ibmxhtml1-transitional.dtd"),
        false,
        QuirksMode::Quirks;
        "ibm system id"
    )]
    #[test_case(Some("html"), None, Some("about:legacy-compat"), false, QuirksMode::NoQuirks; "legacy compat")]
    fn quirks_mode(name: Option<&str>, pub_id: Option<&str>, sys_id: Option<&str>, force: bool, expected: QuirksMode) {
        assert_eq!(identify_quirks_mode(name, pub_id, sys_id, force), expected);
    }
}
