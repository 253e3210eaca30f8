use crate::expression::value::{boolean_term, simple_string, string_literal, string_term, Numeric};
use rdf_walk_model::{Function, Literal, Term, ThinError, ThinResult};
use regex::RegexBuilder;

const REGEX_SIZE_LIMIT: usize = 1_000_000;

/// Applies a built-in function to already evaluated arguments.
///
/// Functions that are not supported fail like a function applied to invalid arguments.
pub(crate) fn call(function: &Function, args: &[Term]) -> ThinResult<Term> {
    match (function, args) {
        (Function::Str, [term]) => str(term),
        (Function::Lang, [Term::Literal(literal)]) => {
            Ok(Literal::new_simple_literal(literal.language().unwrap_or_default()).into())
        }
        (Function::Datatype, [Term::Literal(literal)]) => {
            Ok(literal.datatype().into_owned().into())
        }
        (Function::IsIri, [term]) => Ok(boolean_term(term.is_named_node())),
        (Function::IsBlank, [term]) => Ok(boolean_term(term.is_blank_node())),
        (Function::IsLiteral, [term]) => Ok(boolean_term(term.is_literal())),
        (Function::IsNumeric, [term]) => Ok(boolean_term(Numeric::from_term(term).is_some())),
        (Function::LangMatches, [tag, range]) => {
            let (Some(tag), Some(range)) = (simple_string(tag), simple_string(range)) else {
                return ThinError::expected();
            };
            Ok(boolean_term(lang_matches(tag, range)))
        }
        (Function::StrLen, [term]) => {
            let (value, _) = string_literal(term).ok_or(ThinError::default())?;
            let length = i64::try_from(value.chars().count())?;
            Ok(Numeric::Integer(length.into()).into_term())
        }
        (Function::UCase, [term]) => {
            let (value, language) = string_literal(term).ok_or(ThinError::default())?;
            Ok(string_term(value.to_uppercase(), language))
        }
        (Function::LCase, [term]) => {
            let (value, language) = string_literal(term).ok_or(ThinError::default())?;
            Ok(string_term(value.to_lowercase(), language))
        }
        (Function::Contains, [lhs, rhs]) => {
            let (lhs, rhs) = compatible_strings(lhs, rhs)?;
            Ok(boolean_term(lhs.contains(rhs)))
        }
        (Function::StrStarts, [lhs, rhs]) => {
            let (lhs, rhs) = compatible_strings(lhs, rhs)?;
            Ok(boolean_term(lhs.starts_with(rhs)))
        }
        (Function::StrEnds, [lhs, rhs]) => {
            let (lhs, rhs) = compatible_strings(lhs, rhs)?;
            Ok(boolean_term(lhs.ends_with(rhs)))
        }
        (Function::Concat, args) => concat(args),
        (Function::Regex, [text, pattern]) => regex(text, pattern, None),
        (Function::Regex, [text, pattern, flags]) => regex(text, pattern, Some(flags)),
        _ => ThinError::expected(),
    }
}

fn str(term: &Term) -> ThinResult<Term> {
    match term {
        Term::NamedNode(node) => Ok(Literal::new_simple_literal(node.as_str()).into()),
        Term::Literal(literal) => Ok(Literal::new_simple_literal(literal.value()).into()),
        _ => ThinError::expected(),
    }
}

fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    tag.eq_ignore_ascii_case(range)
        || (tag.len() > range.len()
            && tag.is_char_boundary(range.len())
            && tag[..range.len()].eq_ignore_ascii_case(range)
            && tag[range.len()..].starts_with('-'))
}

/// Checks that two string literals can be used as arguments of the same string function. The
/// second argument must either be a simple literal or share the language of the first one.
fn compatible_strings<'a>(lhs: &'a Term, rhs: &'a Term) -> ThinResult<(&'a str, &'a str)> {
    let (lhs, lhs_language) = string_literal(lhs).ok_or(ThinError::default())?;
    let (rhs, rhs_language) = string_literal(rhs).ok_or(ThinError::default())?;
    match rhs_language {
        Some(language) if Some(language) != lhs_language => ThinError::expected(),
        _ => Ok((lhs, rhs)),
    }
}

fn concat(args: &[Term]) -> ThinResult<Term> {
    let mut result = String::new();
    let mut language = None;
    for (i, arg) in args.iter().enumerate() {
        let (value, arg_language) = string_literal(arg).ok_or(ThinError::default())?;
        result.push_str(value);
        if i == 0 {
            language = arg_language;
        } else if language != arg_language {
            language = None;
        }
    }
    Ok(string_term(result, language))
}

fn regex(text: &Term, pattern: &Term, flags: Option<&Term>) -> ThinResult<Term> {
    let (text, _) = string_literal(text).ok_or(ThinError::default())?;
    let pattern = simple_string(pattern).ok_or(ThinError::default())?;
    let flags = match flags {
        Some(flags) => simple_string(flags).ok_or(ThinError::default())?,
        None => "",
    };

    let mut builder = RegexBuilder::new(pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            'i' => builder.case_insensitive(true),
            'x' => builder.ignore_whitespace(true),
            _ => return ThinError::expected(),
        };
    }
    let regex = builder.build().map_err(|_| ThinError::default())?;
    Ok(boolean_term(regex.is_match(text)))
}
