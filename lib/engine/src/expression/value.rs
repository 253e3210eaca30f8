//! Typed views on terms: numerics, booleans, and strings.

use rdf_walk_model::vocab::{rdf, xsd};
use rdf_walk_model::{Decimal, Double, Integer, Literal, NamedNodeRef, Term, ThinError, ThinResult};
use std::cmp::Ordering;
use std::str::FromStr;

/// A numeric value after type promotion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Numeric {
    Integer(Integer),
    Decimal(Decimal),
    Double(Double),
}

const INTEGER_TYPES: [NamedNodeRef<'static>; 13] = [
    xsd::INTEGER,
    xsd::INT,
    xsd::LONG,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

impl Numeric {
    /// Parses a numeric literal. Returns `None` for literals of other datatypes and for invalid
    /// lexical forms.
    pub(crate) fn from_literal(literal: &Literal) -> Option<Self> {
        let datatype = literal.datatype();
        let value = literal.value();
        if INTEGER_TYPES.contains(&datatype) {
            Integer::from_str(value).ok().map(Numeric::Integer)
        } else if datatype == xsd::DECIMAL {
            Decimal::from_str(value).ok().map(Numeric::Decimal)
        } else if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
            Double::from_str(value).ok().map(Numeric::Double)
        } else {
            None
        }
    }

    pub(crate) fn from_term(term: &Term) -> Option<Self> {
        match term {
            Term::Literal(literal) => Self::from_literal(literal),
            _ => None,
        }
    }

    pub(crate) fn into_term(self) -> Term {
        let (value, datatype) = match self {
            Numeric::Integer(value) => (value.to_string(), xsd::INTEGER),
            Numeric::Decimal(value) => (value.to_string(), xsd::DECIMAL),
            Numeric::Double(value) => (value.to_string(), xsd::DOUBLE),
        };
        Literal::new_typed_literal(value, datatype).into()
    }

    fn to_decimal(self) -> ThinResult<Decimal> {
        match self {
            Numeric::Integer(value) => Ok(Decimal::from_str(&value.to_string())?),
            Numeric::Decimal(value) => Ok(value),
            Numeric::Double(_) => ThinError::expected(),
        }
    }

    fn to_double(self) -> ThinResult<Double> {
        match self {
            Numeric::Integer(value) => Ok(Double::from_str(&value.to_string())?),
            Numeric::Decimal(value) => Ok(Double::from_str(&value.to_string())?),
            Numeric::Double(value) => Ok(value),
        }
    }

    pub(crate) fn is_zero_or_nan(self) -> bool {
        match self {
            Numeric::Integer(value) => value == Integer::from(0_i64),
            Numeric::Decimal(value) => value == Decimal::from(0_i64),
            Numeric::Double(value) => {
                let value = f64::from(value);
                value == 0.0 || value.is_nan()
            }
        }
    }

    pub(crate) fn negate(self) -> ThinResult<Numeric> {
        Ok(match self {
            Numeric::Integer(value) => Numeric::Integer(value.checked_neg().ok_or(ThinError::default())?),
            Numeric::Decimal(value) => Numeric::Decimal(value.checked_neg().ok_or(ThinError::default())?),
            Numeric::Double(value) => Numeric::Double(-value),
        })
    }

    pub(crate) fn add(self, rhs: Numeric) -> ThinResult<Numeric> {
        self.apply(
            rhs,
            |lhs, rhs| lhs.checked_add(rhs),
            |lhs, rhs| lhs.checked_add(rhs),
            |lhs, rhs| lhs + rhs,
        )
    }

    pub(crate) fn subtract(self, rhs: Numeric) -> ThinResult<Numeric> {
        self.apply(
            rhs,
            |lhs, rhs| lhs.checked_sub(rhs),
            |lhs, rhs| lhs.checked_sub(rhs),
            |lhs, rhs| lhs - rhs,
        )
    }

    pub(crate) fn multiply(self, rhs: Numeric) -> ThinResult<Numeric> {
        self.apply(
            rhs,
            |lhs, rhs| lhs.checked_mul(rhs),
            |lhs, rhs| lhs.checked_mul(rhs),
            |lhs, rhs| lhs * rhs,
        )
    }

    /// Divides two numerics. The division of two integers is a decimal.
    pub(crate) fn divide(self, rhs: Numeric) -> ThinResult<Numeric> {
        match (self, rhs) {
            (Numeric::Double(_), _) | (_, Numeric::Double(_)) => {
                Ok(Numeric::Double(self.to_double()? / rhs.to_double()?))
            }
            _ => self
                .to_decimal()?
                .checked_div(rhs.to_decimal()?)
                .map(Numeric::Decimal)
                .ok_or(ThinError::default()),
        }
    }

    fn apply(
        self,
        rhs: Numeric,
        integer: impl FnOnce(Integer, Integer) -> Option<Integer>,
        decimal: impl FnOnce(Decimal, Decimal) -> Option<Decimal>,
        double: impl FnOnce(Double, Double) -> Double,
    ) -> ThinResult<Numeric> {
        match (self, rhs) {
            (Numeric::Integer(lhs), Numeric::Integer(rhs)) => {
                integer(lhs, rhs).map(Numeric::Integer).ok_or(ThinError::default())
            }
            (Numeric::Double(_), _) | (_, Numeric::Double(_)) => {
                Ok(Numeric::Double(double(self.to_double()?, rhs.to_double()?)))
            }
            _ => decimal(self.to_decimal()?, rhs.to_decimal()?)
                .map(Numeric::Decimal)
                .ok_or(ThinError::default()),
        }
    }

    /// Compares two numerics by value. `None` if one of them is NaN.
    pub(crate) fn compare(self, rhs: Numeric) -> Option<Ordering> {
        match (self, rhs) {
            (Numeric::Integer(lhs), Numeric::Integer(rhs)) => Some(lhs.cmp(&rhs)),
            (Numeric::Double(_), _) | (_, Numeric::Double(_)) => self
                .to_double()
                .ok()?
                .partial_cmp(&rhs.to_double().ok()?),
            _ => self
                .to_decimal()
                .ok()?
                .partial_cmp(&rhs.to_decimal().ok()?),
        }
    }
}

/// Returns the value and the language tag of a string literal (a simple literal, an `xsd:string`,
/// or a language-tagged string).
pub(crate) fn string_literal(term: &Term) -> Option<(&str, Option<&str>)> {
    match term {
        Term::Literal(literal)
            if literal.datatype() == xsd::STRING || literal.datatype() == rdf::LANG_STRING =>
        {
            Some((literal.value(), literal.language()))
        }
        _ => None,
    }
}

/// Returns the value of a simple literal or an `xsd:string`.
pub(crate) fn simple_string(term: &Term) -> Option<&str> {
    match string_literal(term) {
        Some((value, None)) => Some(value),
        _ => None,
    }
}

/// Returns the value of an `xsd:boolean` literal.
pub(crate) fn boolean(term: &Term) -> ThinResult<Option<bool>> {
    match term {
        Term::Literal(literal) if literal.datatype() == xsd::BOOLEAN => match literal.value() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => ThinError::expected(),
        },
        _ => Ok(None),
    }
}

/// Creates a string literal that keeps the language tag of the input.
pub(crate) fn string_term(value: impl Into<String>, language: Option<&str>) -> Term {
    match language {
        Some(language) => {
            Literal::new_language_tagged_literal_unchecked(value, language.to_owned()).into()
        }
        None => Literal::new_simple_literal(value).into(),
    }
}

pub(crate) fn boolean_term(value: bool) -> Term {
    Literal::from(value).into()
}

/// Computes the effective boolean value of a term.
pub fn effective_boolean_value(term: &Term) -> ThinResult<bool> {
    if let Some(value) = boolean(term)? {
        return Ok(value);
    }
    if let Some(numeric) = Numeric::from_term(term) {
        return Ok(!numeric.is_zero_or_nan());
    }
    if let Some(value) = simple_string(term) {
        return Ok(!value.is_empty());
    }
    ThinError::expected()
}

/// Compares two terms for the `=` operator.
///
/// Literals of known datatypes are compared by value. Two different literals of an unknown
/// datatype cannot be compared.
pub(crate) fn value_equals(lhs: &Term, rhs: &Term) -> ThinResult<bool> {
    match (lhs, rhs) {
        (Term::Literal(l), Term::Literal(r)) => {
            if let (Some(l), Some(r)) = (Numeric::from_literal(l), Numeric::from_literal(r)) {
                return Ok(l.compare(r) == Some(Ordering::Equal));
            }
            if let (Some(l), Some(r)) = (boolean(lhs)?, boolean(rhs)?) {
                return Ok(l == r);
            }
            if lhs == rhs {
                return Ok(true);
            }
            if is_known_datatype(l) && is_known_datatype(r) {
                Ok(false)
            } else {
                ThinError::expected()
            }
        }
        _ => Ok(lhs == rhs),
    }
}

fn is_known_datatype(literal: &Literal) -> bool {
    let datatype = literal.datatype();
    datatype == xsd::STRING
        || datatype == rdf::LANG_STRING
        || datatype == xsd::BOOLEAN
        || Numeric::from_literal(literal).is_some()
}

/// Compares two terms for the `<`, `<=`, `>`, and `>=` operators.
pub(crate) fn value_compare(lhs: &Term, rhs: &Term) -> ThinResult<Ordering> {
    if let (Some(l), Some(r)) = (Numeric::from_term(lhs), Numeric::from_term(rhs)) {
        return l.compare(r).ok_or(ThinError::default());
    }
    if let (Some(l), Some(r)) = (simple_string(lhs), simple_string(rhs)) {
        return Ok(l.cmp(r));
    }
    if let (Some(l), Some(r)) = (boolean(lhs)?, boolean(rhs)?) {
        return Ok(l.cmp(&r));
    }
    ThinError::expected()
}

/// The total order used by `ORDER BY`.
///
/// Unbound values come first, followed by blank nodes, IRIs, and literals. Literals are ordered
/// by value within numerics, booleans, and strings. All other literals follow, ordered by
/// datatype and lexical form.
pub fn order_terms(lhs: Option<&Term>, rhs: Option<&Term>) -> Ordering {
    match (lhs, rhs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(lhs), Some(rhs)) => match (lhs, rhs) {
            (Term::BlankNode(l), Term::BlankNode(r)) => l.as_str().cmp(r.as_str()),
            (Term::NamedNode(l), Term::NamedNode(r)) => l.as_str().cmp(r.as_str()),
            (Term::Literal(l), Term::Literal(r)) => order_literals(l, r),
            _ => term_rank(lhs).cmp(&term_rank(rhs)),
        },
    }
}

fn term_rank(term: &Term) -> u8 {
    match term {
        Term::BlankNode(_) => 0,
        Term::NamedNode(_) => 1,
        Term::Literal(_) => 2,
        #[allow(unreachable_patterns)]
        _ => 3,
    }
}

fn literal_rank(literal: &Literal) -> u8 {
    let datatype = literal.datatype();
    if Numeric::from_literal(literal).is_some() {
        0
    } else if datatype == xsd::BOOLEAN {
        1
    } else if datatype == xsd::STRING || datatype == rdf::LANG_STRING {
        2
    } else {
        3
    }
}

fn order_literals(lhs: &Literal, rhs: &Literal) -> Ordering {
    let rank = literal_rank(lhs).cmp(&literal_rank(rhs));
    if rank != Ordering::Equal {
        return rank;
    }

    let by_value = match (Numeric::from_literal(lhs), Numeric::from_literal(rhs)) {
        (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };
    by_value
        .then_with(|| lhs.datatype().as_str().cmp(rhs.datatype().as_str()))
        .then_with(|| lhs.value().cmp(rhs.value()))
        .then_with(|| lhs.language().cmp(&rhs.language()))
}
