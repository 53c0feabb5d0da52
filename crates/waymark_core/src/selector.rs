//! CSS selectors
//!
//! Parses the selector strings a page hands us through its configuration
//! attributes (`offset`, `menuSelector`, `linkSelector`, ...) and matches them
//! against a host's element tree.
//!
//! # Supported Syntax
//!
//! - Type and universal selectors: `header`, `*`
//! - `#id`, `.class`
//! - Attributes: `[name]`, `[name=value]`, `[name^=value]`, `[name$=value]`,
//!   `[name*=value]`, `[name~=value]`, `[name|=value]` with quoted or bare values
//! - Descendant (`a b`) and child (`a > b`) combinators
//! - Selector lists: `#header, .site-header`
//!
//! Pseudo-classes and sibling combinators are rejected with a
//! [`SelectorError`] so the configuration falls back to its default.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, cut, map, opt, value, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
    Finish, IResult,
};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::SelectorError;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Read access to the parts of an element a selector can test
pub trait SelectorSubject {
    fn tag_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
}

/// Element tree a selector is matched in
///
/// Combinators walk upwards from the candidate through [`parent_node`].
///
/// [`parent_node`]: SelectorTree::parent_node
pub trait SelectorTree {
    type Node: Copy;
    type Subject: SelectorSubject + ?Sized;

    fn subject(&self, node: Self::Node) -> Option<&Self::Subject>;
    fn parent_node(&self, node: Self::Node) -> Option<Self::Node>;
}

/// Attribute comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `=`
    Equals,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Contains,
    /// `~=` (whitespace-separated word)
    Word,
    /// `|=` (exact or followed by `-`)
    DashPrefix,
}

impl AttributeOperator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Prefix => "^=",
            Self::Suffix => "$=",
            Self::Contains => "*=",
            Self::Word => "~=",
            Self::DashPrefix => "|=",
        }
    }

    fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Contains => !expected.is_empty() && actual.contains(expected),
            Self::Word => actual.split_whitespace().any(|word| word == expected),
            Self::DashPrefix => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// An attribute condition: `[name]` or `[name<op>"value"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<(AttributeOperator, String)>,
}

impl AttributeMatch {
    fn matches<S: SelectorSubject + ?Sized>(&self, subject: &S) -> bool {
        match (subject.attribute(&self.name), &self.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some((op, expected))) => op.test(actual, expected),
        }
    }
}

/// How a compound relates to the one on its right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor
    Descendant,
    /// `>`: the direct parent
    Child,
}

/// Conditions on a single element: `tag#id.class[attr]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
    attributes: SmallVec<[AttributeMatch; 2]>,
}

impl Compound {
    fn matches<S: SelectorSubject + ?Sized>(&self, subject: &S) -> bool {
        if let Some(tag) = &self.tag {
            if !subject.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if subject.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| subject.has_class(class))
            && self.attributes.iter().all(|attr| attr.matches(subject))
    }

    fn push(&mut self, part: Part) {
        match part {
            Part::Id(id) if self.id.is_none() => self.id = Some(id),
            // `#a#b`: both must hold, which only an attribute condition can say
            Part::Id(id) => self.attributes.push(AttributeMatch {
                name: "id".into(),
                value: Some((AttributeOperator::Equals, id)),
            }),
            Part::Class(class) => self.classes.push(class),
            Part::Attribute(attr) => self.attributes.push(attr),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty();
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if bare => f.write_str("*")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attributes {
            match &attr.value {
                None => write!(f, "[{}]", attr.name)?,
                Some((op, value)) => write!(f, "[{}{}\"{}\"]", attr.name, op.as_str(), value)?,
            }
        }
        Ok(())
    }
}

/// A compound plus the chain of ancestors it must sit under
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    /// Nearest first; each combinator relates the compound to the one before it
    ancestors: SmallVec<[(Combinator, Compound); 2]>,
}

impl Complex {
    fn matches_in<T: SelectorTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        tree.subject(node)
            .is_some_and(|subject| self.subject.matches(subject))
            && ancestors_match(tree, node, &self.ancestors)
    }
}

fn ancestors_match<T: SelectorTree + ?Sized>(
    tree: &T,
    node: T::Node,
    chain: &[(Combinator, Compound)],
) -> bool {
    let Some(((combinator, compound), rest)) = chain.split_first() else {
        return true;
    };
    let mut current = tree.parent_node(node);
    while let Some(candidate) = current {
        let here = tree
            .subject(candidate)
            .is_some_and(|subject| compound.matches(subject));
        if here && ancestors_match(tree, candidate, rest) {
            return true;
        }
        if *combinator == Combinator::Child {
            return false;
        }
        current = tree.parent_node(candidate);
    }
    false
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (combinator, compound) in self.ancestors.iter().rev() {
            write!(f, "{compound}")?;
            f.write_str(match combinator {
                Combinator::Descendant => " ",
                Combinator::Child => " > ",
            })?;
        }
        write!(f, "{}", self.subject)
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: SmallVec<[Complex; 1]>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectorError::Empty);
        }
        match all_consuming(selector_list)(input).finish() {
            Ok((_, alternatives)) => Ok(Self::from_alternatives(alternatives.into_iter().collect())),
            Err(err) => {
                debug!(selector = input, error = %format_verbose_error(&err), "selector rejected");
                Err(selector_error(input, &err))
            }
        }
    }

    /// Selector matching a tag name
    pub fn tag(tag: &str) -> Self {
        Self::compound(Compound::default()).with_tag(tag)
    }

    /// Selector matching any element with the given class
    pub fn class(class: &str) -> Self {
        Self::compound(Compound::default()).with_class(class)
    }

    /// Selector matching the element with the given id
    pub fn id(id: &str) -> Self {
        Self::compound(Compound {
            id: Some(id.to_string()),
            ..Compound::default()
        })
    }

    pub fn with_tag(self, tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        self.refine(|c| c.tag = Some(tag.clone()))
    }

    pub fn with_class(self, class: &str) -> Self {
        self.refine(|c| c.classes.push(class.to_string()))
    }

    /// Require the attribute to be present
    pub fn with_attribute(self, name: &str) -> Self {
        self.refine(|c| {
            c.attributes.push(AttributeMatch {
                name: name.to_string(),
                value: None,
            })
        })
    }

    /// Require the attribute to equal `value`
    pub fn with_attribute_value(self, name: &str, value: &str) -> Self {
        self.with_attribute_op(name, AttributeOperator::Equals, value)
    }

    pub fn with_attribute_op(self, name: &str, op: AttributeOperator, value: &str) -> Self {
        self.refine(|c| {
            c.attributes.push(AttributeMatch {
                name: name.to_string(),
                value: Some((op, value.to_string())),
            })
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test `node` of `tree`, walking its ancestors for combinators
    pub fn matches_in<T: SelectorTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches_in(tree, node))
    }

    fn compound(subject: Compound) -> Self {
        let mut alternatives = SmallVec::new();
        alternatives.push(Complex {
            subject,
            ancestors: SmallVec::new(),
        });
        Self::from_alternatives(alternatives)
    }

    fn from_alternatives(alternatives: SmallVec<[Complex; 1]>) -> Self {
        let mut selector = Self {
            source: String::new(),
            alternatives,
        };
        selector.rebuild_source();
        selector
    }

    /// Add a condition to the rightmost compound of every alternative
    fn refine(mut self, mut apply: impl FnMut(&mut Compound)) -> Self {
        for complex in &mut self.alternatives {
            apply(&mut complex.subject);
        }
        self.rebuild_source();
        self
    }

    fn rebuild_source(&mut self) {
        self.source = self
            .alternatives
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

// ============================================================================
// Parser
// ============================================================================

enum Part {
    Id(String),
    Class(String),
    Attribute(AttributeMatch),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn identifier(input: &str) -> ParseResult<&str> {
    take_while1(is_ident_char)(input)
}

/// `*` or a tag name
fn type_selector(input: &str) -> ParseResult<Option<String>> {
    alt((
        value(None, char('*')),
        map(identifier, |name: &str| Some(name.to_ascii_lowercase())),
    ))(input)
}

fn id_part(input: &str) -> ParseResult<Part> {
    context(
        "id selector",
        map(preceded(char('#'), cut(identifier)), |id: &str| {
            Part::Id(id.to_string())
        }),
    )(input)
}

fn class_part(input: &str) -> ParseResult<Part> {
    context(
        "class selector",
        map(preceded(char('.'), cut(identifier)), |class: &str| {
            Part::Class(class.to_string())
        }),
    )(input)
}

fn attribute_operator(input: &str) -> ParseResult<AttributeOperator> {
    alt((
        value(AttributeOperator::Prefix, tag("^=")),
        value(AttributeOperator::Suffix, tag("$=")),
        value(AttributeOperator::Contains, tag("*=")),
        value(AttributeOperator::Word, tag("~=")),
        value(AttributeOperator::DashPrefix, tag("|=")),
        value(AttributeOperator::Equals, tag("=")),
    ))(input)
}

fn double_quoted(input: &str) -> ParseResult<&str> {
    delimited(char('"'), take_while(|c: char| c != '"'), cut(char('"')))(input)
}

fn single_quoted(input: &str) -> ParseResult<&str> {
    delimited(char('\''), take_while(|c: char| c != '\''), cut(char('\'')))(input)
}

fn attribute_value(input: &str) -> ParseResult<&str> {
    alt((double_quoted, single_quoted, identifier))(input)
}

fn attribute_part(input: &str) -> ParseResult<Part> {
    context("attribute selector", preceded(char('['), cut(attribute_body)))(input)
}

fn attribute_body(input: &str) -> ParseResult<Part> {
    let (input, _) = multispace0(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, condition) = opt(pair(
        attribute_operator,
        delimited(multispace0, attribute_value, multispace0),
    ))(input)?;
    let (input, _) = char(']')(input)?;

    Ok((
        input,
        Part::Attribute(AttributeMatch {
            name: name.to_string(),
            value: condition.map(|(op, value)| (op, value.to_string())),
        }),
    ))
}

fn compound(input: &str) -> ParseResult<Compound> {
    let (input, (tag_name, parts)) = verify(
        pair(
            opt(type_selector),
            many0(alt((id_part, class_part, attribute_part))),
        ),
        |(tag_name, parts): &(Option<Option<String>>, Vec<Part>)| {
            tag_name.is_some() || !parts.is_empty()
        },
    )(input)?;

    let mut compound = Compound {
        tag: tag_name.flatten(),
        ..Compound::default()
    };
    for part in parts {
        compound.push(part);
    }
    Ok((input, compound))
}

fn child_step(input: &str) -> ParseResult<(Combinator, Compound)> {
    map(
        preceded(delimited(multispace0, char('>'), multispace0), cut(compound)),
        |compound| (Combinator::Child, compound),
    )(input)
}

fn descendant_step(input: &str) -> ParseResult<(Combinator, Compound)> {
    map(preceded(multispace1, compound), |compound| {
        (Combinator::Descendant, compound)
    })(input)
}

fn complex(input: &str) -> ParseResult<Complex> {
    let (input, first) = context("compound selector", compound)(input)?;
    let (input, steps) = many0(alt((child_step, descendant_step)))(input)?;

    // Written left to right; matching runs right to left
    let mut ancestors = SmallVec::new();
    let mut subject = first;
    for (combinator, next) in steps {
        ancestors.push((combinator, subject));
        subject = next;
    }
    ancestors.reverse();
    Ok((input, Complex { subject, ancestors }))
}

fn selector_list(input: &str) -> ParseResult<Vec<Complex>> {
    separated_list1(delimited(multispace0, char(','), multispace0), complex)(input)
}

fn selector_error(input: &str, err: &VerboseError<&str>) -> SelectorError {
    let rest = err.errors.first().map_or("", |(rest, _)| *rest);
    let offset = input.len() - rest.len();
    match rest.chars().next() {
        Some(found) => SelectorError::Unexpected { found, offset },
        None => SelectorError::UnexpectedEnd,
    }
}

fn format_verbose_error(err: &VerboseError<&str>) -> String {
    let parts: Vec<String> = err
        .errors
        .iter()
        .map(|(input, kind)| match kind {
            VerboseErrorKind::Context(ctx) => format!("in {ctx}"),
            VerboseErrorKind::Char(c) => {
                let preview: String = input.chars().take(20).collect();
                format!("expected '{c}' near \"{preview}\"")
            }
            VerboseErrorKind::Nom(kind) => format!("{kind:?}"),
        })
        .collect();
    parts.join(", ")
}
