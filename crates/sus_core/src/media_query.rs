//! Media queries
//!
//! Parser and evaluator for the subset of CSS Media Queries used by the
//! widgets: media types `all`, `screen` and `print`, the range features
//! `width`/`height` (with `min-`/`max-` prefixes, in `px`, `em` or `rem`),
//! `orientation` and `prefers-color-scheme`.
//!
//! ```
//! use sus_core::geometry::Size;
//! use sus_core::media_query::{ColorScheme, MediaEnvironment, MediaQueryList};
//!
//! let query = MediaQueryList::parse("screen and (min-width: 768px)").unwrap();
//! let env = MediaEnvironment::new(Size::new(1024.0, 768.0), ColorScheme::Light);
//! assert!(query.matches(&env));
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit0, digit1, multispace0, multispace1},
    combinator::{all_consuming, map_res, opt, recognize},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{pair, preceded, terminated, tuple},
    Finish, IResult,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::MediaQueryError;
use crate::geometry::Size;

pub(crate) type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Pixels per `em`/`rem` (initial font size)
pub const PX_PER_EM: f32 = 16.0;

/// User color scheme preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(ColorScheme::Light),
            "dark" => Ok(ColorScheme::Dark),
            other => Err(format!("unknown color scheme `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// What a media query is evaluated against
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MediaEnvironment {
    pub viewport: Size,
    pub color_scheme: ColorScheme,
}

impl MediaEnvironment {
    pub fn new(viewport: Size, color_scheme: ColorScheme) -> Self {
        Self {
            viewport,
            color_scheme,
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.viewport.height >= self.viewport.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    All,
    Screen,
    Print,
}

/// Comparison against a length, in px
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LengthRange {
    Exact(f32),
    Min(f32),
    Max(f32),
    /// Boolean context: `(width)`
    NonZero,
}

impl LengthRange {
    fn matches(&self, actual: f32) -> bool {
        match *self {
            LengthRange::Exact(v) => actual == v,
            LengthRange::Min(v) => actual >= v,
            LengthRange::Max(v) => actual <= v,
            LengthRange::NonZero => actual > 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaFeature {
    Width(LengthRange),
    Height(LengthRange),
    /// `None` in boolean context
    Orientation(Option<Orientation>),
    PrefersColorScheme(Option<ColorScheme>),
}

impl MediaFeature {
    fn matches(&self, env: &MediaEnvironment) -> bool {
        match self {
            MediaFeature::Width(range) => range.matches(env.viewport.width),
            MediaFeature::Height(range) => range.matches(env.viewport.height),
            MediaFeature::Orientation(o) => o.map_or(true, |o| o == env.orientation()),
            MediaFeature::PrefersColorScheme(s) => s.map_or(true, |s| s == env.color_scheme),
        }
    }
}

/// One comma-separated query
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQuery {
    pub negated: bool,
    pub media_type: MediaType,
    pub features: SmallVec<[MediaFeature; 2]>,
}

impl MediaQuery {
    pub fn matches(&self, env: &MediaEnvironment) -> bool {
        let type_matches = match self.media_type {
            MediaType::All | MediaType::Screen => true,
            MediaType::Print => false,
        };
        let matched = type_matches && self.features.iter().all(|f| f.matches(env));
        matched != self.negated
    }
}

/// A parsed media query list; matches when any of its queries match.
/// An empty list matches everything.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQueryList {
    source: String,
    queries: Vec<MediaQuery>,
}

impl MediaQueryList {
    pub fn parse(source: &str) -> Result<Self, MediaQueryError> {
        let (_, raw) = query_list(source)
            .finish()
            .map_err(|err| syntax_error(source, err))?;

        let queries = raw
            .into_iter()
            .map(RawQuery::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: source.to_string(),
            queries,
        })
    }

    pub fn matches(&self, env: &MediaEnvironment) -> bool {
        self.queries.is_empty() || self.queries.iter().any(|q| q.matches(env))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn queries(&self) -> &[MediaQuery] {
        &self.queries
    }
}

impl FromStr for MediaQueryList {
    type Err = MediaQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MediaQueryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn syntax_error(source: &str, err: VerboseError<&str>) -> MediaQueryError {
    let rest = err
        .errors
        .first()
        .map(|(fragment, _)| fragment.chars().take(30).collect())
        .unwrap_or_default();
    let expected = err
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some((*ctx).to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "media query".to_string());

    MediaQueryError::Syntax {
        query: source.to_string(),
        rest,
        expected,
    }
}

// ============================================================================
// Nom parsers
// ============================================================================

struct RawFeature<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

struct RawQuery<'a> {
    modifier: Option<&'a str>,
    media_type: Option<&'a str>,
    features: Vec<RawFeature<'a>>,
}

fn identifier(input: &str) -> ParseResult<&str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-')(input)
}

/// `(name)` or `(name: value)`
fn feature(input: &str) -> ParseResult<RawFeature> {
    context("media feature", |input| {
        let (input, _) = char('(')(input)?;
        let (input, _) = multispace0(input)?;
        let (input, name) = identifier(input)?;
        let (input, value) = opt(preceded(
            tuple((multispace0, char(':'), multispace0)),
            take_while1(|c: char| c != ')'),
        ))(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = char(')')(input)?;
        Ok((
            input,
            RawFeature {
                name,
                value: value.map(str::trim),
            },
        ))
    })(input)
}

fn and_feature(input: &str) -> ParseResult<RawFeature> {
    preceded(
        tuple((multispace1, tag_no_case("and"), multispace1)),
        feature,
    )(input)
}

fn typed_query(input: &str) -> ParseResult<RawQuery> {
    let (input, modifier) = opt(terminated(
        alt((tag_no_case("not"), tag_no_case("only"))),
        multispace1,
    ))(input)?;
    let (input, media_type) = context("media type", identifier)(input)?;
    let (input, features) = many0(and_feature)(input)?;
    Ok((
        input,
        RawQuery {
            modifier,
            media_type: Some(media_type),
            features,
        },
    ))
}

fn feature_query(input: &str) -> ParseResult<RawQuery> {
    let (input, first) = feature(input)?;
    let (input, mut rest) = many0(and_feature)(input)?;
    rest.insert(0, first);
    Ok((
        input,
        RawQuery {
            modifier: None,
            media_type: None,
            features: rest,
        },
    ))
}

fn query_list(input: &str) -> ParseResult<Vec<RawQuery>> {
    all_consuming(|input| {
        let (input, _) = multispace0(input)?;
        let (input, queries) = separated_list0(
            tuple((multispace0, char(','), multispace0)),
            alt((feature_query, typed_query)),
        )(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, queries))
    })(input)
}

/// Unsigned or negative decimal number
pub(crate) fn number(input: &str) -> ParseResult<f32> {
    map_res(
        recognize(pair(
            opt(char('-')),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
        )),
        str::parse::<f32>,
    )(input)
}

/// Length in px; `em`/`rem` use [`PX_PER_EM`]; a bare number is only
/// accepted for zero
fn length(input: &str) -> ParseResult<Option<f32>> {
    let (input, value) = number(input)?;
    let (input, unit) = opt(alt((tag_no_case("px"), tag_no_case("rem"), tag_no_case("em"))))(input)?;
    let px = match unit.map(str::to_ascii_lowercase).as_deref() {
        Some("px") => Some(value),
        Some(_) => Some(value * PX_PER_EM),
        None if value == 0.0 => Some(0.0),
        None => None,
    };
    Ok((input, px))
}

fn parse_length(feature: &str, value: &str) -> Result<f32, MediaQueryError> {
    let invalid = || MediaQueryError::InvalidValue {
        feature: feature.to_string(),
        value: value.to_string(),
    };
    match all_consuming(length)(value).finish() {
        Ok((_, Some(px))) => Ok(px),
        _ => Err(invalid()),
    }
}

impl RawFeature<'_> {
    fn resolve(&self) -> Result<MediaFeature, MediaQueryError> {
        let name = self.name.to_ascii_lowercase();
        let invalid = |value: &str| MediaQueryError::InvalidValue {
            feature: name.clone(),
            value: value.to_string(),
        };

        let (axis, prefix) = match name.as_str() {
            "width" | "height" => (name.as_str(), ""),
            "min-width" | "max-width" => ("width", &name[..3]),
            "min-height" | "max-height" => ("height", &name[..3]),
            "orientation" => {
                let orientation = match self.value.map(str::to_ascii_lowercase).as_deref() {
                    None => None,
                    Some("portrait") => Some(Orientation::Portrait),
                    Some("landscape") => Some(Orientation::Landscape),
                    Some(other) => return Err(invalid(other)),
                };
                return Ok(MediaFeature::Orientation(orientation));
            }
            "prefers-color-scheme" => {
                let scheme = match self.value {
                    None => None,
                    Some(v) => Some(v.parse::<ColorScheme>().map_err(|_| invalid(v))?),
                };
                return Ok(MediaFeature::PrefersColorScheme(scheme));
            }
            _ => return Err(MediaQueryError::UnknownFeature(name.clone())),
        };

        let range = match (prefix, self.value) {
            ("", None) => LengthRange::NonZero,
            (_, None) => return Err(invalid("")),
            ("", Some(v)) => LengthRange::Exact(parse_length(&name, v)?),
            ("min", Some(v)) => LengthRange::Min(parse_length(&name, v)?),
            (_, Some(v)) => LengthRange::Max(parse_length(&name, v)?),
        };

        Ok(if axis == "width" {
            MediaFeature::Width(range)
        } else {
            MediaFeature::Height(range)
        })
    }
}

impl RawQuery<'_> {
    fn resolve(self) -> Result<MediaQuery, MediaQueryError> {
        let media_type = match self.media_type.map(str::to_ascii_lowercase).as_deref() {
            None | Some("all") => MediaType::All,
            Some("screen") => MediaType::Screen,
            Some("print") => MediaType::Print,
            Some(other) => {
                return Err(MediaQueryError::InvalidValue {
                    feature: "media-type".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let negated = self
            .modifier
            .is_some_and(|m| m.eq_ignore_ascii_case("not"));
        let features = self
            .features
            .iter()
            .map(RawFeature::resolve)
            .collect::<Result<SmallVec<_>, _>>()?;

        Ok(MediaQuery {
            negated,
            media_type,
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(width: f32, height: f32) -> MediaEnvironment {
        MediaEnvironment::new(Size::new(width, height), ColorScheme::Light)
    }

    fn matches(query: &str, env: &MediaEnvironment) -> bool {
        MediaQueryList::parse(query).unwrap().matches(env)
    }

    #[test]
    fn test_min_max_width() {
        let desktop = env(1280.0, 800.0);
        let phone = env(375.0, 812.0);

        assert!(matches("(min-width: 768px)", &desktop));
        assert!(!matches("(min-width: 768px)", &phone));
        assert!(matches("(max-width: 767px)", &phone));
        assert!(matches("(min-width: 48em)", &env(768.0, 500.0)));
        assert!(matches("(min-width: 40rem)", &env(640.0, 500.0)));
    }

    #[test]
    fn test_media_types_and_not() {
        let e = env(800.0, 600.0);
        assert!(matches("screen", &e));
        assert!(matches("all and (min-width: 0)", &e));
        assert!(!matches("print", &e));
        assert!(matches("not print", &e));
        assert!(!matches("not screen and (min-width: 100px)", &e));
        assert!(matches("only screen and (max-width: 800px)", &e));
    }

    #[test]
    fn test_comma_list_any() {
        let e = env(500.0, 900.0);
        assert!(matches("print, (orientation: portrait)", &e));
        assert!(!matches("print, (orientation: landscape)", &e));
    }

    #[test]
    fn test_color_scheme() {
        let dark = MediaEnvironment::new(Size::new(100.0, 100.0), ColorScheme::Dark);
        assert!(matches("(prefers-color-scheme: dark)", &dark));
        assert!(!matches("(prefers-color-scheme: light)", &dark));
    }

    #[test]
    fn test_empty_list_matches_all() {
        assert!(matches("", &env(1.0, 1.0)));
        assert!(matches("   ", &env(1.0, 1.0)));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("SCREEN AND (MIN-WIDTH: 10PX)", &env(20.0, 20.0)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            MediaQueryList::parse("(min-width: 768px"),
            Err(MediaQueryError::Syntax { .. })
        ));
        assert_eq!(
            MediaQueryList::parse("(hover: hover)"),
            Err(MediaQueryError::UnknownFeature("hover".to_string()))
        );
        assert!(matches!(
            MediaQueryList::parse("(min-width: 768)"),
            Err(MediaQueryError::InvalidValue { .. })
        ));
        assert!(matches!(
            MediaQueryList::parse("(orientation: sideways)"),
            Err(MediaQueryError::InvalidValue { .. })
        ));
        assert!(matches!(
            MediaQueryList::parse("tv"),
            Err(MediaQueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_number() {
        assert_eq!(number("12.5px"), Ok(("px", 12.5)));
        assert_eq!(number("-.5%"), Ok(("%", -0.5)));
        assert!(number("px").is_err());
    }
}
