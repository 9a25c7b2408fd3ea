//! Askama template filters.
//!
//! Case conversion, joining and raw HTML use askama's built-in `upper`,
//! `lower`, `join` and `safe`. Everything else a page needs lives here.

use std::borrow::Borrow;
use std::fmt::Display;

use askama::Values;
use chrono::{format::StrftimeItems, DateTime, TimeDelta, Utc};

// Content hashes computed by build.rs
include!(concat!(env!("OUT_DIR"), "/asset_hashes.rs"));

/// Append a content hash to known static asset URLs so a changed file gets a
/// new URL under the year-long `/static/` cache.
///
/// ```html
/// <link rel="stylesheet" href="{{ "/static/css/main.css"|asset_url }}">
/// ```
#[askama::filter_fn]
pub fn asset_url(path: impl Display, _: &dyn Values) -> askama::Result<String> {
    let path = path.to_string();
    Ok(match path.as_str() {
        "/static/css/main.css" => format!("{path}?v={MAIN_CSS_HASH}"),
        _ => path,
    })
}

// ============================================================================
// Time
// ============================================================================

/// `{{ created|format_time("%d %b %Y at %H:%M") }}`, strftime syntax.
///
/// An unknown specifier fails the render instead of panicking mid-write.
#[askama::filter_fn]
pub fn format_time(t: &DateTime<Utc>, _: &dyn Values, format: &str) -> askama::Result<String> {
    strftime(t, format)
}

/// Time elapsed since `t`, e.g. `2h5m0s`.
#[askama::filter_fn]
pub fn time_since(t: &DateTime<Utc>, _: &dyn Values) -> askama::Result<String> {
    Ok(duration_string(Utc::now() - *t))
}

/// Time left until `t`; negative once `t` has passed.
#[askama::filter_fn]
pub fn time_until(t: &DateTime<Utc>, _: &dyn Values) -> askama::Result<String> {
    Ok(duration_string(*t - Utc::now()))
}

fn strftime(t: &DateTime<Utc>, format: &str) -> askama::Result<String> {
    let items = StrftimeItems::new(format)
        .parse()
        .map_err(askama::Error::custom)?;
    Ok(t.format_with_items(items.iter()).to_string())
}

/// Whole-second `1h2m3s` rendering; `0s` for zero.
fn duration_string(delta: TimeDelta) -> String {
    let secs = delta.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);

    if h > 0 {
        format!("{sign}{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

// ============================================================================
// Strings
// ============================================================================

/// URL-friendly slug: ASCII letters lowercased, digits, `_` and `-` kept,
/// whitespace turned into `-`, everything else dropped.
#[askama::filter_fn]
pub fn slugify(s: impl Display, _: &dyn Values) -> askama::Result<String> {
    Ok(slug(&s.to_string()))
}

fn slug(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii)
        .filter_map(|c| match c {
            c if c.is_ascii_alphabetic() => Some(c.to_ascii_lowercase()),
            c if c.is_ascii_digit() || c == '_' || c == '-' => Some(c),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Numbers
// ============================================================================

/// Integer with thousands separators: `1234567` becomes `1,234,567`.
///
/// Accepts anything whose text form is a base-10 `i64`, strings included.
#[askama::filter_fn]
pub fn format_int(n: impl Display, _: &dyn Values) -> askama::Result<String> {
    let n: i64 = n.to_string().trim().parse().map_err(askama::Error::custom)?;
    Ok(group_int(n))
}

/// Float rounded to `dp` places with thousands separators.
#[askama::filter_fn]
pub fn format_float(f: impl Borrow<f64>, _: &dyn Values, dp: usize) -> askama::Result<String> {
    Ok(group_float(*f.borrow(), dp))
}

fn group_int(n: i64) -> String {
    let sign = if n < 0 { "-" } else { "" };
    format!("{sign}{}", group_digits(&n.unsigned_abs().to_string()))
}

fn group_float(f: f64, dp: usize) -> String {
    if !f.is_finite() {
        return f.to_string();
    }
    let fixed = format!("{:.*}", dp, f.abs());
    let (whole, frac) = match fixed.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (fixed.as_str(), None),
    };
    // -0.00 reads as 0.00
    let sign = if f < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };

    let mut out = format!("{sign}{}", group_digits(whole));
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// Booleans
// ============================================================================

#[askama::filter_fn]
pub fn yesno(b: impl Borrow<bool>, _: &dyn Values) -> askama::Result<&'static str> {
    Ok(if *b.borrow() { "Yes" } else { "No" })
}

// ============================================================================
// URLs
// ============================================================================

/// Replace every value of `key` in the query string with `value`.
///
/// Works on relative and absolute URLs. The rebuilt query is sorted by key.
///
/// ```html
/// <a href="{{ page_url|url_set_param("page", next_page) }}">Next</a>
/// ```
#[askama::filter_fn]
pub fn url_set_param<V: Display>(
    href: impl Display,
    _: &dyn Values,
    key: &str,
    value: V,
) -> askama::Result<String> {
    Ok(rewrite_query(&href.to_string(), key, Some(&value.to_string())))
}

/// Drop every value of `key` from the query string.
#[askama::filter_fn]
pub fn url_del_param(href: impl Display, _: &dyn Values, key: &str) -> askama::Result<String> {
    Ok(rewrite_query(&href.to_string(), key, None))
}

fn rewrite_query(href: &str, key: &str, value: Option<&str>) -> String {
    let (rest, fragment) = match href.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (href, None),
    };
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(k, _)| k != key)
        .collect();
    if let Some(value) = value {
        pairs.push((key.to_string(), value.to_string()));
    }
    // Stable, so repeated keys keep their relative order
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    let mut out = path.to_string();
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
