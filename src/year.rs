//! Code for working with years.
use crate::input::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::ops::RangeInclusive;

/// Parse a single year or an inclusive range of years (e.g. "2025..2030").
fn parse_year_or_range(s: &str, horizon: &RangeInclusive<u32>) -> Result<RangeInclusive<u32>> {
    let parse_and_validate_year = |s: &str| {
        let year = s.trim().parse::<u32>().ok()?;
        horizon.contains(&year).then_some(year)
    };

    let Some((start, end)) = s.split_once("..") else {
        let year = parse_and_validate_year(s).with_context(|| format!("Invalid year: {s}"))?;
        return Ok(year..=year);
    };

    // Open-ended ranges are clamped to the horizon
    let start = if start.trim().is_empty() {
        *horizon.start()
    } else {
        parse_and_validate_year(start).with_context(|| format!("Invalid year: {start}"))?
    };
    let end = if end.trim().is_empty() {
        *horizon.end()
    } else {
        parse_and_validate_year(end).with_context(|| format!("Invalid year: {end}"))?
    };
    ensure!(start <= end, "Invalid year range: {s}");

    Ok(start..=end)
}

/// Parse a string of years separated by semicolons into a vector of years.
///
/// The string can be either "all" (case-insensitive), a single year, an inclusive range (e.g.
/// "2025..2030", either end of which may be omitted) or a semicolon-separated list of these (e.g.
/// "2020;2025..2030;2050").
///
/// # Arguments
///
/// - `s` - Input string to parse
/// - `horizon` - The possible years which can be referenced in `s`
///
/// # Returns
///
/// A [`Vec`] of years in ascending order or an error.
pub fn parse_year_str(s: &str, horizon: &RangeInclusive<u32>) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(horizon.clone().collect());
    }

    let years: Vec<_> = s
        .split(';')
        .map(|part| parse_year_or_range(part.trim(), horizon))
        .process_results(|iter| iter.flatten().collect())?;

    ensure!(
        is_sorted_and_unique(&years),
        "Years must be in order and unique"
    );

    Ok(years)
}
