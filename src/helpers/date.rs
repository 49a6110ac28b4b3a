//! Date helper functions

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Formats backend timestamps for display
#[derive(Debug, Clone)]
pub struct DateFormatter {
    /// chrono format string
    format: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// Create a formatter from a date-fns style pattern, a language tag
    /// (`pt-BR`) and an IANA timezone name
    pub fn new(pattern: &str, language: &str, timezone: &str) -> Result<Self> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Unknown timezone: {}", timezone))?;

        Ok(Self {
            format: date_fns_to_chrono_format(pattern),
            locale: locale_for(language),
            timezone,
        })
    }

    /// Create the formatter configured for the site
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(&config.date_format, &config.language, &config.timezone)
    }

    /// Format a date, e.g. "19 abr 2022"
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.format, self.locale)
            .to_string()
    }

    /// Format a raw publication timestamp; absent or unreadable dates yield
    /// `None`
    pub fn format_publication(&self, raw: Option<&str>) -> Option<String> {
        let raw = raw?;
        match parse_timestamp(raw) {
            Some(date) => Some(self.format(&date)),
            None => {
                tracing::warn!("Ignoring unreadable publication date: {}", raw);
                None
            }
        }
    }
}

/// Parse a backend timestamp
///
/// Accepts RFC 3339 (`2022-04-19T00:00:00Z`) and the colon-less offset
/// Prismic sends (`2022-04-19T00:00:00+0000`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Format a date in ISO 8601 for `<time datetime="...">`
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Map a language tag to a chrono locale, falling back to POSIX
fn locale_for(language: &str) -> Locale {
    let tag = language.trim().replace('-', "_");
    Locale::try_from(tag.as_str()).unwrap_or_else(|_| {
        tracing::warn!("Unknown locale {}, using POSIX month names", language);
        Locale::POSIX
    })
}

/// Convert a date-fns format to a chrono format
///
/// Letters are read in runs (`dd`, `MMM`, `yyyy`); text in single quotes is
/// copied literally.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let spec = match (c, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('E', 4) => Some("%A"),
            ('E', _) => Some("%a"),
            ('a', _) => Some("%p"),
            _ => None,
        };

        match spec {
            Some(spec) => result.push_str(spec),
            None => (0..run).for_each(|_| push_literal(&mut result, c)),
        }
        i += run;
    }

    result
}

fn push_literal(result: &mut String, c: char) {
    if c == '%' {
        result.push_str("%%");
    } else {
        result.push(c);
    }
}
