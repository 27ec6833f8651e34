//! Translation catalogs, built once per process and shared by every request
//! context.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::De, Locale::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::De => "de",
            Locale::En => "en",
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept region-qualified tags such as de_DE or en-GB.
        let lang = s.trim().split(['_', '-']).next().unwrap_or("").to_ascii_lowercase();
        Locale::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == lang)
            .ok_or_else(|| anyhow!("unsupported locale '{}'", s))
    }
}

#[derive(Debug)]
pub struct Catalog {
    locale: Locale,
    messages: HashMap<&'static str, &'static str>,
}

impl Catalog {
    pub fn locale(&self) -> Locale { self.locale }

    /// Translated text for `msgid`, or `msgid` itself when untranslated.
    pub fn gettext<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.messages.get(msgid).copied().unwrap_or(msgid)
    }

    pub fn len(&self) -> usize { self.messages.len() }
    pub fn is_empty(&self) -> bool { self.messages.is_empty() }
}

// (msgid, de, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("error.not_privileged", "Nicht berechtigt.", "Not privileged."),
    ("error.not_logged_in", "Nicht angemeldet.", "Not logged in."),
    ("error.unknown_persona", "Unbekannte Person.", "Unknown persona."),
    ("error.unknown_event", "Unbekannte Veranstaltung.", "Unknown event."),
    ("error.unknown_mailinglist", "Unbekannte Mailingliste.", "Unknown mailinglist."),
    ("error.unknown_assembly", "Unbekannte Versammlung.", "Unknown assembly."),
    ("error.invalid_argument", "Ungültiges Argument.", "Invalid argument."),
    ("notify.subscribed", "Abonniert.", "Subscribed."),
    ("notify.unsubscribed", "Abbestellt.", "Unsubscribed."),
    ("notify.request_pending", "Anfrage wartet auf Bestätigung.", "Request awaits moderation."),
];

static CATALOGS: Lazy<HashMap<Locale, Catalog>> = Lazy::new(|| {
    Locale::ALL
        .iter()
        .map(|&locale| {
            let messages = MESSAGES
                .iter()
                .map(|(id, de, en)| (*id, if locale == Locale::De { *de } else { *en }))
                .collect();
            (locale, Catalog { locale, messages })
        })
        .collect()
});

/// The process-wide catalog for `locale`.
pub fn catalog(locale: Locale) -> &'static Catalog {
    match CATALOGS.get(&locale) {
        Some(c) => c,
        // Every Locale variant is populated above.
        None => &CATALOGS[&Locale::default()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_are_shared_per_locale() {
        let a = catalog(Locale::En);
        let b = catalog(Locale::En);
        assert!(std::ptr::eq(a, b));
        assert!(!std::ptr::eq(a, catalog(Locale::De)));
    }

    #[test]
    fn gettext_translates_and_falls_back() {
        assert_eq!(catalog(Locale::De).gettext("error.not_privileged"), "Nicht berechtigt.");
        assert_eq!(catalog(Locale::En).gettext("error.not_privileged"), "Not privileged.");
        assert_eq!(catalog(Locale::En).gettext("no.such.id"), "no.such.id");
    }

    #[test]
    fn locale_parsing() {
        assert_eq!("de_DE".parse::<Locale>().unwrap(), Locale::De);
        assert_eq!("EN-gb".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}
