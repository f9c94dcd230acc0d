//! Category resolver: maps building-code category codes to corpus documents.

use std::collections::{BTreeMap, BTreeSet};

/// Built-in category table for the building-code corpus.
const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "ADA",
        &[
            "ADA_Standards_2010.pdf",
            "ADA_Standards_Guidance_2010.pdf",
        ],
    ),
    ("IBC", &["International_Building_Code_2021.pdf"]),
    ("IFC", &["International_Fire_Code_2021.pdf"]),
    ("IFGC", &["International_Fuel_Gas_Code_2021.pdf"]),
    ("IMC", &["International_Mechanical_Code_2021.pdf"]),
    ("IPC", &["International_Plumbing_Code_2021.pdf"]),
    (
        "ISPSC",
        &["International_Swimming_Pool_and_Spa_Code_2021.pdf"],
    ),
    ("IECC", &["International_Energy_Conservation_Code_2021.pdf"]),
    ("IRC", &["International_Residential_Code_2018.pdf"]),
];

/// Static mapping from category code to document identifiers.
///
/// Loaded once at startup and shared read-only across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl CategoryMap {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// The building-code table the service ships with.
    pub fn builtin() -> Self {
        let entries = BUILTIN_CATEGORIES
            .iter()
            .map(|(code, ids)| {
                (
                    code.to_string(),
                    ids.iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Use the configured table if there is one, else the built-in table.
    pub fn from_config(categories: Option<&BTreeMap<String, Vec<String>>>) -> Self {
        match categories {
            Some(entries) => Self::new(entries.clone()),
            None => Self::builtin(),
        }
    }

    /// Resolve category codes to the deduplicated union of their document identifiers.
    ///
    /// Unknown codes contribute nothing.
    pub fn resolve<S: AsRef<str>>(&self, codes: &[S]) -> BTreeSet<String> {
        let mut identifiers = BTreeSet::new();

        for code in codes {
            let code = code.as_ref();
            match self.entries.get(code) {
                Some(ids) => identifiers.extend(ids.iter().cloned()),
                None => tracing::debug!("Ignoring unknown category code '{}'", code),
            }
        }

        identifiers
    }

    /// Known category codes, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Document identifiers for one code.
    pub fn documents(&self, code: &str) -> Option<&[String]> {
        self.entries.get(code).map(Vec::as_slice)
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::builtin()
    }
}
