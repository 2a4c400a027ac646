use std::collections::HashMap;

pub const DEFAULT_CATEGORY: &str = "7-Other plastics";

const PETE: &str = "1-PETE-Polyethylene terephthalate";
const HDPE: &str = "2-HDPE-High-density polyethylene";
const PVC: &str = "3-PVC-Polyvinyl chloride";
const LDPE: &str = "4-LDPE-Low-density polyethylene";
const PP: &str = "5-PP-Polypropylene";
const PS: &str = "6-PS-Polystyrene";
const ALUMINUM: &str = "Aluminum";

/// Material code → recycling category.
///
/// Codes are normalized (trimmed, uppercased) on insert and on lookup, so
/// callers never need to pre-normalize. Unknown codes resolve to the
/// fallback category instead of failing.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    entries: HashMap<String, String>,
    fallback: String,
}

impl CategoryMap {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn with_entries<I, K, V>(fallback: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = Self::new(fallback);
        for (code, category) in entries {
            map.insert(code.as_ref(), category);
        }
        map
    }

    pub fn insert(&mut self, code: &str, category: impl Into<String>) {
        self.entries.insert(normalize_code(code), category.into());
    }

    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (code, category) in entries {
            self.insert(code.as_ref(), category);
        }
    }

    pub fn category_for(&self, code: &str) -> &str {
        self.entries
            .get(&normalize_code(code))
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&normalize_code(code))
    }

    pub fn set_fallback(&mut self, fallback: impl Into<String>) {
        self.fallback = fallback.into();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::with_entries(
            DEFAULT_CATEGORY,
            [
                ("PET", PETE),
                ("PETE", PETE),
                ("BOPET", PETE),
                ("HDPE", HDPE),
                ("PVC", PVC),
                ("LDPE", LDPE),
                // PE is reported as LDPE unless stated otherwise
                ("PE", LDPE),
                ("PP", PP),
                ("OPP", PP),
                ("BOPP", PP),
                ("PS", PS),
                ("PA", DEFAULT_CATEGORY),
                ("OPA", DEFAULT_CATEGORY),
                ("EVOH", DEFAULT_CATEGORY),
                ("ALUMINUM", ALUMINUM),
                ("AL", ALUMINUM),
            ],
        )
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
