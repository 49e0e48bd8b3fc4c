use std::collections::HashMap;

/// English display names for the language codes used as `lang/<code>.json`.
#[derive(Debug, Clone)]
pub struct LanguageNames {
    languages: HashMap<String, String>,
    regions: HashMap<String, String>,
    full_tags: HashMap<String, String>,
}

impl LanguageNames {
    pub fn new() -> Self {
        let mut languages = HashMap::new();
        for (code, name) in [
            ("ar", "Arabic"),
            ("bg", "Bulgarian"),
            ("ca", "Catalan"),
            ("cs", "Czech"),
            ("cy", "Welsh"),
            ("da", "Danish"),
            ("de", "German"),
            ("el", "Greek"),
            ("en", "English"),
            ("eo", "Esperanto"),
            ("es", "Spanish"),
            ("et", "Estonian"),
            ("eu", "Basque"),
            ("fa", "Persian"),
            ("fi", "Finnish"),
            ("fr", "French"),
            ("ga", "Irish"),
            ("gl", "Galician"),
            ("he", "Hebrew"),
            ("hi", "Hindi"),
            ("hr", "Croatian"),
            ("hu", "Hungarian"),
            ("id", "Indonesian"),
            ("is", "Icelandic"),
            ("it", "Italian"),
            ("ja", "Japanese"),
            ("ko", "Korean"),
            ("la", "Latin"),
            ("lt", "Lithuanian"),
            ("lv", "Latvian"),
            ("nb", "Norwegian Bokmål"),
            ("nl", "Dutch"),
            ("no", "Norwegian"),
            ("pl", "Polish"),
            ("pt", "Portuguese"),
            ("ro", "Romanian"),
            ("ru", "Russian"),
            ("sk", "Slovak"),
            ("sl", "Slovenian"),
            ("sr", "Serbian"),
            ("sv", "Swedish"),
            ("th", "Thai"),
            ("tr", "Turkish"),
            ("uk", "Ukrainian"),
            ("vi", "Vietnamese"),
            ("zh", "Chinese"),
        ] {
            languages.insert(code.to_string(), name.to_string());
        }

        let mut regions = HashMap::new();
        for (code, name) in [
            ("AT", "Austria"),
            ("AU", "Australia"),
            ("BE", "Belgium"),
            ("BR", "Brazil"),
            ("CA", "Canada"),
            ("CH", "Switzerland"),
            ("CN", "China"),
            ("DE", "Germany"),
            ("ES", "Spain"),
            ("FR", "France"),
            ("GB", "United Kingdom"),
            ("HK", "Hong Kong SAR China"),
            ("IE", "Ireland"),
            ("IN", "India"),
            ("IT", "Italy"),
            ("JP", "Japan"),
            ("KR", "South Korea"),
            ("LU", "Luxembourg"),
            ("MX", "Mexico"),
            ("NL", "Netherlands"),
            ("NZ", "New Zealand"),
            ("PL", "Poland"),
            ("PT", "Portugal"),
            ("RU", "Russia"),
            ("SE", "Sweden"),
            ("SG", "Singapore"),
            ("TW", "Taiwan"),
            ("UA", "Ukraine"),
            ("US", "United States"),
        ] {
            regions.insert(code.to_string(), name.to_string());
        }

        // Tags with a dedicated dialect name
        let mut full_tags = HashMap::new();
        for (tag, name) in [
            ("de-AT", "Austrian German"),
            ("de-CH", "Swiss High German"),
            ("en-AU", "Australian English"),
            ("en-CA", "Canadian English"),
            ("en-GB", "British English"),
            ("en-US", "American English"),
            ("es-419", "Latin American Spanish"),
            ("es-ES", "European Spanish"),
            ("es-MX", "Mexican Spanish"),
            ("fr-CA", "Canadian French"),
            ("fr-CH", "Swiss French"),
            ("nl-BE", "Flemish"),
            ("pt-BR", "Brazilian Portuguese"),
            ("pt-PT", "European Portuguese"),
            ("zh-Hans", "Simplified Chinese"),
            ("zh-Hant", "Traditional Chinese"),
        ] {
            full_tags.insert(tag.to_string(), name.to_string());
        }

        Self {
            languages,
            regions,
            full_tags,
        }
    }

    /// Returns `None` when the primary language subtag is unknown.
    pub fn display_name(&self, code: &str) -> Option<String> {
        let tag = canonical_tag(code);
        if let Some(name) = self.full_tags.get(&tag) {
            return Some(name.clone());
        }

        let mut subtags = tag.split('-');
        let language = self.languages.get(subtags.next()?)?;

        // Unknown regions keep their code, e.g. `German (LI)`
        match subtags.next().filter(|region| !region.is_empty()) {
            Some(region) => {
                let region = self.regions.get(region).map(String::as_str).unwrap_or(region);
                Some(format!("{} ({})", language, region))
            }
            None => Some(language.clone()),
        }
    }

    pub fn display_name_or_code(&self, code: &str) -> String {
        self.display_name(code).unwrap_or_else(|| code.to_string())
    }
}

impl Default for LanguageNames {
    fn default() -> Self {
        Self::new()
    }
}

/// `pt_br` -> `pt-BR`, `ZH-hant` -> `zh-Hant`
fn canonical_tag(code: &str) -> String {
    code.split(['-', '_'])
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                part.to_lowercase()
            } else if part.len() == 4 {
                let mut script = part.to_lowercase();
                if let Some(first) = script.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                script
            } else {
                part.to_uppercase()
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
