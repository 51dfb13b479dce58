/// ordered rename table, the first rule with a keyword contained in the lowercased label wins.
///
/// some keywords are capitalised and can never match since the label is lowercased first, they're
/// left alone so the table keeps its shape
const RENAME_RULES: &[(&[&str], &str)] = &[
    (&["1", "uno"], "Sky Sport Uno"),
    (&["calcio"], "Sky Sport Calcio"),
    (&["mix", "Mix"], "Sky Sport Mix"),
    (&["Max", "max"], "Sky Sport Max"),
    (&["arena"], "Sky Sport Arena"),
    (&["24"], "Sky Sport 24"),
    (&["tennis"], "Sky Sport Tennis"),
    (&["motogp", "moto gp"], "Sky Sport MotoGP"),
    (&["f1", "formula"], "Sky Sport Formula 1"),
    (&["dazn"], "Dazn 1"),
];

/// suffixes that only mark mirrors of the same channel
const COSMETIC_SUFFIXES: &[&str] = &[" hd", " (backup)", "(backup)"];

pub fn normalize_display_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    RENAME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// dedup key for the resolution cache, never shown to anyone
pub fn base_key(name: &str) -> String {
    let mut key = name.to_lowercase();
    for suffix in COSMETIC_SUFFIXES {
        key = key.replace(suffix, "");
    }
    key.trim().to_string()
}
