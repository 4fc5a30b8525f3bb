//! Codestream naming helpers.
//!
//! Product and codestream names come in many spellings (`sles11-sp2`,
//! `SLED10-SP4-UPDATE`, ...). These helpers bring them to the canonical
//! `SLE-11-SP2` form.

/// Replacements applied in order to the uppercased name.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("SLE12", "SLE-12"),
    ("SLE11", "SLE-11"),
    ("SLE10", "SLE-10"),
    ("SLE9", "SLE-9"),
    ("SLED9", "SLE-9"),
    ("SLED10", "SLE-10"),
    ("SLED11", "SLE-11"),
    ("SLES9", "SLE-9"),
    ("SLES10", "SLE-10"),
    ("SLES11", "SLE-11"),
    ("OES11", "OES-11"),
    ("OES2", "OES-2"),
    ("-UPDATE", ""),
    ("-STAGING", ""),
];

/// Canonical codestream name.
pub fn codestream_name(name: &str) -> String {
    let mut dist = name.to_uppercase();
    for (from, to) in REPLACEMENTS {
        dist = dist.replace(from, to);
    }

    match dist.as_str() {
        "SMT11-SP2" => return "SLE-11-SP2-PRODUCTS".to_string(),
        "SLEPOS10" => return "SLE-10-SP4".to_string(),
        _ => {}
    }

    if let Some((base, end)) = dist.rsplit_once('-') {
        if end.starts_with("PL") || end.starts_with("HWREFRESH") {
            return format!("{}-HWRefresh", base);
        }
    }

    dist
}

/// Codestream without service pack, e.g. `SLE-11` for `SLE-11-SP2`.
pub fn codestream_base(name: &str) -> &str {
    if !(name.starts_with("SLE-") || name.starts_with("OES-")) {
        return name;
    }
    match name[4..].find('-') {
        Some(pos) => &name[..4 + pos],
        None => name,
    }
}
