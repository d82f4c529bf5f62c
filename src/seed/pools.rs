/// Fallback first names used when the sanitized input is empty.
pub const FIRST_NAMES: &[&str] = &[
    "Neo", "Trinity", "Morpheus", "Niobe", "Cypher", "Switch", "Apoc", "Dozer", "Tank", "Mouse",
];

pub const LAST_NAMES: &[&str] = &[
    "Anderson", "Reyes", "Hamann", "Ballard", "Mifune", "Lock", "Roland", "Kujaku", "Sati",
    "Oracle",
];

pub const EMAIL_DOMAINS: &[&str] = &[
    "void.matrix",
    "zion.net",
    "nebuchadnezzar.io",
    "construct.dev",
    "mainframe.org",
];

/// Country-code tokens paired with the country they belong to.
pub const COUNTRY_CODES: &[(&str, &str)] = &[
    ("+1", "United States"),
    ("+44", "United Kingdom"),
    ("+49", "Germany"),
    ("+33", "France"),
    ("+34", "Spain"),
    ("+39", "Italy"),
    ("+48", "Poland"),
    ("+7", "Kazakhstan"),
];

/// Widths of the digit groups that follow the country code.
pub const PHONE_GROUPS: [usize; 4] = [3, 3, 2, 2];
