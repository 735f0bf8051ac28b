//! Level-label abbreviations used by the compact blend index.
//!
//! The front end keys its rating bars off these short codes, so the tables
//! must stay in lockstep with the profile scales in [`crate::rating`].

/// Strength scale abbreviations.
pub static STRENGTH: &[(&str, &str)] = &[
    ("Extremely Mild", "EM"),
    ("Very Mild", "VM"),
    ("Mild", "M"),
    ("Mild to Medium", "MM"),
    ("Medium", "Med"),
    ("Medium to Strong", "MS"),
    ("Strong", "S"),
    ("Very Strong", "VS"),
    ("Extremely Strong", "ES"),
    ("Overwhelming", "O"),
];

/// Flavoring scale abbreviations.
pub static FLAVORING: &[(&str, &str)] = &[
    ("None Detected", "ND"),
    ("Extremely Mild", "EM"),
    ("Very Mild", "VM"),
    ("Mild", "M"),
    ("Mild to Medium", "MM"),
    ("Medium", "Med"),
    ("Medium to Strong", "MS"),
    ("Strong", "S"),
    ("Very Strong", "VS"),
    ("Extra Strong", "ES"),
];

/// Room note scale abbreviations.
pub static ROOM_NOTE: &[(&str, &str)] = &[
    ("Unnoticeable", "UN"),
    ("Pleasant", "P"),
    ("Very Pleasant", "VP"),
    ("Pleasant to Tolerable", "PT"),
    ("Tolerable", "T"),
    ("Tolerable to Strong", "TS"),
    ("Strong", "S"),
    ("Very Strong", "VS"),
    ("Extra Strong", "ES"),
    ("Overwhelming", "O"),
];

/// Taste scale abbreviations.
pub static TASTE: &[(&str, &str)] = &[
    ("Extremely Mild (Flat)", "EMF"),
    ("Very Mild", "VM"),
    ("Mild", "M"),
    ("Mild to Medium", "MM"),
    ("Medium", "Med"),
    ("Medium to Full", "MF"),
    ("Full", "F"),
    ("Very Full", "VF"),
    ("Extra Full", "EF"),
    ("Overwhelming", "O"),
];

/// Shortens a level label via the given table. Unknown labels pass through
/// unchanged, matching how the site treats off-scale data.
pub fn abbreviate(table: &[(&str, &str)], label: &str) -> String {
    table
        .iter()
        .find(|(full, _)| *full == label)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| label.to_string())
}
