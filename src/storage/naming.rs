// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Final file name derivation for uploads.

/// Byte budget for a sanitized name or directory segment, below NAME_MAX.
pub const MAX_NAME_BYTES: usize = 200;

/// Byte budget for an extension, dot included.
pub const MAX_EXTENSION_BYTES: usize = 16;

/// Inputs that shape the final name of an upload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameParts<'a> {
    /// Name the client asked for, if any.
    pub suggested: Option<&'a str>,
    /// File name of the uploaded part as sent by the client.
    pub original: Option<&'a str>,
    /// Collection the file is filed under.
    pub collection: Option<&'a str>,
    /// Label distinguishing slots inside a collection (e.g. time of day).
    pub label: Option<&'a str>,
}

/// Keep `[A-Za-z0-9_.-]`, turn whitespace runs into one `_`, drop leading dots.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
            out.push(ch);
        }
    }

    out.trim_start_matches('.').to_string()
}

/// Cut a sanitized name to `max` bytes. Sanitized names are ASCII.
fn truncated(mut name: String, max: usize) -> String {
    if name.len() > max {
        name.truncate(max);
    }
    name
}

/// Sanitize a directory segment such as a collection name.
pub fn sanitize_segment(raw: &str) -> String {
    truncated(sanitize_name(raw), MAX_NAME_BYTES)
}

/// Last path component of a client-supplied file name.
fn base_name(original: &str) -> &str {
    original.rsplit(['/', '\\']).next().unwrap_or(original)
}

/// Sanitized extension of the uploaded file, with its leading dot.
///
/// A dot in first position (`.bashrc`) is not an extension.
pub fn extension_of(original: &str) -> String {
    let base = base_name(original);
    match base.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = sanitize_name(&base[idx + 1..]);
            if ext.is_empty() {
                String::new()
            } else {
                format!(".{ext}")
            }
        }
        _ => String::new(),
    }
}

/// Sanitized base name of the uploaded file without its extension.
pub fn stem_of(original: &str) -> String {
    let base = base_name(original);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };
    sanitize_name(stem)
}

fn strip_extension(name: String, ext: &str) -> String {
    if ext.is_empty() || name.len() <= ext.len() {
        return name;
    }
    let split = name.len() - ext.len();
    match name.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(ext) => name[..split].to_string(),
        _ => name,
    }
}

/// Derive the final, sanitized file name for an upload.
///
/// Precedence: `collection_label` slot when both descriptive fields are
/// present, then the suggested name, then the uploaded file's stem, then
/// `fallback_millis`. The uploaded file's extension is always appended.
/// Base and extension are cut to [`MAX_NAME_BYTES`] and
/// [`MAX_EXTENSION_BYTES`].
pub fn derive_file_name(parts: NameParts<'_>, fallback_millis: i64) -> String {
    let ext = parts.original.map(extension_of).unwrap_or_default();

    let slot = match (parts.collection.map(sanitize_name), parts.label.map(sanitize_name)) {
        (Some(c), Some(l)) if !c.is_empty() && !l.is_empty() => Some(format!("{c}_{l}")),
        _ => None,
    };

    let base = slot
        .or_else(|| {
            parts
                .suggested
                .map(|s| strip_extension(sanitize_name(s), &ext))
                .filter(|s| !s.is_empty())
        })
        .or_else(|| parts.original.map(stem_of).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| fallback_millis.to_string());

    let base = truncated(base, MAX_NAME_BYTES);
    let ext = truncated(ext, MAX_EXTENSION_BYTES);
    format!("{base}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_whitespace_and_strips_symbols() {
        assert_eq!(sanitize_name("My  Holiday\tClip!"), "My_Holiday_Clip");
        assert_eq!(sanitize_name("  été 2024 (final)  "), "t_2024_final");
        assert_eq!(sanitize_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_name("..."), "");
    }

    #[test]
    fn extension_handles_edge_cases() {
        assert_eq!(extension_of("clip.mp4"), ".mp4");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("C:\\Users\\me\\clip.MOV"), ".MOV");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of("noext"), "");
    }

    #[test]
    fn collection_and_label_form_a_predictable_slot() {
        let name = derive_file_name(
            NameParts {
                suggested: Some("ignored"),
                original: Some("IMG_0001.mp4"),
                collection: Some("Loft 3"),
                label: Some("morning"),
            },
            0,
        );
        assert_eq!(name, "Loft_3_morning.mp4");
    }

    #[test]
    fn suggested_name_is_sanitized_and_gets_extension() {
        let name = derive_file_name(
            NameParts {
                suggested: Some("Beach day?"),
                original: Some("raw.webm"),
                ..Default::default()
            },
            0,
        );
        assert_eq!(name, "Beach_day.webm");

        let already_suffixed = derive_file_name(
            NameParts {
                suggested: Some("beach.WEBM"),
                original: Some("raw.webm"),
                ..Default::default()
            },
            0,
        );
        assert_eq!(already_suffixed, "beach.webm");
    }

    #[test]
    fn empty_suggestion_falls_back_to_original_stem() {
        let name = derive_file_name(
            NameParts {
                suggested: Some("???"),
                original: Some("holiday clip.mp4"),
                ..Default::default()
            },
            0,
        );
        assert_eq!(name, "holiday_clip.mp4");
    }

    #[test]
    fn unusable_names_fall_back_to_timestamp() {
        let name = derive_file_name(
            NameParts {
                suggested: None,
                original: Some("###.mp4"),
                ..Default::default()
            },
            1_700_000_000_123,
        );
        assert_eq!(name, "1700000000123.mp4");
    }

    #[test]
    fn long_names_are_cut_to_budget() {
        let long = "a".repeat(300);
        let name = derive_file_name(
            NameParts {
                suggested: Some(&long),
                original: Some(&format!("clip.{}", "x".repeat(40))),
                ..Default::default()
            },
            0,
        );
        assert_eq!(name.len(), MAX_NAME_BYTES + MAX_EXTENSION_BYTES);
        assert!(name.starts_with(&"a".repeat(MAX_NAME_BYTES)));
        assert!(name[MAX_NAME_BYTES..].starts_with(".xxx"));

        let slot = derive_file_name(
            NameParts {
                original: Some("clip.mp4"),
                collection: Some(&long),
                label: Some(&long),
                ..Default::default()
            },
            0,
        );
        assert_eq!(slot.len(), MAX_NAME_BYTES + ".mp4".len());
        assert!(slot.ends_with(".mp4"));

        assert_eq!(sanitize_segment(&long).len(), MAX_NAME_BYTES);
        assert_eq!(sanitize_segment("Loft 3"), "Loft_3");
    }
}
