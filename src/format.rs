//! Caption and filename formatting
//!
//! Pure text transforms over [`BookInfo`]: the channel caption shown under a
//! delivered document, and a transport-safe Latin-script filename.

use crate::types::{BookInfo, FileVariant};

/// Maximum caption length accepted by the delivery transport
pub const CAPTION_LIMIT: usize = 1024;

/// Maximum total filename length accepted by the delivery transport
pub const FILENAME_LIMIT: usize = 64;

/// Appended when trailing authors are dropped to fit the caption limit
const TRUNCATED_AUTHORS_SUFFIX: &str = "\n и т.д.";

/// Characters the transport does not accept in filenames at all
const STRIPPED: &[char] = &[
    '(', ')', ',', '…', '\u{2019}', '!', '"', '?', '»', '«', '\'', ':',
];

/// Build the caption: title line, blank line, one line per author
///
/// When the result would exceed [`CAPTION_LIMIT`] characters, trailing
/// authors are dropped one by one and an "and so on" marker is appended
/// until it fits.
pub fn caption(book: &BookInfo) -> String {
    if book.authors.is_empty() {
        return format!("📖 {}", book.title);
    }

    let mut result = render_caption(book, book.authors.len(), false);
    let mut kept = book.authors.len();
    while result.chars().count() > CAPTION_LIMIT && kept > 0 {
        kept -= 1;
        result = render_caption(book, kept, true);
    }
    result
}

fn render_caption(book: &BookInfo, authors: usize, truncated: bool) -> String {
    let mut out = format!("📖 {}\n\n", book.title);
    out.push_str(
        &book.authors[..authors]
            .iter()
            .map(|a| format!("👤 {}", a.normal_name()))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    if truncated {
        out.push_str(TRUNCATED_AUTHORS_SUFFIX);
    }
    out
}

/// Build a transport-safe filename: `<authors>_-_<title>.<book_id>.<variant>`
///
/// Author short-forms and the title are folded to Latin script, disallowed
/// punctuation is stripped, remaining unsafe characters become `_`, and the
/// stem is truncated so the whole name stays within [`FILENAME_LIMIT`].
pub fn filename(book: &BookInfo, variant: &FileVariant) -> String {
    let mut stem = String::new();
    if !book.authors.is_empty() {
        stem.push_str(
            &book
                .authors
                .iter()
                .map(|a| a.short_name())
                .collect::<Vec<_>>()
                .join("_"),
        );
        stem.push_str("_-_");
    }
    stem.push_str(book.title.trim_end());

    let stem = sanitize(&stem);
    let suffix = format!(".{}.{}", book.id, variant.file_suffix());
    let keep = FILENAME_LIMIT.saturating_sub(suffix.len());
    let stem: String = stem.chars().take(keep).collect();

    format!("{stem}{suffix}")
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .map(|c| match c {
            '\u{2014}' | '\u{2013}' => '-',
            '/' => '_',
            '\u{2116}' => 'N',
            'á' => 'a',
            ' ' | '\u{a0}' => '_',
            c => c,
        })
        .collect();

    // Fold the rest (Cyrillic titles in particular) to Latin script, then
    // squash anything still outside the transport-safe set.
    deunicode::deunicode(&cleaned)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthorInfo, BookId};

    fn author(last: &str, first: &str, middle: &str) -> AuthorInfo {
        AuthorInfo {
            first_name: first.to_string(),
            last_name: last.to_string(),
            middle_name: middle.to_string(),
        }
    }

    fn book(title: &str, authors: Vec<AuthorInfo>) -> BookInfo {
        BookInfo {
            id: BookId(42),
            title: title.to_string(),
            lang: Some("ru".to_string()),
            file_type: Some("fb2".to_string()),
            authors,
        }
    }

    #[test]
    fn test_caption_without_authors() {
        let book = book("Война и мир", vec![]);
        assert_eq!(caption(&book), "📖 Война и мир");
    }

    #[test]
    fn test_caption_with_authors() {
        let book = book(
            "Война и мир",
            vec![author("Толстой", "Лев", "Николаевич")],
        );
        assert_eq!(
            caption(&book),
            "📖 Война и мир\n\n👤 Толстой Лев Николаевич"
        );
    }

    #[test]
    fn test_caption_drops_trailing_authors_over_limit() {
        let authors: Vec<AuthorInfo> = (0..60)
            .map(|i| author(&format!("Фамилия{i:02}"), "Имяимяимя", "Отчество"))
            .collect();
        let book = book("Сборник", authors);

        let result = caption(&book);
        assert!(result.chars().count() <= CAPTION_LIMIT);
        assert!(result.ends_with(" и т.д."));
        assert!(result.starts_with("📖 Сборник"));
        // At least the leading authors survive.
        assert!(result.contains("👤 Фамилия00"));
    }

    #[test]
    fn test_short_caption_untouched() {
        let book = book("t", vec![author("a", "", "")]);
        let result = caption(&book);
        assert!(!result.contains("и т.д."));
    }

    #[test]
    fn test_filename_transliterates_and_joins() {
        let book = book(
            "Война и мир",
            vec![author("Толстой", "Лев", "Николаевич")],
        );
        let name = filename(&book, &FileVariant::Epub);
        assert_eq!(name, "Tolstoi_L_N_-_Voina_i_mir.42.epub");
    }

    #[test]
    fn test_filename_without_authors() {
        let book = book("Аноним", vec![]);
        let name = filename(&book, &FileVariant::Fb2);
        assert_eq!(name, "Anonim.42.fb2");
    }

    #[test]
    fn test_filename_strips_disallowed_punctuation() {
        let book = book("Что делать? (роман), №1: «ответ»!", vec![]);
        let name = filename(&book, &FileVariant::Fb2);
        assert!(!name.contains('?'));
        assert!(!name.contains('('));
        assert!(!name.contains(','));
        assert!(!name.contains(':'));
        assert!(name.contains("N1"));
        assert!(name.ends_with(".42.fb2"));
    }

    #[test]
    fn test_filename_length_capped() {
        let book = book(&"Очень длинное название книги ".repeat(5), vec![]);
        let name = filename(&book, &FileVariant::Fb2Zip);
        assert!(name.len() <= FILENAME_LIMIT);
        assert!(name.ends_with(".42.fb2.zip"));
    }

    #[test]
    fn test_filename_variant_suffix_uses_dots() {
        let book = book("Книга", vec![]);
        let name = filename(&book, &FileVariant::Fb2Zip);
        assert_eq!(name, "Kniga.42.fb2.zip");
    }

    #[test]
    fn test_filename_trailing_space_trimmed() {
        let book = book("Книга ", vec![]);
        let name = filename(&book, &FileVariant::Fb2);
        assert_eq!(name, "Kniga.42.fb2");
    }
}
