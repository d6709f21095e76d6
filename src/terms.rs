use std::collections::HashMap;

/// Most frequent terms across delimiter-separated fields, ties in order of
/// first appearance.
pub fn top_terms<'a, I>(fields: I, delimiter: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    rank_tokens(
        fields
            .into_iter()
            .flatten()
            .flat_map(|field| field.split(delimiter))
            .map(str::trim)
            .filter(|term| !term.is_empty()),
        limit,
    )
}

/// Derives a related-keyword field from a post's title and body: whitespace
/// tokens longer than one character, most frequent first, joined with ", ".
pub fn extract_related_keywords(
    title: Option<&str>,
    body: Option<&str>,
    top_n: usize,
) -> Option<String> {
    let tokens = [title, body]
        .into_iter()
        .flatten()
        .flat_map(str::split_whitespace)
        .filter(|token| token.chars().count() > 1);
    let top = rank_tokens(tokens, top_n);
    if top.is_empty() {
        None
    } else {
        Some(top.join(", "))
    }
}

fn rank_tokens<'a, I>(tokens: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;

    for token in tokens {
        let entry = counts.entry(token).or_insert_with(|| {
            seen += 1;
            (0, seen)
        });
        entry.0 += 1;
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, _)| term.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_frequency_then_first_seen() {
        let fields = vec![
            Some("neck pain, posture, clinic"),
            None,
            Some("posture,price"),
            Some(" clinic , posture "),
            Some("price"),
        ];
        let top = top_terms(fields, ",", 3);
        assert_eq!(top, vec!["posture", "clinic", "price"]);
    }

    #[test]
    fn skips_empty_fragments_and_respects_limit() {
        let top = top_terms(vec![Some("a,,b, ,a"), Some("")], ",", 1);
        assert_eq!(top, vec!["a"]);
        assert!(top_terms(vec![None, Some(" , ")], ",", 3).is_empty());
    }

    #[test]
    fn honours_custom_delimiter() {
        let top = top_terms(vec![Some("x|y|x")], "|", 3);
        assert_eq!(top, vec!["x", "y"]);
    }

    #[test]
    fn related_keywords_come_from_title_and_body() {
        let derived = extract_related_keywords(
            Some("Manual therapy review"),
            Some("therapy for neck pain, a therapy that helped my neck"),
            3,
        );
        assert_eq!(derived.as_deref(), Some("therapy, neck, Manual"));
    }

    #[test]
    fn related_keywords_skip_single_characters() {
        assert_eq!(extract_related_keywords(Some("a b c"), None, 3), None);
        assert_eq!(extract_related_keywords(None, None, 3), None);
        assert_eq!(
            extract_related_keywords(None, Some("x 도수 x 도수 치료"), 3).as_deref(),
            Some("도수, 치료")
        );
    }
}
