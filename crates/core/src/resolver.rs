use crate::domain::item::{ItemId, ItemSnapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedReference {
    Item(ItemId),
    Unresolved,
}

/// Maps a free-text phrase to one of the candidate snapshots. Candidates are
/// ordered least recent first; user-facing ordinals are 1-based over that
/// order, and keyword-score ties prefer the most recently shown candidate.
#[derive(Clone, Debug, Default)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Strategies run in strict priority order, first match wins:
    /// numeric ordinal, Spanish textual ordinal, keyword scoring.
    pub fn resolve(&self, phrase: &str, candidates: &[ItemSnapshot]) -> ResolvedReference {
        if candidates.is_empty() {
            return ResolvedReference::Unresolved;
        }

        let normalized_phrase = normalize_text(phrase);
        let tokens = tokenize(&normalized_phrase);

        if let Some(index) = numeric_ordinal(&tokens) {
            if let Some(item) = candidates.get(index) {
                return ResolvedReference::Item(item.id.clone());
            }
            // An out-of-range ordinal is an explicit miss; keyword matching
            // on the digits would only produce nonsense.
            return ResolvedReference::Unresolved;
        }

        if let Some(position) = textual_ordinal(&tokens) {
            let index = match position {
                OrdinalPosition::FromStart(index) => index,
                OrdinalPosition::Last => candidates.len() - 1,
            };
            if let Some(item) = candidates.get(index) {
                return ResolvedReference::Item(item.id.clone());
            }
            return ResolvedReference::Unresolved;
        }

        keyword_match(&normalized_phrase, &tokens, candidates)
    }
}

enum OrdinalPosition {
    FromStart(usize),
    Last,
}

/// Words that introduce a numeric reference ("el 2", "número 3", "# 1").
const ORDINAL_LEAD_INS: &[&str] =
    &["el", "la", "los", "las", "un", "una", "numero", "producto", "opcion", "del", "#"];

fn numeric_ordinal(tokens: &[String]) -> Option<usize> {
    for (index, token) in tokens.iter().enumerate() {
        let Ok(number) = token.parse::<i64>() else {
            continue;
        };
        let has_lead_in =
            index > 0 && ORDINAL_LEAD_INS.contains(&tokens[index - 1].as_str());
        let standalone = tokens.len() == 1;
        if !(has_lead_in || standalone) {
            continue;
        }
        if number < 1 {
            return None;
        }
        return Some((number - 1) as usize);
    }
    None
}

fn textual_ordinal(tokens: &[String]) -> Option<OrdinalPosition> {
    for token in tokens {
        let position = match token.as_str() {
            "primero" | "primer" | "primera" => OrdinalPosition::FromStart(0),
            "segundo" | "segunda" => OrdinalPosition::FromStart(1),
            "tercero" | "tercer" | "tercera" => OrdinalPosition::FromStart(2),
            "cuarto" | "cuarta" => OrdinalPosition::FromStart(3),
            "quinto" | "quinta" => OrdinalPosition::FromStart(4),
            "ultimo" | "ultima" => OrdinalPosition::Last,
            _ => continue,
        };
        return Some(position);
    }
    None
}

fn keyword_match(
    normalized_phrase: &str,
    tokens: &[String],
    candidates: &[ItemSnapshot],
) -> ResolvedReference {
    if let Some(item) = candidates
        .iter()
        .rev()
        .find(|item| normalize_text(&item.id.0) == normalized_phrase)
    {
        return ResolvedReference::Item(item.id.clone());
    }

    if let Some(item) = candidates
        .iter()
        .rev()
        .find(|item| normalize_text(&item.name).contains(normalized_phrase))
    {
        return ResolvedReference::Item(item.id.clone());
    }

    let mut best: Option<(&ItemSnapshot, u32)> = None;
    for item in candidates {
        let score = overlap_score(tokens, item);
        if score == 0 {
            continue;
        }
        // `>=` keeps the later (more recently shown) candidate on ties.
        match best {
            Some((_, best_score)) if score < best_score => {}
            _ => best = Some((item, score)),
        }
    }

    match best {
        Some((item, _)) => ResolvedReference::Item(item.id.clone()),
        None => ResolvedReference::Unresolved,
    }
}

fn overlap_score(tokens: &[String], item: &ItemSnapshot) -> u32 {
    let name = normalize_text(&item.name);
    let brand = normalize_text(&item.brand);
    let name_tokens = tokenize(&name);
    let brand_tokens = tokenize(&brand);

    let mut score = 0;
    for token in tokens {
        if name_tokens.iter().any(|word| word == token) {
            score += 2;
        }
        if brand_tokens.iter().any(|word| word == token) {
            score += 1;
        }
    }
    score
}

fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|character| match character.to_lowercase().next().unwrap_or(character) {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            lowered => lowered,
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() {
            sanitized.push(character);
        } else if character == '#' {
            // Keep "#" as its own token so "#2" reads as a lead-in + digits.
            sanitized.push(' ');
            sanitized.push('#');
            sanitized.push(' ');
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::item::{ItemId, ItemSnapshot};

    use super::{ReferenceResolver, ResolvedReference};

    fn item(id: &str, name: &str, brand: &str) -> ItemSnapshot {
        ItemSnapshot {
            id: ItemId(id.to_string()),
            name: name.to_string(),
            brand: brand.to_string(),
            unit_price: Decimal::new(999, 2),
            category: "herramientas".to_string(),
        }
    }

    fn window() -> Vec<ItemSnapshot> {
        vec![
            item("SKU1", "Martillo de carpintero", "Bellota"),
            item("SKU2", "Taladro percutor 750W", "Bosch"),
            item("SKU3", "Destornillador plano", "Stanley"),
        ]
    }

    #[test]
    fn numeric_ordinals_hit_display_positions() {
        let resolver = ReferenceResolver::new();
        let items = window();
        for (phrase, expected) in
            [("el 1", "SKU1"), ("número 2", "SKU2"), ("producto 3", "SKU3"), ("#2", "SKU2"), ("2", "SKU2")]
        {
            assert_eq!(
                resolver.resolve(phrase, &items),
                ResolvedReference::Item(ItemId(expected.to_string())),
                "phrase: {phrase}"
            );
        }
    }

    #[test]
    fn out_of_range_ordinals_are_unresolved() {
        let resolver = ReferenceResolver::new();
        let items = window();
        assert_eq!(resolver.resolve("el 0", &items), ResolvedReference::Unresolved);
        assert_eq!(resolver.resolve("el 4", &items), ResolvedReference::Unresolved);
        assert_eq!(resolver.resolve("número 99", &items), ResolvedReference::Unresolved);
    }

    #[test]
    fn textual_ordinals_resolve_including_last() {
        let resolver = ReferenceResolver::new();
        let items = window();
        assert_eq!(
            resolver.resolve("el primero", &items),
            ResolvedReference::Item(ItemId("SKU1".to_string()))
        );
        assert_eq!(
            resolver.resolve("quiero el segundo", &items),
            ResolvedReference::Item(ItemId("SKU2".to_string()))
        );
        assert_eq!(
            resolver.resolve("el último", &items),
            ResolvedReference::Item(ItemId("SKU3".to_string()))
        );
    }

    #[test]
    fn textual_ordinal_past_the_window_is_unresolved() {
        let resolver = ReferenceResolver::new();
        let items = vec![item("SKU1", "Martillo", "Bellota")];
        assert_eq!(resolver.resolve("el cuarto", &items), ResolvedReference::Unresolved);
    }

    #[test]
    fn exact_id_beats_keyword_scoring() {
        let resolver = ReferenceResolver::new();
        let items = window();
        assert_eq!(
            resolver.resolve("sku2", &items),
            ResolvedReference::Item(ItemId("SKU2".to_string()))
        );
    }

    #[test]
    fn phrase_contained_in_name_resolves() {
        let resolver = ReferenceResolver::new();
        let items = window();
        assert_eq!(
            resolver.resolve("taladro percutor", &items),
            ResolvedReference::Item(ItemId("SKU2".to_string()))
        );
    }

    #[test]
    fn token_overlap_prefers_name_hits_over_brand_hits() {
        let resolver = ReferenceResolver::new();
        let items = vec![
            item("SKU1", "Martillo de carpintero", "Bellota"),
            item("SKU2", "Alicates universales", "Martillo"),
        ];
        // "martillo" scores 2 on SKU1's name and only 1 on SKU2's brand.
        assert_eq!(
            resolver.resolve("ese martillo", &items),
            ResolvedReference::Item(ItemId("SKU1".to_string()))
        );
    }

    #[test]
    fn score_ties_prefer_the_most_recently_shown() {
        let resolver = ReferenceResolver::new();
        let items = vec![
            item("SKU1", "Martillo de bola", "Bellota"),
            item("SKU2", "Martillo de uña", "Stanley"),
        ];
        assert_eq!(
            resolver.resolve("martillo", &items),
            ResolvedReference::Item(ItemId("SKU2".to_string()))
        );
    }

    #[test]
    fn zero_overlap_is_unresolved() {
        let resolver = ReferenceResolver::new();
        assert_eq!(resolver.resolve("una sierra circular", &window()), ResolvedReference::Unresolved);
    }

    #[test]
    fn empty_window_short_circuits() {
        let resolver = ReferenceResolver::new();
        assert_eq!(resolver.resolve("el 1", &[]), ResolvedReference::Unresolved);
        assert_eq!(resolver.resolve("martillo", &[]), ResolvedReference::Unresolved);
    }

    #[test]
    fn accented_phrases_match_unaccented_names() {
        let resolver = ReferenceResolver::new();
        let items = vec![item("SKU1", "Destornillador de estrella", "Stanley")];
        assert_eq!(
            resolver.resolve("el destornillador", &items),
            ResolvedReference::Item(ItemId("SKU1".to_string()))
        );
    }
}
