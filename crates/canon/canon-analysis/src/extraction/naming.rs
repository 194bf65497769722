//! Identifier case classification and conversion.

use crate::patterns::CaseStyle;

/// Classify an identifier's case style.
///
/// Single lowercase words (`user`, `index`) fit several conventions at once
/// and classify as `None`. Leading `_`/`$` and trailing `_` are ignored.
pub fn classify(name: &str) -> Option<CaseStyle> {
    let core = name
        .trim_start_matches(['_', '$'])
        .trim_end_matches('_');
    let first = core.chars().next()?;
    if !first.is_alphabetic() {
        return None;
    }

    let has_upper = core.chars().any(char::is_uppercase);
    let has_lower = core.chars().any(char::is_lowercase);

    if core.contains('-') {
        let valid = core
            .chars()
            .all(|c| c.is_lowercase() || c.is_ascii_digit() || c == '-');
        return (valid && !core.contains("--")).then_some(CaseStyle::Kebab);
    }

    if core.contains('_') {
        return match (has_upper, has_lower) {
            (true, false) => Some(CaseStyle::ScreamingSnake),
            (false, true) => Some(CaseStyle::Snake),
            _ => None,
        };
    }

    if first.is_lowercase() {
        has_upper.then_some(CaseStyle::Camel)
    } else if has_lower {
        Some(CaseStyle::Pascal)
    } else if core.chars().count() >= 2 {
        Some(CaseStyle::ScreamingSnake)
    } else {
        None
    }
}

/// Split an identifier into lowercase words on separators and case humps.
/// `HTTPServerError` splits as `http`, `server`, `error`.
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '$' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Rewrite an identifier in `style`, keeping leading underscores.
pub fn convert(name: &str, style: CaseStyle) -> String {
    let prefix_len = name.len() - name.trim_start_matches('_').len();
    let prefix = &name[..prefix_len];
    let words = split_words(&name[prefix_len..]);
    if words.is_empty() {
        return name.to_string();
    }

    let body = match style {
        CaseStyle::Camel => {
            let mut out = words[0].clone();
            for word in &words[1..] {
                out.push_str(&capitalize(word));
            }
            out
        }
        CaseStyle::Pascal => words.iter().map(|w| capitalize(w)).collect(),
        CaseStyle::Snake => words.join("_"),
        CaseStyle::ScreamingSnake => words.join("_").to_uppercase(),
        CaseStyle::Kebab => words.join("-"),
    };
    format!("{prefix}{body}")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_styles() {
        assert_eq!(classify("userId"), Some(CaseStyle::Camel));
        assert_eq!(classify("UserService"), Some(CaseStyle::Pascal));
        assert_eq!(classify("user_id"), Some(CaseStyle::Snake));
        assert_eq!(classify("MAX_RETRIES"), Some(CaseStyle::ScreamingSnake));
        assert_eq!(classify("user-profile"), Some(CaseStyle::Kebab));
        assert_eq!(classify("_privateValue"), Some(CaseStyle::Camel));
    }

    #[test]
    fn ambiguous_names_do_not_classify() {
        assert_eq!(classify("user"), None);
        assert_eq!(classify("x"), None);
        assert_eq!(classify("_"), None);
        assert_eq!(classify("User_id"), None);
        assert_eq!(classify("9lives"), None);
    }

    #[test]
    fn splits_acronyms_and_humps() {
        assert_eq!(split_words("HTTPServerError"), vec!["http", "server", "error"]);
        assert_eq!(split_words("user_id"), vec!["user", "id"]);
        assert_eq!(split_words("parseJSON2Value"), vec!["parse", "json2", "value"]);
    }

    #[test]
    fn converts_between_styles() {
        assert_eq!(convert("user_id", CaseStyle::Camel), "userId");
        assert_eq!(convert("userId", CaseStyle::Snake), "user_id");
        assert_eq!(convert("user-profile", CaseStyle::Pascal), "UserProfile");
        assert_eq!(convert("maxRetries", CaseStyle::ScreamingSnake), "MAX_RETRIES");
        assert_eq!(convert("_cacheKey", CaseStyle::Snake), "_cache_key");
    }
}
