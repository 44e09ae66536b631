// src/utils/html.rs

/// Strips dangerous markup from user-entered text.
///
/// Whitelist based: formatting tags such as <b> and <p> survive, while
/// <script>, <iframe> and event-handler attributes are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Same as [`clean_html`] for optional fields.
pub fn clean_opt(input: &mut Option<String>) {
    if let Some(text) = input.as_mut() {
        *text = clean_html(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_script_keeps_formatting() {
        let cleaned = clean_html("<b>Ownership</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>Ownership</b>");
    }

    #[test]
    fn optional_text_is_cleaned_in_place() {
        let mut remark = Some("<img src=x onerror=alert(1)>".to_string());
        clean_opt(&mut remark);
        assert!(!remark.unwrap().contains("onerror"));

        let mut empty: Option<String> = None;
        clean_opt(&mut empty);
        assert!(empty.is_none());
    }
}
