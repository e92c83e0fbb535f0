use std::collections::HashMap;

/// 原始媒体 URL → 新存储 URL 的映射
pub type UrlMap = HashMap<String, String>;

/// 阅读速度（词/分钟）
const WORDS_PER_MINUTE: usize = 200;

/// 摘要的最大字符数（含省略号）
const EXCERPT_MAX_CHARS: usize = 160;

/// 将正文中出现的每个原始 URL 原样替换为新 URL。
///
/// 纯字符串替换，不解析 HTML。较长的 URL 先替换，避免某个 URL
/// 作为另一个 URL 的前缀时被截断替换。
pub fn rewrite_urls(html: &str, map: &UrlMap) -> String {
    let mut pairs: Vec<_> = map
        .iter()
        .filter(|(original, new)| !original.is_empty() && original != new)
        .collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    pairs
        .into_iter()
        .fold(html.to_string(), |content, (original, new)| {
            content.replace(original.as_str(), new)
        })
}

/// 去除 HTML 标签，解码常见实体并合并空白
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // 仅 `<` 后紧跟字母、`/` 或 `!` 时视为标签开始
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!')) =>
            {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 计算阅读时间（分钟）
///
/// 优先使用显式给出的值；否则按每分钟 [`WORDS_PER_MINUTE`] 词向上取整，最少 1 分钟。
pub fn reading_time(explicit: Option<f64>, html: &str) -> i32 {
    if let Some(minutes) = explicit.filter(|m| m.is_finite() && *m > 0.0) {
        return minutes.ceil() as i32;
    }

    let words = strip_html(html).split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// 生成摘要
///
/// 依次使用 `meta_description`、显式摘要，最后从正文中截取：
/// 去除标签后超过 [`EXCERPT_MAX_CHARS`] 个字符时截断并追加 `…`。
pub fn excerpt(meta_description: Option<&str>, explicit: Option<&str>, html: &str) -> String {
    if let Some(s) = meta_description
        .into_iter()
        .chain(explicit)
        .map(str::trim)
        .find(|s| !s.is_empty())
    {
        return s.to_string();
    }

    truncate(&strip_html(html), EXCERPT_MAX_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let prefix: String = text.chars().take(max_chars - 1).collect();
    format!("{}…", prefix.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_urls() {
        let html = r#"<img src="https://cdn.example.com/a.png"><img src="https://cdn.example.com/b.png"><a href="https://cdn.example.com/a.png">a</a>"#;
        let map = UrlMap::from([(
            "https://cdn.example.com/a.png".to_string(),
            "https://storage.example.com/content/post/0.png".to_string(),
        )]);

        let rewritten = rewrite_urls(html, &map);
        assert_eq!(
            rewritten.matches("https://storage.example.com/content/post/0.png").count(),
            2
        );
        assert!(rewritten.contains("https://cdn.example.com/b.png"));
        assert!(!rewritten.contains("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_rewrite_urls_prefix_overlap() {
        let html = "https://x.com/img.png https://x.com/img.png?w=2";
        let map = UrlMap::from([
            ("https://x.com/img.png".to_string(), "A".to_string()),
            ("https://x.com/img.png?w=2".to_string(), "B".to_string()),
        ]);
        assert_eq!(rewrite_urls(html, &map), "A B");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p>\n<p>a &amp; b&nbsp;c</p>"),
            "Hello world a & b c"
        );
        assert_eq!(strip_html("<p>one</p><p>two</p>"), "one two");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_strip_html_bare_angle_brackets() {
        assert_eq!(strip_html("a < b and c > d"), "a < b and c > d");
        assert_eq!(strip_html("<p>1 <2</p>"), "1 <2");
        assert_eq!(strip_html("x<!-- note -->y</p>"), "x y");
        assert_eq!(reading_time(None, &"a < b ".repeat(300)), 5);
    }

    #[test]
    fn test_reading_time_from_words() {
        let html = format!("<p>{}</p>", vec!["word"; 1000].join(" "));
        assert_eq!(reading_time(None, &html), 5);

        let html = format!("<p>{}</p>", vec!["word"; 1001].join(" "));
        assert_eq!(reading_time(None, &html), 6);

        assert_eq!(reading_time(None, "<p>Hi</p>"), 1);
        assert_eq!(reading_time(None, ""), 1);
    }

    #[test]
    fn test_reading_time_explicit() {
        assert_eq!(reading_time(Some(7.0), "<p>Hi</p>"), 7);
        assert_eq!(reading_time(Some(2.5), "<p>Hi</p>"), 3);
        assert_eq!(reading_time(Some(0.0), "<p>Hi</p>"), 1);
    }

    #[test]
    fn test_excerpt_truncated() {
        let body = "lorem ipsum dolor sit amet ".repeat(20);
        let html = format!("<p>{body}</p>");
        let excerpt = excerpt(None, None, &html);
        let stripped = strip_html(&html);

        assert!(excerpt.chars().count() <= 160);
        assert!(excerpt.ends_with('…'));
        assert!(stripped.starts_with(excerpt.trim_end_matches('…')));
    }

    #[test]
    fn test_excerpt_exact_length() {
        let text = "a".repeat(200);
        let excerpt = excerpt(None, None, &text);
        assert_eq!(excerpt.chars().count(), 160);
        assert_eq!(excerpt, format!("{}…", "a".repeat(159)));
    }

    #[test]
    fn test_excerpt_short_and_explicit() {
        assert_eq!(excerpt(None, None, "<p>Short</p>"), "Short");
        assert_eq!(excerpt(Some("Meta"), Some("Ex"), "<p>Body</p>"), "Meta");
        assert_eq!(excerpt(Some("  "), Some("Ex"), "<p>Body</p>"), "Ex");
    }

    #[test]
    fn test_excerpt_multibyte() {
        let text = "文".repeat(300);
        let excerpt = excerpt(None, None, &text);
        assert_eq!(excerpt.chars().count(), 160);
    }
}
