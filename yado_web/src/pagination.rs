pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

/// ページ指定（1始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: usize,
    per_page: usize,
}

impl Page {
    pub fn new(page: Option<usize>, per_page: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> usize {
        self.per_page
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// 検索フィルタに埋め込む文字列のクオート
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_page_offset() {
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page::new(Some(0), Some(1000));
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), MAX_PER_PAGE);

        let page = Page::new(Some(1), Some(0));
        assert_eq!(page.limit(), 1);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("箱根"), "\"箱根\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
    }
}
