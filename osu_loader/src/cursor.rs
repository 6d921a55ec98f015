#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number in the source buffer.
    pub number: usize,
    pub text: &'a str,
}

/// Yields trimmed, non-empty, non-comment lines of a chart buffer.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    src: &'a str,
    pos: usize,
    line_no: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(src: &'a str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self {
            src,
            pos: 0,
            line_no: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.line_no = 0;
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        if self.is_at_end() {
            return None;
        }
        let rest = &self.src[self.pos..];
        let (raw, consumed) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        self.line_no += 1;
        Some(raw)
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(raw) = self.next_raw() {
            let text = raw.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
            if text.is_empty() || text.starts_with("//") {
                continue;
            }
            return Some(Line {
                number: self.line_no,
                text,
            });
        }
        None
    }
}
