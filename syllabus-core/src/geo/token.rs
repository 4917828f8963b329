/// A trimmed geo identifier, classified once before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoToken {
    /// All digits: a primary key or numeric ISO code.
    Numeric { value: i64, text: String },
    /// Short code such as `IN`, `IND` or `IN-KA`. `code` is uppercased.
    Code { code: String, text: String },
    /// Anything else, matched against names.
    Name(String),
}

const CODE_MAX: usize = 10;

impl GeoToken {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        if text.chars().all(|c| c.is_ascii_digit())
            && let Ok(value) = text.parse::<i64>()
        {
            return Some(GeoToken::Numeric {
                value,
                text: text.to_string(),
            });
        }

        let code_shaped = text.chars().count() <= CODE_MAX
            && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && text.chars().any(|c| c.is_ascii_alphabetic());
        if code_shaped {
            return Some(GeoToken::Code {
                code: text.to_ascii_uppercase(),
                text: text.to_string(),
            });
        }

        Some(GeoToken::Name(text.to_string()))
    }

    /// The token as the caller wrote it, trimmed.
    pub fn text(&self) -> &str {
        match self {
            GeoToken::Numeric { text, .. } | GeoToken::Code { text, .. } => text,
            GeoToken::Name(text) => text,
        }
    }
}
