use serde::Serialize;

const LUA_KEYWORDS: &[&str] = &["lua", "луа"];
const JAVASCRIPT_KEYWORDS: &[&str] = &["javascript", "js"];
const PYTHON_KEYWORDS: &[&str] = &["python", "питон"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Lua,
    JavaScript,
    Python,
    Arithmetic,
    Unrecognized,
}

/// Checked top to bottom; the first hit wins.
const PRIORITY: [Category; 4] = [
    Category::Lua,
    Category::JavaScript,
    Category::Python,
    Category::Arithmetic,
];

impl Category {
    fn matches(self, normalized: &str) -> bool {
        match self {
            Category::Lua => contains_any(normalized, LUA_KEYWORDS),
            Category::JavaScript => contains_any(normalized, JAVASCRIPT_KEYWORDS),
            Category::Python => contains_any(normalized, PYTHON_KEYWORDS),
            Category::Arithmetic => has_arithmetic_shape(normalized),
            Category::Unrecognized => true,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Digit run, operator, digit run, with nothing in between. May sit anywhere in the text.
pub fn has_arithmetic_shape(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(3).any(|w| {
        w[0].is_ascii_digit() && matches!(w[1], '+' | '-' | '*' | '/') && w[2].is_ascii_digit()
    })
}

pub fn classify(input: &str) -> Category {
    let normalized = input.to_lowercase();
    PRIORITY.into_iter()
        .find(|category| category.matches(&normalized))
        .unwrap_or(Category::Unrecognized)
}
