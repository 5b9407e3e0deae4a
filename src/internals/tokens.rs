//! Cheap token estimation for batch sizing.
//!
//! Batch limits are soft bounds, so an exact tokenizer buys nothing here.
//! The estimate leans conservative for CJK-heavy chat text, where one
//! character is usually one token or less.

/// Estimate the token cost of a rendered line.
///
/// `max(1, ceil(chars / 3))`. Every message costs at least one token so
/// empty renders still advance the batch budget.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    std::cmp::max(1, chars.div_ceil(3))
}

/// Estimate the total token cost of several rendered lines.
pub fn estimate_total<'a, I>(lines: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().map(estimate_tokens).sum()
}
