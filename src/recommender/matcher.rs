/// Decides whether an observed item name satisfies a wishlist name.
pub trait ItemMatcher {
    fn matches(&self, wanted: &str, observed: &str) -> bool;
}

/// Case-insensitive substring containment. No token boundaries, no
/// accent or punctuation folding: "leite" also matches "Doce de Leite".
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl ItemMatcher for SubstringMatcher {
    fn matches(&self, wanted: &str, observed: &str) -> bool {
        observed.to_lowercase().contains(&wanted.to_lowercase())
    }
}

impl<F> ItemMatcher for F
where
    F: Fn(&str, &str) -> bool,
{
    fn matches(&self, wanted: &str, observed: &str) -> bool {
        self(wanted, observed)
    }
}
