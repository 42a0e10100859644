use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
};

use ref_cast::RefCast;

/// ASCII-case-insensitive key. FoxPro names (macros, builtins, keywords, base classes) are
/// compared this way everywhere.
#[derive(Clone, Copy, RefCast)]
#[repr(transparent)]
pub struct CaseInsensitive<S: ?Sized>(S);

impl<S> CaseInsensitive<S> {
    pub fn new(inner: S) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> S {
        self.0
    }
}

impl CaseInsensitive<str> {
    pub fn new_ref(s: &str) -> &Self {
        CaseInsensitive::ref_cast(s)
    }
}

impl<S> fmt::Debug for CaseInsensitive<S>
where
    S: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<S> fmt::Display for CaseInsensitive<S>
where
    S: ?Sized + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S> PartialEq for CaseInsensitive<S>
where
    S: ?Sized + AsRef<str>,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().eq_ignore_ascii_case(other.0.as_ref())
    }
}

impl<S> Eq for CaseInsensitive<S> where S: ?Sized + AsRef<str> {}

impl<S> Hash for CaseInsensitive<S>
where
    S: ?Sized + AsRef<str>,
{
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        for c in self.0.as_ref().chars() {
            c.to_ascii_lowercase().hash(state);
        }
        // Matches the terminator `str` hashes with, so `("ab", "c")` and `("a", "bc")` differ.
        0xffu8.hash(state);
    }
}

impl Borrow<CaseInsensitive<str>> for CaseInsensitive<String> {
    fn borrow(&self) -> &CaseInsensitive<str> {
        CaseInsensitive::ref_cast(&self.0)
    }
}

impl AsRef<str> for CaseInsensitive<String> {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl AsRef<str> for CaseInsensitive<str> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<T> Deref for CaseInsensitive<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::CaseInsensitive;

    #[test]
    fn lookups_ignore_ascii_case() {
        let mut map = HashMap::new();
        map.insert(CaseInsensitive::new(String::from("MaxRows")), 10);
        assert_eq!(map.get(CaseInsensitive::new_ref("MAXROWS")), Some(&10));
        assert_eq!(map.get(CaseInsensitive::new_ref("maxrows")), Some(&10));
        assert_eq!(map.get(CaseInsensitive::new_ref("maxrow")), None);
    }
}
