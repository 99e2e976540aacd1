//! Person name (PN) component model.
//!
//! A person name value has up to three component groups
//! (alphabetic, ideographic, phonetic) separated by `=`,
//! each with up to five components
//! (family, given, middle, prefix, suffix) separated by `^`.

use std::fmt;

/// A single component group of a person name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct NameComponents {
    pub family: String,
    pub given: String,
    pub middle: String,
    pub prefix: String,
    pub suffix: String,
}

impl NameComponents {
    /// Parse one component group from its `^`-separated form.
    /// Trailing empty components are dropped on formatting.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(5, '^');
        NameComponents {
            family: parts.next().unwrap_or_default().to_string(),
            given: parts.next().unwrap_or_default().to_string(),
            middle: parts.next().unwrap_or_default().to_string(),
            prefix: parts.next().unwrap_or_default().to_string(),
            suffix: parts.next().unwrap_or_default().to_string(),
        }
    }

    /// Whether every component is empty.
    pub fn is_empty(&self) -> bool {
        self.family.is_empty()
            && self.given.is_empty()
            && self.middle.is_empty()
            && self.prefix.is_empty()
            && self.suffix.is_empty()
    }
}

impl fmt::Display for NameComponents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts = [
            &self.family,
            &self.given,
            &self.middle,
            &self.prefix,
            &self.suffix,
        ];
        let last = parts.iter().rposition(|p| !p.is_empty());
        match last {
            None => Ok(()),
            Some(last) => {
                for (i, part) in parts[..=last].iter().enumerate() {
                    if i > 0 {
                        f.write_str("^")?;
                    }
                    f.write_str(part)?;
                }
                Ok(())
            }
        }
    }
}

/// A full person name with its three component groups.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct PersonName {
    pub alphabetic: NameComponents,
    pub ideographic: Option<NameComponents>,
    pub phonetic: Option<NameComponents>,
}

impl PersonName {
    /// Parse a person name from its wire form.
    pub fn parse(text: &str) -> Self {
        let text = text.trim_end_matches([' ', '\0']);
        let mut groups = text.splitn(3, '=');
        let alphabetic = NameComponents::parse(groups.next().unwrap_or_default());
        let ideographic = groups.next().map(NameComponents::parse);
        let phonetic = groups.next().map(NameComponents::parse);
        PersonName {
            alphabetic,
            ideographic,
            phonetic,
        }
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alphabetic)?;
        match (&self.ideographic, &self.phonetic) {
            (None, None) => Ok(()),
            (Some(i), None) => write!(f, "={}", i),
            (i, Some(p)) => {
                write!(f, "={}", i.clone().unwrap_or_default())?;
                write!(f, "={}", p)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name() {
        let name = PersonName::parse("Doe^John");
        assert_eq!(name.alphabetic.family, "Doe");
        assert_eq!(name.alphabetic.given, "John");
        assert!(name.ideographic.is_none());
        assert_eq!(name.to_string(), "Doe^John");
    }

    #[test]
    fn five_components() {
        let name = PersonName::parse("Adams^John Robert Quincy^^Rev.^B.A. M.Div.");
        assert_eq!(name.alphabetic.family, "Adams");
        assert_eq!(name.alphabetic.given, "John Robert Quincy");
        assert_eq!(name.alphabetic.prefix, "Rev.");
        assert_eq!(name.alphabetic.suffix, "B.A. M.Div.");
        assert_eq!(name.to_string(), "Adams^John Robert Quincy^^Rev.^B.A. M.Div.");
    }

    #[test]
    fn three_groups() {
        let name = PersonName::parse("Yamada^Tarou=山田^太郎=やまだ^たろう");
        assert_eq!(name.alphabetic.family, "Yamada");
        assert_eq!(name.ideographic.as_ref().unwrap().family, "山田");
        assert_eq!(name.phonetic.as_ref().unwrap().given, "たろう");
        assert_eq!(name.to_string(), "Yamada^Tarou=山田^太郎=やまだ^たろう");
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let name = PersonName::parse("Doe^Jane ");
        assert_eq!(name.alphabetic.given, "Jane");
    }
}
