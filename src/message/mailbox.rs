use std::{
    fmt::{Display, Formatter, Result as FmtResult, Write},
    str::FromStr,
};

use crate::address::{Address, AddressError};

/// Represents an email address with an optional name for the sender/recipient.
///
/// This type contains email address and the sender/recipient name
/// (_Some Name \<user@domain.tld\>_ or _withoutname@domain.tld_).
///
/// # Examples
///
/// You can create a `Mailbox` from a string and an [`Address`]:
///
/// ```
/// # use mxpost::{Address, message::Mailbox};
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let address = Address::new("example", "email.com")?;
/// let mailbox = Mailbox::new(None, address);
/// # Ok(())
/// # }
/// ```
///
/// You can also create one from a string literal:
///
/// ```
/// # use mxpost::message::Mailbox;
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mailbox: Mailbox = "John Smith <example@email.com>".parse()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Mailbox {
    /// The name associated with the address.
    pub name: Option<String>,

    /// The email address itself.
    pub email: Address,
}

impl Mailbox {
    /// Creates a new `Mailbox` using an email address and the name of the
    /// recipient if there is one.
    pub fn new(name: Option<String>, email: Address) -> Self {
        Mailbox { name, email }
    }

    /// Encode addressee name using function
    pub(crate) fn recode_name<F>(&self, f: F) -> Self
    where
        F: FnOnce(&str) -> String,
    {
        Mailbox::new(self.name.clone().map(|s| f(&s)), self.email.clone())
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(ref name) = self.name {
            let name = name.trim();
            if !name.is_empty() {
                f.write_str(name)?;
                f.write_str(" <")?;
                self.email.fmt(f)?;
                return f.write_char('>');
            }
        }
        self.email.fmt(f)
    }
}

impl<S: Into<String>, T: Into<String>> TryFrom<(S, T)> for Mailbox {
    type Error = AddressError;

    fn try_from(header: (S, T)) -> Result<Self, Self::Error> {
        let (name, address) = header;
        Ok(Mailbox::new(Some(name.into()), address.into().parse()?))
    }
}

impl From<Address> for Mailbox {
    fn from(email: Address) -> Self {
        Mailbox::new(None, email)
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(src: &str) -> Result<Mailbox, Self::Err> {
        match (src.find('<'), src.find('>')) {
            (Some(addr_open), Some(addr_close)) if addr_open < addr_close => {
                let name = src.split_at(addr_open).0;
                let addr_open = addr_open + 1;
                let addr = src.split_at(addr_open).1.split_at(addr_close - addr_open).0;
                let addr = addr.parse()?;
                let name = name.trim();
                let name = if name.is_empty() {
                    None
                } else {
                    Some(name.into())
                };
                Ok(Mailbox::new(name, addr))
            }
            (Some(_), _) => Err(AddressError::Unbalanced),
            _ => {
                let addr = src.parse()?;
                Ok(Mailbox::new(None, addr))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::Mailbox;

    #[test]
    fn parse_without_name() {
        let mbox: Mailbox = "kayo@example.com".parse().unwrap();
        assert_eq!(mbox.name, None);
        assert_eq!(mbox.email.to_string(), "kayo@example.com");
    }

    #[test]
    fn parse_with_name() {
        let mbox: Mailbox = "K. <kayo@example.com>".parse().unwrap();
        assert_eq!(mbox.name.as_deref(), Some("K."));
        assert_eq!(mbox.email.to_string(), "kayo@example.com");
    }

    #[test]
    fn parse_unbalanced() {
        assert!("K. <kayo@example.com".parse::<Mailbox>().is_err());
    }

    #[test]
    fn display_roundtrip() {
        let mbox: Mailbox = "John Smith <example@email.com>".parse().unwrap();
        assert_eq!(mbox.to_string(), "John Smith <example@email.com>");
        let bare: Mailbox = "example@email.com".parse().unwrap();
        assert_eq!(bare.to_string(), "example@email.com");
    }
}
