//! Static allow-list of admin email addresses.
//!
//! Entries are normalised (trimmed, lower-cased) once at construction; lookups
//! are case-insensitive. The list is fixed for the lifetime of the process and
//! is handed to the services that need it rather than read from the
//! environment at call time.

use std::collections::BTreeSet;

/// Set of email addresses permitted to act as competition admins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    /// Build an allow-list from any iterator of addresses. Blank entries are
    /// dropped.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// Parse the comma-separated form used by `CUBETIME_ADMIN_EMAILS`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Case-insensitive membership check.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }

    /// The configured addresses, sorted.
    pub fn emails(&self) -> Vec<String> {
        self.emails.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
