//! In-memory holder for plaintext credentials.
//! A `Secret` only lives for the duration of a hash or verify call, so its
//! buffer is wiped on drop and it never prints its contents.

use std::fmt;

use zeroize::Zeroize;

/// Plaintext secret supplied by a caller at authentication time.
pub struct Secret {
    inner: String,
}

impl Secret {
    pub fn new(plaintext: impl Into<String>) -> Self {
        Self {
            inner: plaintext.into(),
        }
    }

    /// Borrows the plaintext. Keep the borrow as short as the call that needs it.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Secret {
    fn as_ref(&self) -> &str {
        self.expose()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
