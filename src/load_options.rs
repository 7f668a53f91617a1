use std::fmt;

/// How an opened document may be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Objects are read lazily; the original bytes are kept for incremental saves.
    #[default]
    Modify,
    /// Like `Modify`, but every save fails with [`Error::ReadOnly`](crate::Error::ReadOnly).
    ReadOnly,
    /// Every object is read at open and the original bytes are released.
    Import,
}

/// How damaged cross-reference data is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accuracy {
    /// A broken trailer chain or an xref offset that does not point at the
    /// matching object header fails the open.
    #[default]
    Strict,
    /// Broken data is tolerated; objects are located by scanning the file
    /// when the cross-reference data does not lead to them.
    Lazy,
}

pub type PasswordCallback = Box<dyn Fn() -> Option<String>>;

/// Options for opening PDF documents
#[derive(Default)]
pub struct LoadOptions {
    pub mode: OpenMode,
    pub accuracy: Accuracy,
    pub password: Option<String>,
    /// Asked for a password when neither the given nor the empty password opens the file.
    pub password_callback: Option<PasswordCallback>,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("mode", &self.mode)
            .field("accuracy", &self.accuracy)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("password_callback", &self.password_callback.is_some())
            .finish()
    }
}

impl LoadOptions {
    pub fn builder() -> LoadOptionsBuilder {
        LoadOptionsBuilder::default()
    }

    /// Candidate passwords in the order they are tried.
    pub(crate) fn passwords(&self) -> impl Iterator<Item = String> + '_ {
        self.password
            .clone()
            .into_iter()
            .chain(std::iter::once(String::new()))
            .chain(std::iter::from_fn(move || self.password_callback.as_ref().and_then(|ask| ask())).take(1))
    }
}

#[derive(Debug, Default)]
pub struct LoadOptionsBuilder {
    options: LoadOptions,
}

impl LoadOptionsBuilder {
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn accuracy(mut self, accuracy: Accuracy) -> Self {
        self.options.accuracy = accuracy;
        self
    }

    pub fn password<P: Into<String>>(mut self, password: P) -> Self {
        self.options.password = Some(password.into());
        self
    }

    pub fn password_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() -> Option<String> + 'static,
    {
        self.options.password_callback = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> LoadOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_tried_in_order() {
        let options = LoadOptions::builder()
            .password("given")
            .password_callback(|| Some("asked".to_string()))
            .build();
        let passwords: Vec<String> = options.passwords().collect();
        assert_eq!(passwords, vec!["given", "", "asked"]);

        let options = LoadOptions::default();
        assert_eq!(options.passwords().collect::<Vec<_>>(), vec![String::new()]);
    }

    #[test]
    fn debug_hides_password() {
        let options = LoadOptions::builder().password("hunter2").build();
        assert!(!format!("{:?}", options).contains("hunter2"));
    }
}
