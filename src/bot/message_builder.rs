use std::fmt::{Display, Write};

/// Markdown link, rendered as `[text](href)`.
pub struct Link<'a> {
    pub text: &'a str,
    pub href: &'a str,
}

impl Display for Link<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]({})", self.text, self.href)
    }
}

/// Builds the markdown body of a chat bot message.
#[derive(Default)]
pub struct MessageBuilder {
    pub(crate) text: String,
    main_link: Option<(String, String)>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn build(mut self) -> String {
        // Append the main link, unless the body already points there
        if let Some((label, href)) = self.main_link.take() {
            if !self.text.contains(&href) {
                write!(self, "\n{}", Link { text: &label, href: &href }).unwrap();
            }
        }

        self.text
    }

    pub fn heading(&mut self, heading: impl Display) {
        write!(self, "## {}\n\n", heading).unwrap();
    }

    /// A `**label**: value` paragraph.
    pub fn field(&mut self, label: impl Display, value: impl Display) {
        write!(self, "**{}**: {}\n\n", label, value).unwrap();
    }

    pub fn list_item(&mut self, item: impl Display) {
        writeln!(self, "- {}", item).unwrap();
    }

    /// Set the link appended at the end of the message
    pub fn main_link(&mut self, label: &str, href: &str) {
        self.main_link = Some((label.to_owned(), href.to_owned()));
    }
}

impl std::fmt::Write for MessageBuilder {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}
