//! Request-scoped data carried through the report pipeline.
//!
//! [`ContentBlock`] is what the extractor produces and the content renderer consumes,
//! [`ImageReference`] is one resolved gallery image URL and [`ContactInfo`] holds the
//! agent details printed in the footer.

use std::fmt;

/// One typed unit of listing content, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Section title.
    Heading { text: String },
    /// A single bullet-point fact.
    BulletLine { text: String },
    /// A bold label followed by its value, e.g. `Price: 250,000`.
    LabeledLine { label: String, value: String },
    /// Free-form prose.
    Paragraph { text: String },
    /// Vertical space in points. Carries no content.
    SpacingHint { size: f32 },
}

impl ContentBlock {
    pub fn heading(text: impl Into<String>) -> Self {
        ContentBlock::Heading { text: text.into() }
    }

    pub fn bullet(text: impl Into<String>) -> Self {
        ContentBlock::BulletLine { text: text.into() }
    }

    pub fn labeled(label: impl Into<String>, value: impl Into<String>) -> Self {
        ContentBlock::LabeledLine {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph { text: text.into() }
    }

    pub fn spacing(size: f32) -> Self {
        ContentBlock::SpacingHint { size }
    }

    /// Returns true for blocks that only affect layout.
    pub fn is_spacing(&self) -> bool {
        matches!(self, ContentBlock::SpacingHint { .. })
    }

    /// Builds a new block of the same kind with every text field passed through `f`.
    pub fn map_text<F>(&self, mut f: F) -> ContentBlock
    where
        F: FnMut(&str) -> String,
    {
        match self {
            ContentBlock::Heading { text } => ContentBlock::Heading { text: f(text) },
            ContentBlock::BulletLine { text } => ContentBlock::BulletLine { text: f(text) },
            ContentBlock::LabeledLine { label, value } => ContentBlock::LabeledLine {
                label: f(label),
                value: f(value),
            },
            ContentBlock::Paragraph { text } => ContentBlock::Paragraph { text: f(text) },
            ContentBlock::SpacingHint { size } => ContentBlock::SpacingHint { size: *size },
        }
    }
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Heading { text } => write!(f, "# {}", text),
            ContentBlock::BulletLine { text } => write!(f, "• {}", text),
            ContentBlock::LabeledLine { label, value } if label.is_empty() => {
                write!(f, "{}", value)
            }
            ContentBlock::LabeledLine { label, value } => write!(f, "{}: {}", label, value),
            ContentBlock::Paragraph { text } => write!(f, "{}", text),
            ContentBlock::SpacingHint { size } => write!(f, "<spacing {}pt>", size),
        }
    }
}

/// Absolute URL of one gallery image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
}

impl ImageReference {
    pub fn new(url: impl Into<String>) -> Self {
        ImageReference { url: url.into() }
    }
}

/// The fixed set of contact keys, in footer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    CompanyName,
    AgentName,
    Address,
    Phone,
    Email,
    MapLink,
    WhatsappLink,
    WebsiteLink,
    TelegramLink,
    InstagramLink,
}

impl ContactField {
    pub const ALL: [ContactField; 10] = [
        ContactField::CompanyName,
        ContactField::AgentName,
        ContactField::Address,
        ContactField::Phone,
        ContactField::Email,
        ContactField::MapLink,
        ContactField::WhatsappLink,
        ContactField::WebsiteLink,
        ContactField::TelegramLink,
        ContactField::InstagramLink,
    ];

    /// Configuration and form key, e.g. `company_name`.
    pub fn key(self) -> &'static str {
        match self {
            ContactField::CompanyName => "company_name",
            ContactField::AgentName => "agent_name",
            ContactField::Address => "address",
            ContactField::Phone => "phone",
            ContactField::Email => "email",
            ContactField::MapLink => "map_link",
            ContactField::WhatsappLink => "whatsapp_link",
            ContactField::WebsiteLink => "website_link",
            ContactField::TelegramLink => "telegram_link",
            ContactField::InstagramLink => "instagram_link",
        }
    }

    pub fn from_key(key: &str) -> Option<ContactField> {
        ContactField::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Visible text drawn for a link field; only link fields go in the right-hand footer
    /// column.
    pub fn link_label(self) -> Option<&'static str> {
        match self {
            ContactField::MapLink => Some("Google Maps"),
            ContactField::WhatsappLink => Some("WhatsApp"),
            ContactField::WebsiteLink => Some("Website"),
            ContactField::TelegramLink => Some("Telegram"),
            ContactField::InstagramLink => Some("Instagram"),
            _ => None,
        }
    }

    /// Label printed before an info value: `company_name` becomes `Company name`.
    pub fn display_label(self) -> String {
        let spaced = self.key().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Agent contact details shown in the footer. Unset or blank values are not drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub company_name: Option<String>,
    pub agent_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub map_link: Option<String>,
    pub whatsapp_link: Option<String>,
    pub website_link: Option<String>,
    pub telegram_link: Option<String>,
    pub instagram_link: Option<String>,
}

impl ContactInfo {
    fn slot(&self, field: ContactField) -> &Option<String> {
        match field {
            ContactField::CompanyName => &self.company_name,
            ContactField::AgentName => &self.agent_name,
            ContactField::Address => &self.address,
            ContactField::Phone => &self.phone,
            ContactField::Email => &self.email,
            ContactField::MapLink => &self.map_link,
            ContactField::WhatsappLink => &self.whatsapp_link,
            ContactField::WebsiteLink => &self.website_link,
            ContactField::TelegramLink => &self.telegram_link,
            ContactField::InstagramLink => &self.instagram_link,
        }
    }

    fn slot_mut(&mut self, field: ContactField) -> &mut Option<String> {
        match field {
            ContactField::CompanyName => &mut self.company_name,
            ContactField::AgentName => &mut self.agent_name,
            ContactField::Address => &mut self.address,
            ContactField::Phone => &mut self.phone,
            ContactField::Email => &mut self.email,
            ContactField::MapLink => &mut self.map_link,
            ContactField::WhatsappLink => &mut self.whatsapp_link,
            ContactField::WebsiteLink => &mut self.website_link,
            ContactField::TelegramLink => &mut self.telegram_link,
            ContactField::InstagramLink => &mut self.instagram_link,
        }
    }

    /// Trimmed value of a field, `None` when unset or blank.
    pub fn get(&self, field: ContactField) -> Option<&str> {
        self.slot(field)
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Populated fields in declared order.
    pub fn populated(&self) -> impl Iterator<Item = (ContactField, &str)> + '_ {
        ContactField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.populated().next().is_none()
    }

    /// Fills every field that is unset here from `other`.
    pub fn merge_missing(&mut self, other: &ContactInfo) {
        for field in ContactField::ALL {
            if self.get(field).is_none() {
                if let Some(v) = other.get(field) {
                    self.set(field, v);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label() {
        assert_eq!(ContactField::CompanyName.display_label(), "Company name");
        assert_eq!(ContactField::Email.display_label(), "Email");
        assert_eq!(ContactField::AgentName.display_label(), "Agent name");
    }

    #[test]
    fn test_blank_values_are_not_populated() {
        let mut contact = ContactInfo::default();
        contact.set(ContactField::Phone, "   ");
        contact.set(ContactField::Email, " agent@example.com ");
        let fields: Vec<_> = contact.populated().collect();
        assert_eq!(fields, vec![(ContactField::Email, "agent@example.com")]);
    }

    #[test]
    fn test_populated_follows_declared_order() {
        let contact = ContactInfo {
            instagram_link: Some("https://instagram.com/a".into()),
            company_name: Some("Acme".into()),
            phone: Some("123".into()),
            ..Default::default()
        };
        let order: Vec<_> = contact.populated().map(|(f, _)| f).collect();
        assert_eq!(
            order,
            vec![
                ContactField::CompanyName,
                ContactField::Phone,
                ContactField::InstagramLink
            ]
        );
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut cli = ContactInfo {
            phone: Some("555".into()),
            ..Default::default()
        };
        let file = ContactInfo {
            phone: Some("111".into()),
            email: Some("a@b.c".into()),
            ..Default::default()
        };
        cli.merge_missing(&file);
        assert_eq!(cli.get(ContactField::Phone), Some("555"));
        assert_eq!(cli.get(ContactField::Email), Some("a@b.c"));
    }

    #[test]
    fn test_map_text_produces_new_block() {
        let block = ContentBlock::labeled("Price", "100");
        let upper = block.map_text(|s| s.to_uppercase());
        assert_eq!(upper, ContentBlock::labeled("PRICE", "100"));
        assert_eq!(block, ContentBlock::labeled("Price", "100"));
        assert_eq!(
            ContentBlock::spacing(4.0).map_text(|s| s.to_uppercase()),
            ContentBlock::spacing(4.0)
        );
    }

    #[test]
    fn test_only_link_fields_have_link_labels() {
        let linked: Vec<ContactField> = ContactField::ALL
            .into_iter()
            .filter(|f| f.link_label().is_some())
            .collect();
        assert_eq!(linked.len(), 5);
        assert!(linked.iter().all(|f| f.key().ends_with("_link")));
        assert_eq!(ContactField::Phone.link_label(), None);
    }

    #[test]
    fn test_from_key() {
        assert_eq!(
            ContactField::from_key("whatsapp_link"),
            Some(ContactField::WhatsappLink)
        );
        assert_eq!(ContactField::from_key("fax"), None);
    }
}
