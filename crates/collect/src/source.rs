//! Lookup-source seam: anything that can answer "businesses matching a query".

use leadbase_recon::channel::split_phone;
use leadbase_recon::normalize::clean_website;
use leadbase_recon::{BusinessRecord, ChannelClassifier};

use crate::error::LookupError;

/// One raw search hit, before classification and cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub external_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub maps_url: Option<String>,
}

impl Listing {
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().map(|p| !p.trim().is_empty()).unwrap_or(false)
    }

    /// Convert to a record for `city`: the phone lands in the mobile or
    /// landline slot by classification, and social/messaging links are not
    /// kept as websites.
    pub fn into_record(self, city: &str, classifier: &dyn ChannelClassifier) -> BusinessRecord {
        let (mobile, landline) = match self.phone.as_deref() {
            Some(raw) => split_phone(classifier, raw),
            None => (None, None),
        };
        BusinessRecord {
            name: self.name.trim().to_string(),
            mobile,
            landline,
            email: None,
            website: self.website.as_deref().and_then(clean_website),
            city: city.to_string(),
            address: self.address.filter(|a| !a.trim().is_empty()),
            maps_url: self.maps_url,
            external_id: self.external_id,
            extra: Default::default(),
        }
    }
}

/// A searchable business directory.
pub trait LookupSource {
    /// Up to `limit` listings for a free-text query.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadbase_recon::PrefixClassifier;

    #[test]
    fn listing_to_record() {
        let listing = Listing {
            external_id: Some("p1".into()),
            name: " Cafe Sol ".into(),
            phone: Some("300 123 4567".into()),
            website: Some("https://www.instagram.com/cafesol".into()),
            address: Some("".into()),
            maps_url: None,
        };

        let r = listing.into_record("Bogota", &PrefixClassifier::default());

        assert_eq!(r.name, "Cafe Sol");
        assert_eq!(r.mobile.as_deref(), Some("300 123 4567"));
        assert_eq!(r.landline, None);
        assert_eq!(r.website, None);
        assert_eq!(r.address, None);
        assert_eq!(r.city, "Bogota");
        assert_eq!(r.external_id.as_deref(), Some("p1"));
    }

    #[test]
    fn landline_listing() {
        let listing = Listing {
            name: "Kiosko".into(),
            phone: Some("(601) 765 4321".into()),
            website: Some("kiosko.co".into()),
            ..Default::default()
        };
        let r = listing.into_record("Bogota", &PrefixClassifier::default());
        assert_eq!(r.landline.as_deref(), Some("(601) 765 4321"));
        assert_eq!(r.website.as_deref(), Some("https://kiosko.co"));
    }
}
