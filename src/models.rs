use serde::{Deserialize, Serialize};

/// Three-valued flag for fields a source may not report at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    pub fn is_true(self) -> bool {
        self == TriState::True
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub name: String,
    pub location: String, // "Unknown" when the source omits it
    pub city: String,
    pub price: i64, // per month, -1 if unparseable
    pub utilities_included: TriState,
    pub area: i64, // m², -1 if unparseable
    pub rooms: Option<i64>,
    pub furnished: TriState,
    /// Absolute URL; the only identity used for dedup.
    pub link: String,
    pub source: String,
}

impl Listing {
    /// Builds the push title and body.
    ///
    /// The title reads `€{price}/m`, prefixed with the capitalized city when
    /// several cities are watched and suffixed with the utilities status when
    /// known. The body lists area, rooms and furnishing, then the link on its
    /// own line.
    pub fn format_notification(&self, multi_city: bool) -> (String, String) {
        let mut title = format!("€{}/m", self.price);
        if multi_city {
            title = format!("{} - {}", capitalize(&self.city), title);
        }
        match self.utilities_included {
            TriState::True => title.push_str(" incl. util"),
            TriState::False => title.push_str(" excl. util"),
            TriState::Unknown => {}
        }

        let mut parts = vec![format!("{} m²", self.area)];
        if let Some(rooms) = self.rooms.filter(|r| *r != -1) {
            parts.push(format!("{} rooms", rooms));
        }
        match self.furnished {
            TriState::True => parts.push("furnished".to_string()),
            TriState::False => parts.push("unfurnished".to_string()),
            TriState::Unknown => {}
        }

        let body = format!("{}\n{}", parts.join(", "), self.link);
        (title, body)
    }
}

/// Uppercases the first character and lowercases the rest ("den haag" -> "Den haag").
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) fn sample_listing(link: &str) -> Listing {
    Listing {
        name: "Apartment Stratumseind".to_string(),
        location: "5611 EN Eindhoven (Binnenstad)".to_string(),
        city: "eindhoven".to_string(),
        price: 1500,
        utilities_included: TriState::Unknown,
        area: 40,
        rooms: None,
        furnished: TriState::True,
        link: link.to_string(),
        source: "Test".to_string(),
    }
}
