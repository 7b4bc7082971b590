use crate::config::Config;
use crate::models::Listing;

/// Acceptance criteria for a listing. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criteria {
    pub max_price: i64,
    pub min_area: i64,
    pub require_furnished: bool,
}

impl Criteria {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_price: config.max_price,
            min_area: config.min_area,
            require_furnished: config.require_furnished,
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        matches(listing, self.max_price, self.min_area, self.require_furnished)
    }
}

/// An unknown furnishing status counts as unfurnished when furnishing is
/// required. An unparsed price (-1) passes the price bound.
pub fn matches(listing: &Listing, max_price: i64, min_area: i64, require_furnished: bool) -> bool {
    listing.price <= max_price
        && listing.area >= min_area
        && (listing.furnished.is_true() || !require_furnished)
}
