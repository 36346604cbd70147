use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// Bin containers the service cleans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bin {
    Green,
    Black,
    Blue,
    Caddy,
}

impl Bin {
    pub const ALL: [Bin; 4] = [Bin::Green, Bin::Black, Bin::Blue, Bin::Caddy];

    pub fn key(&self) -> &'static str {
        match self {
            Bin::Green => "green",
            Bin::Black => "black",
            Bin::Blue => "blue",
            Bin::Caddy => "caddy",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bin::Green => "Green Bin",
            Bin::Black => "Black Bin",
            Bin::Blue => "Blue Bin",
            Bin::Caddy => "Brown Food Caddy",
        }
    }

    /// Wheelie bins are priced per bin; the caddy is an add-on.
    pub fn is_wheelie(&self) -> bool {
        !matches!(self, Bin::Caddy)
    }
}

impl FromStr for Bin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bin::ALL
            .into_iter()
            .find(|bin| bin.key() == s)
            .ok_or_else(|| format!("Unknown bin: {}", s))
    }
}

/// Ordered set of selected bins.
///
/// Toggling keeps insertion order so the bins are listed back in the order
/// the customer picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Bin>", into = "Vec<Bin>")]
pub struct BinSelection(Vec<Bin>);

impl BinSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the bin if absent, removes it if present.
    pub fn toggle(&mut self, bin: Bin) {
        match self.0.iter().position(|b| *b == bin) {
            Some(index) => {
                self.0.remove(index);
            }
            None => self.0.push(bin),
        }
    }

    pub fn contains(&self, bin: Bin) -> bool {
        self.0.contains(&bin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Bin> + '_ {
        self.0.iter().copied()
    }

    /// Display labels joined with ", "
    pub fn labels(&self) -> String {
        self.0
            .iter()
            .map(|bin| bin.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Vec<Bin>> for BinSelection {
    fn from(bins: Vec<Bin>) -> Self {
        let mut selection = Vec::with_capacity(bins.len());
        for bin in bins {
            if !selection.contains(&bin) {
                selection.push(bin);
            }
        }
        Self(selection)
    }
}

impl From<BinSelection> for Vec<Bin> {
    fn from(selection: BinSelection) -> Self {
        selection.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl CollectionDay {
    pub const ALL: [CollectionDay; 6] = [
        CollectionDay::Monday,
        CollectionDay::Tuesday,
        CollectionDay::Wednesday,
        CollectionDay::Thursday,
        CollectionDay::Friday,
        CollectionDay::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionDay::Monday => "Monday",
            CollectionDay::Tuesday => "Tuesday",
            CollectionDay::Wednesday => "Wednesday",
            CollectionDay::Thursday => "Thursday",
            CollectionDay::Friday => "Friday",
            CollectionDay::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for CollectionDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionDay::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| format!("Unknown collection day: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceTier {
    #[serde(rename = "oneOff")]
    OneOff,
    #[serde(rename = "6Clean")]
    SixClean,
    #[serde(rename = "MonthlyClean")]
    MonthlyClean,
}

impl ServiceTier {
    pub const ALL: [ServiceTier; 3] = [
        ServiceTier::OneOff,
        ServiceTier::SixClean,
        ServiceTier::MonthlyClean,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ServiceTier::OneOff => "oneOff",
            ServiceTier::SixClean => "6Clean",
            ServiceTier::MonthlyClean => "MonthlyClean",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceTier::OneOff => "One-Off Clean",
            ServiceTier::SixClean => "6 Clean Package",
            ServiceTier::MonthlyClean => "Monthly Clean Package",
        }
    }
}

impl FromStr for ServiceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceTier::ALL
            .into_iter()
            .find(|tier| tier.key() == s)
            .ok_or_else(|| format!("Unknown service tier: {}", s))
    }
}

/// A customer's booking, either in progress (a draft) or ready to dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub telephone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub council: String,
    #[serde(default)]
    pub bins: BinSelection,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub collection_day: Option<CollectionDay>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub service: Option<ServiceTier>,
    #[serde(default)]
    pub extra_info: String,
}

impl BookingRequest {
    /// The empty draft a form starts from and returns to after dispatch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Notes are only meaningful when they carry something besides whitespace.
    pub fn notes(&self) -> Option<&str> {
        let notes = self.extra_info.trim();
        if notes.is_empty() {
            None
        } else {
            Some(&self.extra_info)
        }
    }
}

// Choice fields arrive from HTML forms as "" when nothing is picked
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
