use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Seat position inside an event grid, rendered as `<row letters><number>`
/// with no separator (`A1`, `C12`, `AA3`). Row letters are bijective
/// base-26, so rows past `Z` continue with `AA`, `AB`, ...
///
/// Ordering is `(row, number)`; multi-seat operations acquire seat locks in
/// this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatLabel {
    /// 0-based row index (row `A` is 0)
    row: u32,
    /// 1-based seat number within the row
    number: u32,
}

impl SeatLabel {
    pub fn new(row: u32, number: u32) -> Self {
        Self { row, number }
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn row_letters(&self) -> String {
        let mut letters = String::new();
        let mut n = self.row + 1;
        while n > 0 {
            n -= 1;
            letters.insert(0, char::from(b'A' + (n % 26) as u8));
            n /= 26;
        }
        letters
    }

    /// Is this seat inside a `rows` x `seats_per_row` grid?
    pub fn in_grid(&self, rows: u32, seats_per_row: u32) -> bool {
        self.row < rows && self.number >= 1 && self.number <= seats_per_row
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letters(), self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSeatLabel(pub String);

impl fmt::Display for InvalidSeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid seat label: {}", self.0)
    }
}

impl std::error::Error for InvalidSeatLabel {}

impl FromStr for SeatLabel {
    type Err = InvalidSeatLabel;

    // Case-insensitive on input; Display renders the canonical uppercase form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let letters: String = s.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let digits = &s[letters.len()..];

        if letters.is_empty() || letters.len() > 4 || digits.is_empty() {
            return Err(InvalidSeatLabel(s.to_string()));
        }

        let mut row: u32 = 0;
        for c in letters.chars() {
            let c = c.to_ascii_uppercase();
            row = row * 26 + (c as u32 - 'A' as u32 + 1);
        }

        let number: u32 = digits.parse().map_err(|_| InvalidSeatLabel(s.to_string()))?;
        if number == 0 {
            return Err(InvalidSeatLabel(s.to_string()));
        }

        Ok(SeatLabel::new(row - 1, number))
    }
}

impl Serialize for SeatLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn renders_canonical_labels() {
        assert_eq!(SeatLabel::new(0, 1).to_string(), "A1");
        assert_eq!(SeatLabel::new(2, 12).to_string(), "C12");
        assert_eq!(SeatLabel::new(25, 10).to_string(), "Z10");
        assert_eq!(SeatLabel::new(26, 1).to_string(), "AA1");
        assert_eq!(SeatLabel::new(27, 4).to_string(), "AB4");
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("A1".parse::<SeatLabel>().unwrap(), SeatLabel::new(0, 1));
        assert_eq!("c12".parse::<SeatLabel>().unwrap(), SeatLabel::new(2, 12));
        assert_eq!("aa3".parse::<SeatLabel>().unwrap(), SeatLabel::new(26, 3));
    }

    #[test]
    fn rejects_malformed_labels() {
        for bad in ["", "A", "12", "A0", "1A", "A-1", "A1B", "ABCDE1"] {
            assert!(bad.parse::<SeatLabel>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn orders_by_row_then_number() {
        let mut seats = vec![
            SeatLabel::new(1, 1),
            SeatLabel::new(0, 10),
            SeatLabel::new(0, 2),
        ];
        seats.sort();
        assert_eq!(
            seats.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["A2", "A10", "B1"]
        );
    }

    #[test]
    fn grid_membership() {
        let seat = SeatLabel::new(4, 10);
        assert!(seat.in_grid(5, 10));
        assert!(!seat.in_grid(4, 10));
        assert!(!seat.in_grid(5, 9));
    }

    proptest! {
        #[test]
        fn label_text_round_trips(row in 0u32..2000, number in 1u32..5000) {
            let seat = SeatLabel::new(row, number);
            let parsed: SeatLabel = seat.to_string().parse().unwrap();
            prop_assert_eq!(parsed, seat);
        }
    }
}
