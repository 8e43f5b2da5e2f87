//! Airport record model

use serde::{Deserialize, Serialize};

/// One gazetteer entry. Matching fields are stored case-folded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AirportRecord {
    /// Four-letter ICAO code
    pub icao: String,
    /// Three-letter IATA code
    pub iata: String,
    /// Served city
    pub city: String,
    /// Airport name
    pub name: String,
}

impl AirportRecord {
    /// Create a record, case-folding every field
    #[must_use]
    pub fn new(icao: &str, iata: &str, city: &str, name: &str) -> Self {
        Self {
            icao: icao.trim().to_lowercase(),
            iata: iata.trim().to_lowercase(),
            city: city.trim().to_lowercase(),
            name: name.trim().to_lowercase(),
        }
    }

    /// IATA code as sent to the search provider
    #[must_use]
    pub fn iata_code(&self) -> String {
        self.iata.to_uppercase()
    }

    /// Whether `code` names this airport by IATA or ICAO (any case)
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        let code = code.trim();
        self.iata.eq_ignore_ascii_case(code) || self.icao.eq_ignore_ascii_case(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_case_folded() {
        let record = AirportRecord::new("EGLL", "LHR", "London", "London Heathrow Airport");
        assert_eq!(record.icao, "egll");
        assert_eq!(record.iata, "lhr");
        assert_eq!(record.city, "london");
        assert_eq!(record.iata_code(), "LHR");
    }

    #[test]
    fn test_has_code() {
        let record = AirportRecord::new("LFPG", "CDG", "Paris", "Charles de Gaulle");
        assert!(record.has_code("cdg"));
        assert!(record.has_code("LfPg"));
        assert!(!record.has_code("ORY"));
    }
}
