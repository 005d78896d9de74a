use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::MatchCandidate;

/// Provenance label recording at which cascade stage, and with what
/// outcome, a name's resolution was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLevel {
    /// Matched on the untouched input name.
    #[serde(rename = "Species - Original")]
    SpeciesOriginal,
    /// No match yet after stage 1; later stages may still resolve it.
    #[serde(rename = "No Match Initial")]
    NoMatchInitial,
    /// Matched after stripping trailing authority tokens.
    #[serde(rename = "Species - Cleaned")]
    SpeciesCleaned,
    /// Matched at genus level (or a broader accepted rank).
    #[serde(rename = "Genus")]
    Genus,
    /// Exhausted every stage without a match.
    #[serde(rename = "No Match Final")]
    NoMatchFinal,
    /// The genus-stage query itself returned zero candidates.
    #[serde(rename = "No Match Final - Genus Failed")]
    NoMatchFinalGenusFailed,
    /// Name fell out of the result map entirely; guards upstream omission.
    #[serde(rename = "Processing Error")]
    ProcessingError,
}

impl MatchLevel {
    /// Human-readable label, identical to the serialized form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SpeciesOriginal => "Species - Original",
            Self::NoMatchInitial => "No Match Initial",
            Self::SpeciesCleaned => "Species - Cleaned",
            Self::Genus => "Genus",
            Self::NoMatchFinal => "No Match Final",
            Self::NoMatchFinalGenusFailed => "No Match Final - Genus Failed",
            Self::ProcessingError => "Processing Error",
        }
    }
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolution outcome for one distinct input name.
///
/// Exactly one record exists per distinct name once the cascade finishes;
/// unmatched names keep a record whose `match_level` names the failure.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionRecord {
    /// Canonical name of the best candidate, when matched.
    pub matched_name: Option<String>,
    /// Alternate names of the matched taxon.
    pub synonyms: Vec<String>,
    /// Stable Open Tree identifier, when matched.
    pub taxon_id: Option<u64>,
    /// Rank of the matched taxon.
    pub rank: Option<String>,
    /// The string actually sent to the service for this record.
    pub match_query: String,
    /// Stage provenance.
    pub match_level: MatchLevel,
    /// Whether the service flagged the match as approximate.
    pub is_approximate: bool,
    /// Whether the query matched via a synonym.
    pub is_synonym_input: bool,
}

impl ResolutionRecord {
    /// Builds a record from the top-ranked candidate of a query.
    #[must_use]
    pub fn from_candidate(candidate: &MatchCandidate, query: &str, level: MatchLevel) -> Self {
        Self {
            matched_name: candidate.taxon.unique_name.clone(),
            synonyms: candidate.taxon.synonyms.clone(),
            taxon_id: candidate.taxon.ott_id,
            rank: candidate.taxon.rank.clone(),
            match_query: query.to_string(),
            match_level: level,
            is_approximate: candidate.is_approximate_match,
            is_synonym_input: candidate.is_synonym,
        }
    }

    /// Builds an all-absent record for a name the service did not match.
    #[must_use]
    pub fn placeholder(query: &str, level: MatchLevel) -> Self {
        Self {
            matched_name: None,
            synonyms: Vec::new(),
            taxon_id: None,
            rank: None,
            match_query: query.to_string(),
            match_level: level,
            is_approximate: false,
            is_synonym_input: false,
        }
    }

    /// Whether the record still lacks an identifier and may be improved
    /// by a later stage.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        self.taxon_id.is_none()
    }

    /// Synonyms joined for the tabular boundary.
    #[must_use]
    pub fn joined_synonyms(&self) -> String {
        self.synonyms.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TaxonRecord;

    fn candidate() -> MatchCandidate {
        MatchCandidate {
            is_approximate_match: true,
            is_synonym: false,
            taxon: TaxonRecord {
                unique_name: Some("Oryza sativa".into()),
                synonyms: vec!["Oryza formosana".into(), "Oryza denudata".into()],
                ott_id: Some(662_442),
                rank: Some("species".into()),
            },
        }
    }

    #[test]
    fn record_captures_candidate_fields() {
        let record = ResolutionRecord::from_candidate(
            &candidate(),
            "Oryza sativa L.",
            MatchLevel::SpeciesOriginal,
        );
        assert_eq!(record.taxon_id, Some(662_442));
        assert_eq!(record.match_query, "Oryza sativa L.");
        assert!(record.is_approximate);
        assert!(!record.is_unresolved());
        assert_eq!(record.joined_synonyms(), "Oryza formosana; Oryza denudata");
    }

    #[test]
    fn placeholder_is_unresolved() {
        let record = ResolutionRecord::placeholder("Foo bar", MatchLevel::NoMatchInitial);
        assert!(record.is_unresolved());
        assert_eq!(record.match_level, MatchLevel::NoMatchInitial);
        assert_eq!(record.joined_synonyms(), "");
    }

    #[test]
    fn level_labels_round_trip_serde() {
        let value = serde_json::to_value(MatchLevel::NoMatchFinalGenusFailed).unwrap();
        assert_eq!(value, "No Match Final - Genus Failed");
        let back: MatchLevel = serde_json::from_value(value).unwrap();
        assert_eq!(back, MatchLevel::NoMatchFinalGenusFailed);
    }
}
