//! The fixed scenario sequence

use std::fmt;
use std::str::FromStr;

use crate::validate::Expectation;

/// One named exercise of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Health,
    ExtractImage,
    ExtractPdf,
    Export,
    ErrorMissingCredential,
    ErrorUnsupportedType,
    ErrorInvalidCredential,
    ErrorMalformedExport,
}

impl Scenario {
    /// Run order
    pub const ALL: [Scenario; 8] = [
        Scenario::Health,
        Scenario::ExtractImage,
        Scenario::ExtractPdf,
        Scenario::Export,
        Scenario::ErrorMissingCredential,
        Scenario::ErrorUnsupportedType,
        Scenario::ErrorInvalidCredential,
        Scenario::ErrorMalformedExport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Health => "health",
            Scenario::ExtractImage => "extract-image",
            Scenario::ExtractPdf => "extract-pdf",
            Scenario::Export => "export",
            Scenario::ErrorMissingCredential => "error-missing-credential",
            Scenario::ErrorUnsupportedType => "error-unsupported-type",
            Scenario::ErrorInvalidCredential => "error-invalid-credential",
            Scenario::ErrorMalformedExport => "error-malformed-export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Health => "Health check reports readiness",
            Scenario::ExtractImage => "Table extraction from a JPEG image",
            Scenario::ExtractPdf => "Table extraction from a PDF",
            Scenario::Export => "Spreadsheet export of extracted data",
            Scenario::ErrorMissingCredential => "Extract without api_key is rejected with 422",
            Scenario::ErrorUnsupportedType => "Extract of a text file is rejected with 400",
            Scenario::ErrorInvalidCredential => "Rejected credential is reported in-band",
            Scenario::ErrorMalformedExport => "Export without extracted_data is rejected with 400",
        }
    }

    pub fn expectation(&self) -> Expectation {
        match self {
            Scenario::Health => Expectation::Health,
            Scenario::ExtractImage | Scenario::ExtractPdf => Expectation::ExtractSuccess,
            Scenario::Export => Expectation::ExportSuccess,
            Scenario::ErrorMissingCredential => Expectation::MissingCredential,
            Scenario::ErrorUnsupportedType => Expectation::UnsupportedType,
            Scenario::ErrorInvalidCredential => Expectation::RejectedCredential,
            Scenario::ErrorMalformedExport => Expectation::ExportRejected,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_puts_export_after_both_extractions() {
        let position = |s: Scenario| Scenario::ALL.iter().position(|x| *x == s).unwrap();
        assert_eq!(position(Scenario::Health), 0);
        assert!(position(Scenario::ExtractImage) < position(Scenario::Export));
        assert!(position(Scenario::ExtractPdf) < position(Scenario::Export));
        assert_eq!(position(Scenario::ErrorMalformedExport), Scenario::ALL.len() - 1);
    }

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
        assert!("nope".parse::<Scenario>().is_err());
    }
}
