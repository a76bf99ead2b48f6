use formats::RequestError;

/// Why a load did not end in `loaded`.
///
/// The `Display` text is what ends up as the status reason.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadFailure {
    /// Transport or storage failure, message kept verbatim.
    #[error("{0}")]
    Network(String),
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },
    #[error("did not finish within {secs} s")]
    ParseTimeout { secs: u64 },
    /// Fetched fine, importer finished, but produced nothing.
    #[error("asset fetched but parsing produced no scene")]
    ParseAmbiguous,
    #[error("primary parser rejected the asset: {0}")]
    ParseRejected(String),
    #[error("error processing loaded model: {0}")]
    ParseException(String),
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
}

impl LoadFailure {
    /// Failures after which the structural probe is worth running.
    pub fn wants_diagnosis(&self) -> bool {
        matches!(
            self,
            LoadFailure::ParseTimeout { .. }
                | LoadFailure::ParseAmbiguous
                | LoadFailure::ParseRejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::LoadFailure;

    #[test]
    fn status_reasons() {
        let http = LoadFailure::Http {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(http.to_string(), "HTTP 404: Not Found");
        assert!(LoadFailure::ParseAmbiguous.to_string().contains("parsing"));
        assert_eq!(
            LoadFailure::Network("connection refused".into()).to_string(),
            "connection refused"
        );
    }

    #[test]
    fn only_parse_failures_are_diagnosed() {
        assert!(LoadFailure::ParseAmbiguous.wants_diagnosis());
        assert!(LoadFailure::ParseTimeout { secs: 10 }.wants_diagnosis());
        assert!(!LoadFailure::Network("x".into()).wants_diagnosis());
        assert!(!LoadFailure::ParseException("NaN".into()).wants_diagnosis());
    }
}
