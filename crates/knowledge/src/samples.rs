//! Sample compliance documents for `regiguard seed` and tests.

use crate::types::{AccessLevel, DocumentRecord};

pub fn sample_documents() -> Vec<DocumentRecord> {
    vec![
        DocumentRecord::new(
            "gdpr_article5",
            "Article 5 – Principles relating to processing of personal data. \
             Data shall be processed lawfully, fairly and in a transparent manner.",
            AccessLevel::Public,
        ),
        DocumentRecord::new(
            "mca_form8",
            "MCA Form 8 filing penalty: late filing attracts fines; \
             companies must file within X days or face penalties.",
            AccessLevel::Internal,
        ),
        DocumentRecord::new(
            "sebi_disclosure",
            "SEBI circular: listed entities must disclose price-sensitive \
             information within prescribed timelines.",
            AccessLevel::Public,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_access_levels() {
        let docs = sample_documents();
        let access: Vec<(&str, AccessLevel)> =
            docs.iter().map(|d| (d.id.as_str(), d.access)).collect();

        assert_eq!(
            access,
            vec![
                ("gdpr_article5", AccessLevel::Public),
                ("mca_form8", AccessLevel::Internal),
                ("sebi_disclosure", AccessLevel::Public),
            ]
        );
    }
}
