//! Patient-context enrichment and the medical safety disclaimer.

use crate::types::UserContext;

/// Appended to answers about treatment or medication.
pub const DISCLAIMER: &str = "\n\nATTENTION: Ces informations sont générales. Veuillez consulter un professionnel de santé pour des conseils médicaux personnalisés.";

/// Keywords that mark a question as treatment-related.
const TREATMENT_KEYWORDS: &[&str] = &[
    "traitement",
    "médicament",
    "guérir",
    "soigner",
    "prescription",
    "dose",
    "posologie",
    "ordonnance",
    "doser",
    "treatment",
    "medication",
    "cure",
    "dosage",
];

/// Whether the question asks about treatment or medication.
pub fn needs_disclaimer(question: &str) -> bool {
    let lower = question.to_lowercase();
    TREATMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Append the disclaimer when the question calls for it.
pub fn apply_disclaimer(answer: String, question: &str) -> String {
    if needs_disclaimer(question) && !answer.ends_with(DISCLAIMER) {
        answer + DISCLAIMER
    } else {
        answer
    }
}

/// Sentence describing the patient's predicted risk.
///
/// `None` when the context carries no prediction.
pub fn patient_context(context: &UserContext) -> Option<String> {
    let level = match context.prediction? {
        1 => "un risque élevé",
        _ => "un faible risque",
    };

    Some(match context.risk_percentage {
        Some(risk) => format!(
            "Le patient a {} de maladie cardiaque (risque estimé: {}%).",
            level, risk
        ),
        None => format!("Le patient a {} de maladie cardiaque.", level),
    })
}

/// Prefix the question with the patient context, if any.
pub fn enrich_question(question: &str, context: Option<&UserContext>) -> String {
    match context.and_then(patient_context) {
        Some(sentence) => format!("Contexte patient: {} Question: {}", sentence, question),
        None => question.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert!(needs_disclaimer("Quel TRAITEMENT pour l'angine ?"));
        assert!(needs_disclaimer("What is the usual dosage?"));
        assert!(needs_disclaimer("Peut-on guérir une arythmie ?"));
        assert!(!needs_disclaimer("Quels sont les symptômes ?"));
    }

    #[test]
    fn test_disclaimer_applied_once() {
        let answer = apply_disclaimer("Réponse.".to_string(), "traitement ?");
        assert!(answer.ends_with(DISCLAIMER));

        let again = apply_disclaimer(answer.clone(), "traitement ?");
        assert_eq!(again, answer);

        assert_eq!(apply_disclaimer("Réponse.".to_string(), "prévention ?"), "Réponse.");
    }

    #[test]
    fn test_high_risk_sentence() {
        let sentence = patient_context(&UserContext::new(1).with_risk(72.0)).unwrap();
        assert_eq!(
            sentence,
            "Le patient a un risque élevé de maladie cardiaque (risque estimé: 72%)."
        );
    }

    #[test]
    fn test_low_risk_without_percentage() {
        let sentence = patient_context(&UserContext::new(0)).unwrap();
        assert_eq!(sentence, "Le patient a un faible risque de maladie cardiaque.");
    }

    #[test]
    fn test_no_prediction_means_no_enrichment() {
        let ctx = UserContext {
            prediction: None,
            risk_percentage: Some(40.0),
        };
        assert_eq!(enrich_question("Question ?", Some(&ctx)), "Question ?");
        assert_eq!(enrich_question("Question ?", None), "Question ?");
    }

    #[test]
    fn test_enriched_question() {
        let ctx = UserContext::new(1).with_risk(72.5);
        let enriched = enrich_question("Que faire ?", Some(&ctx));
        assert!(enriched.starts_with("Contexte patient: Le patient a un risque élevé"));
        assert!(enriched.contains("72.5%"));
        assert!(enriched.ends_with("Question: Que faire ?"));
    }
}
