//! Canned answers used when generation is unavailable.

/// Appended to every fallback answer.
pub const FALLBACK_NOTICE: &str = "\n\nDésolé pour les limitations de ma réponse, notre système rencontre actuellement des difficultés techniques.";

/// Returned when no fallback entry matches.
pub const GENERIC_APOLOGY: &str = "Je suis désolé, je ne peux pas répondre à cette question pour le moment. Veuillez contacter un professionnel de santé pour obtenir des informations médicales fiables.";

/// Returned when the knowledge base cannot be initialized.
pub const SERVICE_UNAVAILABLE: &str = "Je ne peux pas répondre à votre question actuellement car la base de connaissances n'est pas disponible.";

const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    (
        "symptômes",
        "Les symptômes courants des maladies cardiaques incluent douleur thoracique, essoufflement, fatigue, palpitations et œdème. Consultez un médecin si vous ressentez ces symptômes.",
    ),
    (
        "prévention",
        "Pour prévenir les maladies cardiaques, adoptez une alimentation équilibrée, pratiquez une activité physique régulière, évitez de fumer, limitez l'alcool et contrôlez votre tension artérielle et cholestérol.",
    ),
    (
        "facteurs de risque",
        "Les principaux facteurs de risque incluent l'hypertension, l'hypercholestérolémie, le tabagisme, le diabète, l'obésité, la sédentarité, l'âge avancé et les antécédents familiaux.",
    ),
    (
        "traitement",
        "Les traitements des maladies cardiaques peuvent inclure des médicaments, des interventions chirurgicales et des changements de mode de vie. Consultez un médecin pour un traitement adapté à votre situation.",
    ),
];

/// Ordered keyword to canned-answer table. The first matching entry wins.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    entries: Vec<(String, String)>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_ENTRIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl FallbackTable {
    /// Build a table; keywords are matched lowercased.
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Canned answer for the first keyword contained in the question.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        let lower = question.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, answer)| answer.as_str())
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}
