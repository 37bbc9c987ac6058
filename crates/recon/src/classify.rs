use crate::model::CanonicalStatus;

/// One keyword group. A raw status matches when its lower-cased text
/// contains any of `keywords`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub status: CanonicalStatus,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(status: CanonicalStatus, keywords: &[&str]) -> Self {
        Self {
            status,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    }
}

/// Ordered keyword table. First matching rule wins.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    rules: Vec<KeywordRule>,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

/// Carrier phrases, in precedence order. Note that "entregar" also matches
/// "por entregar".
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(CanonicalStatus::Delivered, &["entregado", "entregada", "entregar"]),
        KeywordRule::new(
            CanonicalStatus::InTransit,
            &["camino", "viajando", "centro", "ruta", "transito", "tránsito", "recibimos"],
        ),
        KeywordRule::new(
            CanonicalStatus::Pending,
            &["pendiente", "recibido", "origen", "envío pendiente por admitir"],
        ),
        KeywordRule::new(CanonicalStatus::Returned, &["devuelto", "devolución", "retorno"]),
        KeywordRule::new(CanonicalStatus::AtAgency, &["agencia", "recoger"]),
    ]
}

impl StatusClassifier {
    pub fn with_rules(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Append keywords to the group for `status`. A status with no group yet
    /// gets a new rule at the end of the table.
    pub fn extend(&mut self, status: CanonicalStatus, keywords: &[String]) {
        let lowered = keywords.iter().map(|k| k.trim().to_lowercase()).filter(|k| !k.is_empty());
        match self.rules.iter_mut().find(|r| r.status == status) {
            Some(rule) => rule.keywords.extend(lowered),
            None => self.rules.push(KeywordRule {
                status,
                keywords: lowered.collect(),
            }),
        }
    }

    /// Classify scraped status text. Never fails: text matching no group is
    /// returned as `Unknown` with its original casing.
    pub fn classify(&self, raw: &str) -> CanonicalStatus {
        let lowered = raw.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.status.clone())
            .unwrap_or_else(|| CanonicalStatus::Unknown(raw.to_string()))
    }
}

/// Classify with the default table.
pub fn classify(raw: &str) -> CanonicalStatus {
    StatusClassifier::default().classify(raw)
}
