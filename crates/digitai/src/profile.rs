//! Business profile filled in by a demo visitor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// City used in the persona when the visitor leaves `location` empty.
pub const DEFAULT_LOCATION: &str = "São Paulo";

/// Business verticals offered in the setup form.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    #[default]
    Dermatologia,
    Psiquiatria,
    Estetica,
    Odontologia,
    ClinicaGeral,
    Psicologia,
    Nutricao,
    Fisioterapia,
    Advocacia,
    Contabilidade,
    Imobiliaria,
    Restaurante,
    Outro,
}

impl BusinessCategory {
    /// Every category, in form order.
    pub const ALL: [BusinessCategory; 13] = [
        BusinessCategory::Dermatologia,
        BusinessCategory::Psiquiatria,
        BusinessCategory::Estetica,
        BusinessCategory::Odontologia,
        BusinessCategory::ClinicaGeral,
        BusinessCategory::Psicologia,
        BusinessCategory::Nutricao,
        BusinessCategory::Fisioterapia,
        BusinessCategory::Advocacia,
        BusinessCategory::Contabilidade,
        BusinessCategory::Imobiliaria,
        BusinessCategory::Restaurante,
        BusinessCategory::Outro,
    ];

    /// Stable key used on the wire and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dermatologia => "dermatologia",
            Self::Psiquiatria => "psiquiatria",
            Self::Estetica => "estetica",
            Self::Odontologia => "odontologia",
            Self::ClinicaGeral => "clinica_geral",
            Self::Psicologia => "psicologia",
            Self::Nutricao => "nutricao",
            Self::Fisioterapia => "fisioterapia",
            Self::Advocacia => "advocacia",
            Self::Contabilidade => "contabilidade",
            Self::Imobiliaria => "imobiliaria",
            Self::Restaurante => "restaurante",
            Self::Outro => "outro",
        }
    }

    /// Human-readable label shown in the form and used in the persona.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dermatologia => "Dermatologia",
            Self::Psiquiatria => "Psiquiatria",
            Self::Estetica => "Estética",
            Self::Odontologia => "Odontologia",
            Self::ClinicaGeral => "Clínica Geral",
            Self::Psicologia => "Psicologia",
            Self::Nutricao => "Nutrição",
            Self::Fisioterapia => "Fisioterapia",
            Self::Advocacia => "Advocacia",
            Self::Contabilidade => "Contabilidade",
            Self::Imobiliaria => "Imobiliária",
            Self::Restaurante => "Restaurante/Food",
            Self::Outro => "Outro",
        }
    }

    /// Opening questions a visitor can click to try the agent.
    pub fn suggestions(self) -> [&'static str; 3] {
        match self {
            Self::Dermatologia => [
                "Qual o valor da consulta?",
                "Vocês fazem botox?",
                "Tem horário essa semana?",
            ],
            Self::Psiquiatria => [
                "Como funciona a primeira consulta?",
                "Atendem por convênio?",
                "Quanto tempo dura a sessão?",
            ],
            Self::Estetica => [
                "Quais procedimentos vocês fazem?",
                "Tem promoção esse mês?",
                "Posso parcelar?",
            ],
            Self::Odontologia => [
                "Fazem clareamento?",
                "Quanto custa uma limpeza?",
                "Atendem emergência?",
            ],
            Self::ClinicaGeral => [
                "Precisa de agendamento?",
                "Fazem exames no local?",
                "Qual o horário de funcionamento?",
            ],
            Self::Psicologia => [
                "Como funciona a terapia online?",
                "Qual o valor da sessão?",
                "Atendem crianças?",
            ],
            Self::Nutricao => [
                "Fazem dieta personalizada?",
                "Quanto custa o acompanhamento?",
                "Atendem online?",
            ],
            Self::Fisioterapia => [
                "Tratam dor nas costas?",
                "Quantas sessões preciso?",
                "Tem RPG?",
            ],
            Self::Advocacia => [
                "Fazem consulta inicial gratuita?",
                "Quanto custa uma ação trabalhista?",
                "Atendem empresas?",
            ],
            Self::Contabilidade => [
                "Quanto custa abrir uma empresa?",
                "Fazem declaração de IR?",
                "Atendem MEI?",
            ],
            Self::Imobiliaria => [
                "Tem apartamento de 2 quartos?",
                "Qual a taxa de corretagem?",
                "Vocês fazem avaliação?",
            ],
            Self::Restaurante => [
                "Qual o horário de funcionamento?",
                "Tem delivery?",
                "Aceitam reserva?",
            ],
            Self::Outro => [
                "Qual o horário de funcionamento?",
                "Como posso agendar?",
                "Quais formas de pagamento?",
            ],
        }
    }
}

impl std::fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for BusinessCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::ALL.iter().map(|c| c.key()).collect();
                format!("unknown business category '{s}' (expected one of: {})", keys.join(", "))
            })
    }
}

/// What the visitor told us about their business.
///
/// Only `name` and `services` are required; the rest may stay empty and are
/// interpolated as-is into the system prompt.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BusinessProfile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: BusinessCategory,
    pub services: String,
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub differentials: String,
    #[serde(default)]
    pub location: String,
}

impl BusinessProfile {
    /// Names of required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push("name");
        }
        if self.services.is_empty() {
            missing.push("services");
        }
        missing
    }

    /// Whether a chat session may start with this profile.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// `Ok(())` when complete, otherwise [`Error::IncompleteProfile`].
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::IncompleteProfile { missing })
        }
    }

    /// The location, or [`DEFAULT_LOCATION`] when empty.
    pub fn location_or_default(&self) -> &str {
        if self.location.is_empty() {
            DEFAULT_LOCATION
        } else {
            &self.location
        }
    }
}
