//! System prompt composition.
//!
//! [`compose_system_prompt`] renders a [`BusinessProfile`] into the persona
//! the language model plays during the demo. It is built on
//! [`SystemPromptBuilder`], a small section assembler that joins a preamble
//! and `## Heading` blocks with blank lines. A heading is followed directly
//! by its body.

use crate::profile::BusinessProfile;

/// Builder for multi-section system prompts.
///
/// # Example
///
/// ```
/// use digitai::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("Você é uma assistente.")
///     .section("Regras", "- Seja breve")
///     .section("Vazia", "")
///     .build();
///
/// assert!(prompt.contains("## Regras"));
/// assert!(!prompt.contains("## Vazia"));
/// ```
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Start a prompt with a preamble that is included as-is.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n{content}"));
        }
        self
    }

    /// Append a bulleted `## heading` section, one `- ` line per item.
    pub fn bullets<'a>(self, heading: &str, items: impl IntoIterator<Item = &'a str>) -> Self {
        let body: Vec<String> = items.into_iter().map(|i| format!("- {i}")).collect();
        self.section(heading, body.join("\n"))
    }

    /// Append a numbered `## heading` section.
    pub fn numbered<'a>(self, heading: &str, items: impl IntoIterator<Item = &'a str>) -> Self {
        let body: Vec<String> = items
            .into_iter()
            .enumerate()
            .map(|(n, i)| format!("{}. {i}", n + 1))
            .collect();
        self.section(heading, body.join("\n"))
    }

    /// Join all sections with double newlines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

const PERSONALITY: [&str; 4] = [
    "Seja cordial, profissional e empática",
    "Use linguagem acessível, evite jargões técnicos desnecessários",
    "Responda de forma concisa mas completa",
    "Sempre demonstre interesse genuíno em ajudar",
];

const RULES: [&str; 5] = [
    "Nunca invente informações que não foram fornecidas",
    "Se não souber algo, diga que vai verificar com a equipe",
    "Sempre tente direcionar para agendamento quando apropriado",
    "Seja breve nas respostas (máximo 2-3 parágrafos)",
    "Use emojis com moderação para tornar a conversa mais leve",
];

const OBJECTIVE: &str = "Ajudar os clientes a entenderem os serviços e facilitar o agendamento de consultas/atendimentos.";

/// Render the assistant persona for `profile`.
///
/// The caller guarantees `name` and `services` are filled in. Empty optional
/// fields are interpolated as empty text rather than rejected. The output
/// depends only on the profile.
pub fn compose_system_prompt(profile: &BusinessProfile) -> String {
    let label = profile.category.label();

    let identity = format!(
        "Você é a assistente virtual da {}, uma {} localizada em {}.",
        profile.name,
        label.to_lowercase(),
        profile.location_or_default(),
    );

    let info = [
        format!("Nome: {}", profile.name),
        format!("Segmento: {label}"),
        format!("Serviços oferecidos: {}", profile.services),
        format!("Horário de funcionamento: {}", profile.hours),
        format!("Diferenciais: {}", profile.differentials),
    ];

    SystemPromptBuilder::new(identity)
        .bullets("Sua Personalidade", PERSONALITY)
        .bullets("Informações do Negócio", info.iter().map(String::as_str))
        .numbered("Regras Importantes", RULES)
        .section("Objetivo Principal", OBJECTIVE)
        .build()
}
